use std::sync::Arc;

use anyhow::Context;
use buddy_core::config::Config;
use buddy_core::traits::Embedder;
use buddy_embed::build_embedder;
use buddy_llm::GeminiClient;
use buddy_server::{init_tracing, router, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;
    let embedder = build_embedder(&settings.embed)?;
    let generator = GeminiClient::from_settings(&settings.llm)?;
    info!(embedder = %embedder.id(), model = %generator.model(), index = %settings.index.path.display(), "starting Stress Buddy");

    let state = Arc::new(AppState::new(&settings, embedder, generator));
    let listener = tokio::net::TcpListener::bind(&settings.server.addr)
        .await
        .with_context(|| format!("binding {}", settings.server.addr))?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
