use std::env;
use std::path::PathBuf;

use buddy_core::config::Config;
use buddy_core::source::SourceLoader;
use buddy_embed::build_embedder;
use buddy_server::init_tracing;
use buddy_vector::KnowledgeBaseBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Config::load()?.settings()?;
    let source = env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| settings.source.path.clone());

    println!("Stress Buddy Indexer\n====================");
    println!("Source table: {}", source.display());
    println!("Index path:   {}", settings.index.path.display());

    let embedder = build_embedder(&settings.embed)?;
    let builder = KnowledgeBaseBuilder::new(embedder, settings.index.clone(), SourceLoader::new(settings.source.prompt_column.clone()))
        .with_progress(true);
    let report = builder.build_index(&source).await?;

    println!("\n✅ Knowledgebase created successfully!");
    println!("📊 {} entries, dim {}, embedder {}, {:.2?}", report.documents, report.dim, report.embedder_id, report.elapsed);
    println!("💡 Ask something with: cargo run --bin buddy-ask \"I miss my ex\"");
    Ok(())
}
