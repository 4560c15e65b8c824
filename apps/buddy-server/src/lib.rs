//! Web front end: knowledgebase creation and question answering.
//!
//! Builds take the write side of the index gate and questions the read side,
//! so a question never observes a half-swapped index.

pub mod page;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use buddy_chain::AnswerPipeline;
use buddy_core::config::Settings;
use buddy_core::source::SourceLoader;
use buddy_core::traits::{Embedder, Generator};
use buddy_core::{Error, Personality};
use buddy_vector::{KnowledgeBaseBuilder, Retriever};

use page::{render_page, Banner, PageView};

pub struct AppState<G: Generator> {
    builder: KnowledgeBaseBuilder,
    source_path: PathBuf,
    pipeline: AnswerPipeline<G>,
    default_personality: Personality,
    gate: RwLock<()>,
}

impl<G: Generator> AppState<G> {
    pub fn new(settings: &Settings, embedder: Arc<dyn Embedder>, generator: G) -> Self {
        let loader = SourceLoader::new(settings.source.prompt_column.clone());
        let builder = KnowledgeBaseBuilder::new(embedder.clone(), settings.index.clone(), loader);
        let retriever = Retriever::new(embedder, &settings.index);
        Self {
            builder,
            source_path: settings.source.path.clone(),
            pipeline: AnswerPipeline::new(retriever, generator, settings.retrieval.k),
            default_personality: settings.server.default_personality,
            gate: RwLock::new(()),
        }
    }

    async fn status_line(&self) -> String {
        match self.pipeline.retriever().status().await {
            Ok(s) => format!("Knowledgebase ready: {} entries (built {}).", s.row_count, s.built_at),
            Err(Error::IndexMissing(_)) => "No knowledgebase yet. Click \"Create Knowledgebase\" to build it.".to_string(),
            Err(e) => {
                warn!(error = %e, "could not read index status");
                "Knowledgebase status unavailable.".to_string()
            }
        }
    }

    async fn page(&self, question: String, banner: Option<Banner>, reply: Option<String>) -> Html<String> {
        let status = self.status_line().await;
        Html(render_page(&PageView { status, banner, question, reply }))
    }
}

pub fn router<G: Generator + 'static>(state: Arc<AppState<G>>) -> Router {
    Router::new()
        .route("/", get(home::<G>))
        .route("/knowledgebase", post(create_knowledgebase::<G>))
        .route("/ask", post(ask_form::<G>))
        .route("/api/ask", post(ask_api::<G>))
        .route("/health", get(health))
        .with_state(state)
}

/// Message safe to show an end user; details go to the log.
pub fn user_message(err: &Error) -> String {
    match err {
        Error::IndexMissing(_) => "No knowledgebase yet. Click \"Create Knowledgebase\" first.".to_string(),
        Error::UnknownPersonality(_) => err.to_string(),
        Error::Load { .. } => "Could not read the FAQ file. Check the server log.".to_string(),
        Error::Upstream { .. } => "Buddy could not reply right now. Please try again in a bit.".to_string(),
        Error::InvalidConfig(_) | Error::Storage(_) => "Something went wrong. Check the server log.".to_string(),
    }
}

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::UnknownPersonality(_) => StatusCode::BAD_REQUEST,
        Error::IndexMissing(_) => StatusCode::CONFLICT,
        Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn home<G: Generator>(State(state): State<Arc<AppState<G>>>) -> Html<String> {
    state.page(String::new(), None, None).await
}

async fn create_knowledgebase<G: Generator>(State(state): State<Arc<AppState<G>>>) -> Html<String> {
    let result = {
        let _guard = state.gate.write().await;
        state.builder.build_index(&state.source_path).await
    };
    let banner = match result {
        Ok(report) => {
            info!(documents = report.documents, "knowledgebase created from web request");
            Banner::success("Knowledgebase created successfully!")
        }
        Err(e) => {
            error!(error = %e, "knowledgebase build failed");
            Banner::failure(format!("Knowledgebase creation failed. {}", user_message(&e)))
        }
    };
    state.page(String::new(), Some(banner), None).await
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

async fn ask_form<G: Generator>(State(state): State<Arc<AppState<G>>>, Form(form): Form<AskForm>) -> Html<String> {
    let question = form.question.trim().to_string();
    if question.is_empty() {
        return state.page(question, None, None).await;
    }
    let result = {
        let _guard = state.gate.read().await;
        state.pipeline.answer_as(&question, state.default_personality).await
    };
    match result {
        Ok(reply) => state.page(question, None, Some(reply)).await,
        Err(e) => {
            error!(error = %e, "answer failed");
            state.page(question, Some(Banner::failure(user_message(&e))), None).await
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub personality: Option<String>,
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn ask_api<G: Generator>(State(state): State<Arc<AppState<G>>>, Json(req): Json<AskRequest>) -> Response {
    let question = req.question.trim();
    if question.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "question must not be empty".to_string());
    }
    let personality = match req.personality.as_deref() {
        None => state.default_personality,
        Some(label) => match label.parse::<Personality>() {
            Ok(p) => p,
            Err(e) => return json_error(status_for(&e), e.to_string()),
        },
    };
    let result = {
        let _guard = state.gate.read().await;
        state.pipeline.answer_as(question, personality).await
    };
    match result {
        Ok(answer) => Json(json!({ "answer": answer })).into_response(),
        Err(e) => {
            error!(error = %e, "api answer failed");
            json_error(status_for(&e), user_message(&e))
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `RUST_LOG` filter, defaulting to `info`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
