//! HTTP surface: streaming chat, assistant runs and form extraction.

pub mod error;
pub mod handlers;
pub mod locks;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::EcoError;
use crate::provider::{self, ChatProvider, JobService};
use crate::run_loop::{PollPolicy, RunOrchestrator};
use crate::tools::ToolRegistry;

pub use error::ApiError;
pub use locks::ConversationLocks;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub chat: Arc<dyn ChatProvider>,
    pub jobs: Arc<dyn JobService>,
    pub tools: Arc<ToolRegistry>,
    pub locks: ConversationLocks,
}

impl AppState {
    pub fn new(config: ServerConfig, chat: Arc<dyn ChatProvider>, jobs: Arc<dyn JobService>) -> Self {
        Self {
            config: Arc::new(config),
            chat,
            jobs,
            tools: Arc::new(ToolRegistry::with_builtins()),
            locks: ConversationLocks::new(),
        }
    }

    /// State backed by the OpenAI clients.
    pub fn from_config(config: ServerConfig) -> Self {
        let chat = Arc::new(provider::create_chat_provider(&config));
        let jobs = Arc::new(provider::create_job_service(&config));
        Self::new(config, chat, jobs)
    }

    pub fn orchestrator(&self) -> RunOrchestrator {
        RunOrchestrator::new(
            self.jobs.clone(),
            self.tools.clone(),
            PollPolicy::from_config(&self.config),
        )
    }
}

/// Build the router with CORS, tracing and body-size layers.
pub fn router(state: AppState) -> Router {
    let origins = state.config.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|origin| origins.is_origin_allowed(origin))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/assistant", post(handlers::assistant))
        .route("/form", post(handlers::form))
        .route("/ecoclaim_assistant", post(handlers::ecoclaim_assistant))
        .route("/test", post(handlers::test))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), reject_disallowed_origin))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "http",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .with_state(state)
}

/// Requests carrying an `Origin` outside the allow-list get a 403 before
/// any route runs. Requests without an `Origin` pass through.
async fn reject_disallowed_origin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !state.config.is_origin_allowed(origin) {
            return Err(EcoError::CorsRejected(origin.to_string()).into());
        }
    }
    Ok(next.run(request).await)
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(state: AppState) -> Result<(), EcoError> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EcoError::Configuration(format!("failed to bind {addr}: {e}")))?;
    info!("Server listening on {addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
