//! Webhook HTTP server
//!
//! One endpoint: `POST /webhook` receives Telegram updates (authenticated
//! by the secret token header), `GET /webhook` answers a plain-text
//! liveness probe. Pipeline failures never surface here; any handled POST
//! is acknowledged with 200 so Telegram stops retrying the update.

/// Secret-token request authentication
pub mod auth;

use crate::media::WebhookUpdate;
use crate::pipeline;
use crate::transcription::cache::TranscriptionCache;
use crate::transcription::{AudioExtractor, TranscriptionProvider};
use auth::WebhookAuthenticator;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use teloxide::Bot;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

/// Shared application state threaded through every request handler.
///
/// Constructed once in `main`; the cache and collaborators live for the
/// process lifetime.
#[derive(Clone)]
pub struct AppState {
    /// Telegram Bot API client
    pub bot: Bot,
    /// Webhook secret-token authenticator
    pub authenticator: Arc<WebhookAuthenticator>,
    /// Remote transcription provider
    pub provider: Arc<dyn TranscriptionProvider>,
    /// Process-lifetime transcription cache
    pub cache: Arc<TranscriptionCache>,
    /// Optional audio extraction capability for video containers
    pub extractor: Option<Arc<dyn AudioExtractor>>,
}

/// Builds the webhook router with request tracing.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/webhook", get(liveness_handler).post(webhook_handler))
        .layer(trace_layer)
        .with_state(state)
}

/// Binds the listener and serves until ctrl-c.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Webhook server listening on {host}:{port}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

async fn liveness_handler() -> &'static str {
    "Telegram Bot is active!"
}

async fn webhook_handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.authenticator.authenticate(&method, &headers) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let update: WebhookUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            // Parse failures happen outside the pipeline, so this is the
            // one place a handled POST does not acknowledge with 200
            error!(error = %e, "Failed to parse webhook body");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    if let Some(message) = update.message {
        pipeline::handle_update(&state, message).await;
    }

    (StatusCode::OK, "OK").into_response()
}
