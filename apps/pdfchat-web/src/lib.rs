//! pdfchat-web
//!
//! Browser front end: upload PDFs, chat with or without them as context.

pub mod render;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::{AppState, Notice, SessionFactory};

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes();
    Router::new()
        .route("/", get(routes::index))
        .route("/documents", post(routes::upload_documents))
        .route("/chat", post(routes::chat))
        .route("/rag/disable", post(routes::disable_rag))
        .route("/abort", post(routes::abort))
        .route("/session/end", post(routes::end_session))
        .route("/api/status", get(routes::status))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
