//! HTTP and websocket surface of the posture service.
//!
//! - `POST /` and `POST /api/v1/posture` - classify one frame
//! - `GET /ws` - websocket frame channel
//! - `GET /health` - liveness
//! - `GET /ready` - detector readiness

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;
pub mod websocket;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::config::config::ServerConfig;

pub use error::ApiError;
pub use state::AppState;

/// Largest accepted request body; camera frames arrive base64 encoded.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// create_router wires every endpoint to the shared state.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/", post(handlers::classify_frame))
        .route("/api/v1/posture", post(handlers::classify_frame))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/ws", get(websocket::ws_handler))
        .layer(DefaultBodyLimit::max(MAX_FRAME_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors_allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
