//! HTTP adapter - application router.
//!
//! Mounts the WebSocket endpoint next to a health probe and wraps both in
//! request tracing and CORS.

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::config::ServerConfig;

/// Liveness probe.
///
/// Route: `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// Build the CORS layer from the configured origins.
///
/// Without configured origins every origin is allowed outside production and
/// none are allowed in production.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() && !config.is_production() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router.
///
/// # Example
///
/// ```ignore
/// let app = app_router(ws_state, &config.server);
/// axum::serve(listener, app).await?;
/// ```
pub fn app_router(state: WebSocketState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(websocket_router().with_state(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
}
