// Module: http
// Websocket chat endpoint, generated help page and health probe

pub mod health;
pub mod help;
pub mod websocket;

use axum::{routing::get, Router};
use movienight_core::service::ChatService;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    /// Capacity of each connection's outbound channel
    pub outbound_buffer: usize,
}

/// Create the HTTP router with all routes
pub fn create_router(chat: ChatService, outbound_buffer: usize) -> Router {
    let state = AppState {
        chat,
        outbound_buffer: outbound_buffer.max(1),
    };

    Router::new()
        .merge(health::create_health_router())
        .route("/ws", get(websocket::websocket_handler))
        .route("/help", get(help::help_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
