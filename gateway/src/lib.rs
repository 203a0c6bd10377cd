use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;

use state::AppState;

/// Builds the HTTP surface: signed chat endpoints plus an unsigned health check.
pub fn app(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/chat/commands", post(handlers::chat::handle_command))
        .route("/chat/interactions", post(handlers::chat::handle_interaction))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::signature::verify_chat_signature,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(chat_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::request_id::request_id))
                .layer(axum_middleware::from_fn(
                    middleware::logging::log_error_responses,
                )),
        )
        .with_state(state)
}
