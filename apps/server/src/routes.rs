//! HTTP surface: a `/health` liveness probe and the `/ws` upgrade
//! route. No authentication layer — this server has none — but CORS
//! stays wide open, since any browser client should be able to reach
//! it directly.

use crate::handlers::{health, socket};
use crate::state::AppState;
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(socket::upgrade))
        .layer(cors)
        .with_state(state)
}
