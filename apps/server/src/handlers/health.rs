//! Liveness endpoint: reports whether the process is up and how many
//! sessions are currently tracked. Not a readiness probe — it never
//! touches the database.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthReport {
    status: &'static str,
    active_sessions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        active_sessions: state.registry.len(),
    })
}
