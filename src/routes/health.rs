use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health — DB ping plus the planner mode (`agent` or `fallback_only`)
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let planner = if state.planner.has_agent() { "agent" } else { "fallback_only" };
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "planner": planner })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": e.to_string(), "planner": planner })),
        ),
    }
}
