use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    models::{auth::AuthenticatedUser, preference::MealPreferences},
    services::preferences::PreferenceService,
    AppState,
};

/// POST /preferences — create or replace
pub async fn save_preferences(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<MealPreferences>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PreferenceService::upsert(&state.db, user.user_id, body)
        .await
        .map(|prefs| {
            Json(json!({
                "msg": "Preferences saved successfully",
                "preferences": prefs,
            }))
        })
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// GET /preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    PreferenceService::get(&state.db, user.user_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .map(|prefs| Json(json!(prefs)))
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "Preferences not found" }))))
}
