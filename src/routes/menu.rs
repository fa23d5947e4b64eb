use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    middleware::rate_limit::{check_rate_limit, PLANNING_LIMIT},
    models::{
        auth::AuthenticatedUser,
        menu::{MenuHistoryItem, MenuHistoryQuery, MenuHistoryResponse, MenuResponse, RegenerateMealRequest},
    },
    services::{
        menu::{history_limit, MenuService},
        preferences::PreferenceService,
    },
    AppState,
};

type ApiError = (StatusCode, Json<Value>);

fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!("Menu request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

fn menu_not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Menu not found" })))
}

/// POST /generate-menu — plan a week from the stored preferences and make it active
pub async fn generate_menu(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let rate_key = format!("rate:plan:{}", user.user_id);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, PLANNING_LIMIT).await?;

    let prefs = PreferenceService::get(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Set preferences before generating menu" })),
        ))?;

    let generated = state.planner.generate_weekly_menu(&prefs).await;

    let saved = MenuService::save_active(
        &state.db,
        user.user_id,
        &generated.menu,
        &generated.preferences_used,
        generated.fallback_used,
        generated.generated_at,
    )
    .await
    .map_err(internal)?;

    let mut body = json!(MenuResponse::from(saved));
    if let Some(message) = generated.message {
        body["message"] = json!(message);
    }
    Ok(Json(body))
}

/// GET /current-menu
pub async fn current_menu(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    MenuService::current(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .map(|menu| Json(json!(MenuResponse::from(menu))))
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "No active menu found" }))))
}

/// POST /regenerate-meal — swap one dish for one not yet used in that slot this week
pub async fn regenerate_meal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RegenerateMealRequest>,
) -> Result<Json<Value>, ApiError> {
    let rate_key = format!("rate:plan:{}", user.user_id);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, PLANNING_LIMIT).await?;

    let menu = MenuService::find(&state.db, user.user_id, body.menu_id)
        .await
        .map_err(internal)?
        .ok_or_else(menu_not_found)?;

    let grid = &menu.menu_data.0;
    if grid.get(body.day, body.meal).is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("{} has no {} in this menu", body.day, body.meal) })),
        ));
    }

    let slot_dishes = grid.slot_dishes(body.meal);
    let prefs = &menu.generation_prompt.0;
    let result = state
        .planner
        .regenerate_one(prefs, &slot_dishes, body.day, body.meal)
        .await;
    let source = result.source();
    let dish = result.into_value();

    let updated = MenuService::replace_dish(&state.db, user.user_id, menu.id, body.day, body.meal, &dish)
        .await
        .map_err(internal)?
        .ok_or_else(menu_not_found)?;

    let mut response = json!(MenuResponse::from(updated));
    response["regenerated"] = json!({
        "day": body.day,
        "meal": body.meal,
        "dish": dish,
        "source": source,
    });
    Ok(Json(response))
}

/// GET /menu-history?limit=N — newest first
pub async fn menu_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<MenuHistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = history_limit(params.limit);
    let menus = MenuService::history(&state.db, user.user_id, limit)
        .await
        .map_err(internal)?;

    Ok(Json(json!(MenuHistoryResponse {
        menus: menus.into_iter().map(MenuHistoryItem::from).collect(),
    })))
}

/// GET /menus/{id}/grocery-list
pub async fn grocery_list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(menu_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let menu = MenuService::find(&state.db, user.user_id, menu_id)
        .await
        .map_err(internal)?
        .ok_or_else(menu_not_found)?;

    let list = state.planner.tools().generate_grocery_list(&menu.menu_data.0);
    Ok(Json(json!({ "menu_id": menu.id, "grocery_list": list })))
}

/// POST /menus/{id}/activate — restore a menu from history
pub async fn activate_menu(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(menu_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    MenuService::activate(&state.db, user.user_id, menu_id)
        .await
        .map_err(internal)?
        .map(|menu| Json(json!(MenuResponse::from(menu))))
        .ok_or_else(menu_not_found)
}
