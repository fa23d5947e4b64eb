use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    middleware::rate_limit::{check_rate_limit, LOGIN_LIMIT},
    models::{
        auth::AuthenticatedUser,
        user::{LoginRequest, RegisterRequest, TokenResponse, UserProfile},
    },
    services::{
        auth::{AuthError, AuthService},
        metrics::LOGINS_COUNTER,
    },
    AppState,
};

fn auth_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    let status = match e.downcast_ref::<AuthError>() {
        Some(_) => StatusCode::BAD_REQUEST,
        None => {
            tracing::error!("Auth request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": e.to_string() })))
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let user = AuthService::register(&state.db, &body).await.map_err(auth_error)?;
    Ok(Json(json!({
        "msg": "User registered successfully",
        "user": UserProfile::from(user),
    })))
}

/// POST /login — 5 attempts per 15 min per username
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let rate_key = format!("rate:login:{}", body.username.trim().to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, LOGIN_LIMIT).await?;

    match AuthService::login(
        &state.db,
        &body.username,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_minutes * 60,
    )
    .await
    {
        Ok(access_token) => {
            LOGINS_COUNTER.with_label_values(&["success"]).inc();
            Ok(Json(json!(TokenResponse {
                access_token,
                token_type: "bearer".into(),
            })))
        }
        Err(e) => {
            LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            Err(auth_error(e))
        }
    }
}

/// GET /me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    AuthService::find_user(&state.db, user.user_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?
        .map(|u| Json(json!(UserProfile::from(u))))
        .ok_or((StatusCode::NOT_FOUND, Json(json!({ "error": "User not found" }))))
}
