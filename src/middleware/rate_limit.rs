use axum::{http::StatusCode, Json};
use serde_json::json;

/// Fixed-window limit: at most `max_attempts` per `window_secs`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_attempts: u64,
    pub window_secs: u64,
}

/// Per-username login attempts.
pub const LOGIN_LIMIT: RateLimit = RateLimit { max_attempts: 5, window_secs: 900 };

/// Per-user menu generations and regenerations (each may call the hosted model).
pub const PLANNING_LIMIT: RateLimit = RateLimit { max_attempts: 30, window_secs: 3600 };

/// INCR the counter for `key`, set its TTL on the first hit, reject with 429
/// past the limit. Redis failures let the request through.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    limit: RateLimit,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let count: u64 = match redis::cmd("INCR").arg(key).query_async(redis).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Rate limit check skipped for {}: {}", key, e);
            return Ok(());
        }
    };

    if count == 1 {
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(limit.window_secs)
            .query_async(redis)
            .await;
    }

    if count > limit.max_attempts {
        let retry_after: i64 = redis::cmd("TTL")
            .arg(key)
            .query_async(redis)
            .await
            .unwrap_or(limit.window_secs as i64);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many attempts. Try again in a few minutes.",
                "retry_after_secs": retry_after.max(0),
            })),
        ));
    }

    Ok(())
}
