use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};

use crate::models::auth::{AuthenticatedUser, Claims};

/// Signing secret for access tokens, installed on the router as an extension
/// so the extractor does not depend on `AppState`.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// Why a bearer-protected request (`/me`, `/preferences`, the menu routes) was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("Not authenticated")]
    MissingToken,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Token signing is not configured")]
    NoSecret,
}

impl AuthRejection {
    fn status(&self) -> StatusCode {
        match self {
            AuthRejection::NoSecret => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<AuthRejection> for (StatusCode, Json<Value>) {
    fn from(rejection: AuthRejection) -> Self {
        (rejection.status(), Json(json!({ "error": rejection.to_string() })))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthRejection::MissingToken)?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or(AuthRejection::NoSecret)?;

        let user = decode_access_token(token, &secret.0).map_err(|e| {
            tracing::debug!("Rejected access token: {}", e);
            AuthRejection::InvalidToken
        })?;
        Ok(user)
    }
}

/// The token of an `Authorization: Bearer <token>` header; the scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Validates signature and expiry; the subject must be a user id.
pub fn decode_access_token(token: &str, secret: &str) -> anyhow::Result<AuthenticatedUser> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &key, &validation)?.claims;
    Ok(AuthenticatedUser {
        user_id: claims.sub.parse()?,
        username: claims.username,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>, secret: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(secret) = secret {
            parts.extensions.insert(JwtSecret(secret.to_string()));
        }
        parts
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[tokio::test]
    async fn rejections_carry_a_json_error() {
        let (status, Json(body)) = AuthenticatedUser::from_request_parts(&mut parts(None, Some("s")), &())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Not authenticated");

        let (status, Json(body)) =
            AuthenticatedUser::from_request_parts(&mut parts(Some("Bearer not-a-jwt"), Some("s")), &())
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Could not validate credentials");

        let (status, _) = AuthenticatedUser::from_request_parts(&mut parts(Some("Bearer x"), None), &())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
