use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    auth::Claims,
    user::{RegisterRequest, User},
};

const BCRYPT_COST: u32 = 12;

/// Client-facing failures. Anything else is a server error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username already registered")]
    UsernameTaken,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Invalid(&'static str),
}

/// Maps a violated unique constraint on `users` to the matching client error.
fn duplicate_user(constraint: Option<&str>) -> AuthError {
    match constraint {
        Some(name) if name.contains("email") => AuthError::EmailTaken,
        _ => AuthError::UsernameTaken,
    }
}

pub struct AuthService;

impl AuthService {
    pub async fn register(pool: &PgPool, req: &RegisterRequest) -> anyhow::Result<User> {
        let username = req.username.trim();
        let email = req.email.trim().to_lowercase();
        if username.is_empty() {
            return Err(AuthError::Invalid("Username is required").into());
        }
        if !email.contains('@') {
            return Err(AuthError::Invalid("A valid email is required").into());
        }
        if req.password.len() < 6 {
            return Err(AuthError::Invalid("Password must be at least 6 characters").into());
        }

        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;
        if username_taken {
            return Err(AuthError::UsernameTaken.into());
        }

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&email)
                .fetch_one(pool)
                .await?;
        if email_taken {
            return Err(AuthError::EmailTaken.into());
        }

        let password_hash = bcrypt::hash(&req.password, BCRYPT_COST)?;
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(&email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            // a concurrent registration won the race between the checks and the insert
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return anyhow::Error::from(duplicate_user(db.constraint()));
                }
            }
            anyhow::Error::from(e)
        })?;

        tracing::info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Verify credentials and issue an access token.
    pub async fn login(
        pool: &PgPool,
        username: &str,
        password: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username.trim())
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        Self::generate_access_token(&user, jwt_secret, ttl_seconds)
    }

    pub async fn find_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub fn generate_access_token(user: &User, secret: &str, ttl_seconds: u64) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "asha".into(),
            email: "asha@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_decodes_to_the_same_user() {
        let user = user();
        let token = AuthService::generate_access_token(&user, "secret", 600).unwrap();
        let decoded = decode_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, user.id);
        assert_eq!(decoded.username, "asha");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = AuthService::generate_access_token(&user(), "secret", 600).unwrap();
        assert!(decode_access_token(&token, "other").is_err());
    }

    #[test]
    fn unique_violations_map_to_client_errors() {
        assert_eq!(duplicate_user(Some("users_email_key")), AuthError::EmailTaken);
        assert_eq!(duplicate_user(Some("users_username_key")), AuthError::UsernameTaken);
        assert_eq!(duplicate_user(None), AuthError::UsernameTaken);
    }

    #[test]
    fn client_errors_survive_anyhow() {
        let err: anyhow::Error = AuthError::EmailTaken.into();
        assert_eq!(err.downcast_ref::<AuthError>(), Some(&AuthError::EmailTaken));
        assert_eq!(err.to_string(), "Email already registered");
    }
}
