//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose claims carry the user `id` and an `exp`.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use codetrack_core::UserId;
use codetrack_telemetry::metrics::AUTH_FAILURES_TOTAL;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("auth is not configured: {0}")]
    Config(String),
}

impl AuthError {
    fn reason(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid(_) => "invalid",
            Self::Config(_) => "config",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub exp: u64,
}

/// Resolves a bearer token to the user it was issued for.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

#[derive(Clone)]
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator").finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Config("jwt secret is empty".into()));
        }
        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        })
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;
        Ok(UserId::new(data.claims.id))
    }
}

/// Mint a token for `user` that expires after `ttl`.
pub fn issue_token(secret: &str, user: UserId, ttl: Duration) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Config("jwt secret is empty".into()));
    }
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        id: user.get(),
        exp: now + ttl.as_secs(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Invalid(e.to_string()))
}

/// `Authorization` value with an optional `Bearer ` prefix removed.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let raw = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}

/// The authenticated caller. Rejects with 401 when no token is sent and 403
/// when the token does not verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let result = bearer_token(parts)
            .ok_or(AuthError::Missing)
            .and_then(|token| state.auth.authenticate(token));

        match result {
            Ok(user) => Ok(Self(user)),
            Err(err) => {
                metrics::counter!(AUTH_FAILURES_TOTAL, "reason" => err.reason()).increment(1);
                tracing::debug!(error = %err, "request rejected");
                Err(match err {
                    AuthError::Missing => ApiError::Unauthorized,
                    AuthError::Invalid(_) | AuthError::Config(_) => ApiError::Forbidden,
                })
            }
        }
    }
}
