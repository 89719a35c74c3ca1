use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::{SessionSnapshot, SessionUser},
};

/// Cookie set by the identity provider once sign-in completes.
pub const SESSION_COOKIE: &str = "session_token";
/// Local-only shortcut header naming the signed-in user.
pub const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session JWT issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// SessionOracle
///
/// Answers "does this request carry a session, and whose?". `Ok(None)` means
/// anonymous; `Err` means the question could not be answered and must fail the
/// request instead of being read as anonymous.
#[async_trait]
pub trait SessionOracle: Send + Sync {
    async fn current_session(&self, headers: &HeaderMap) -> Result<Option<SessionSnapshot>, AppError>;
}

/// SessionState
///
/// Shared handle to the session oracle held in `AppState`.
pub type SessionState = Arc<dyn SessionOracle>;

/// JwtSessionOracle
///
/// Verifies HS256 session tokens taken from `Authorization: Bearer` or the
/// session cookie. A missing, malformed or expired token is simply "no session".
pub struct JwtSessionOracle {
    env: Env,
    decoding_key: DecodingKey,
}

impl JwtSessionOracle {
    pub fn new(env: Env, secret: &str) -> Self {
        Self {
            env,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.env.clone(), &config.jwt_secret)
    }

    fn local_user(&self, headers: &HeaderMap) -> Option<SessionSnapshot> {
        if self.env != Env::Local {
            return None;
        }
        let id = headers
            .get(LOCAL_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok())?;

        Some(SessionSnapshot {
            user: SessionUser {
                id,
                name: None,
                email: None,
            },
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

#[async_trait]
impl SessionOracle for JwtSessionOracle {
    async fn current_session(&self, headers: &HeaderMap) -> Result<Option<SessionSnapshot>, AppError> {
        if let Some(session) = self.local_user(headers) {
            return Ok(Some(session));
        }

        let Some(token) = bearer_token(headers).or_else(|| cookie_token(headers)) else {
            return Ok(None);
        };

        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<Claims>(&token, &self.decoding_key, &validation) {
            Ok(data) => Ok(Some(SessionSnapshot {
                user: SessionUser {
                    id: data.claims.sub,
                    name: data.claims.name,
                    email: data.claims.email,
                },
            })),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    _ => tracing::debug!(error = %e, "session token rejected"),
                }
                Ok(None)
            }
        }
    }
}

/// ViewerSession
///
/// Extractor resolving the current session exactly once per request through the
/// configured `SessionOracle`. Oracle failures reject the request.
#[derive(Debug, Clone)]
pub struct ViewerSession(pub Option<SessionSnapshot>);

impl<S> FromRequestParts<S> for ViewerSession
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<ViewerSession>() {
            return Ok(resolved.clone());
        }

        let oracle = SessionState::from_ref(state);
        let session = oracle.current_session(&parts.headers).await?;

        let resolved = ViewerSession(session);
        parts.extensions.insert(resolved.clone());
        Ok(resolved)
    }
}

/// SignedIn
///
/// Extractor for routes that require a session; rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct SignedIn(pub SessionSnapshot);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ViewerSession(session) = ViewerSession::from_request_parts(parts, state).await?;
        session.map(SignedIn).ok_or(AppError::Unauthorized)
    }
}
