use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::{config::AppConfig, error::AppError, models::ReleaseState};

/// Query parameter the CMS editor sets when it loads a page inside its canvas.
pub const EDITOR_QUERY_PARAMETER: &str = "is_incontext_editing_mode";
/// HttpOnly cookie carrying the signed preview token.
pub const PREVIEW_COOKIE: &str = "__preview_session";

const PREVIEW_SUBJECT: &str = "preview";
const PREVIEW_TTL_SECONDS: i64 = 60 * 60;

/// EditorMode
///
/// The request's preview and editor state, resolved once per request by the
/// extractor below and threaded into both annotation and the filter-skip decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorMode {
    preview: bool,
    editor_requested: bool,
}

impl EditorMode {
    /// `preview` must come from a server-validated source (the signed preview
    /// cookie); `editor_requested` from the query string.
    pub fn detect(preview: bool, editor_requested: bool) -> Self {
        Self {
            preview,
            editor_requested,
        }
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Bypass needs both signals, so a bare query flag never grants it.
    pub fn is_editor_bypass(&self) -> bool {
        self.preview && self.editor_requested
    }

    pub fn release_state(&self) -> ReleaseState {
        if self.preview {
            ReleaseState::Preview
        } else {
            ReleaseState::Published
        }
    }
}

#[derive(Deserialize)]
struct EditorQuery {
    is_incontext_editing_mode: Option<String>,
}

impl<S> FromRequestParts<S> for EditorMode
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let preview = CookieJar::from_headers(&parts.headers)
            .get(PREVIEW_COOKIE)
            .is_some_and(|cookie| preview_token_is_valid(&config.preview_secret, cookie.value()));

        let editor_requested = Query::<EditorQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.is_incontext_editing_mode)
            .is_some_and(|flag| flag == "true");

        let mode = EditorMode::detect(preview, editor_requested);
        tracing::trace!(
            preview,
            editor_requested,
            editor_bypass = mode.is_editor_bypass(),
            "resolved editor mode"
        );
        Ok(mode)
    }
}

// --- Preview Token ---

#[derive(Debug, Serialize, Deserialize)]
struct PreviewClaims {
    sub: String,
    exp: usize,
    iat: usize,
}

/// Signs a short-lived preview token with the preview secret.
pub fn issue_preview_token(secret: &str) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = PreviewClaims {
        sub: PREVIEW_SUBJECT.to_string(),
        iat: now as usize,
        exp: (now + PREVIEW_TTL_SECONDS) as usize,
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

pub fn preview_token_is_valid(secret: &str, token: &str) -> bool {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.sub = Some(PREVIEW_SUBJECT.to_string());

    let key = DecodingKey::from_secret(secret.as_bytes());
    match decode::<PreviewClaims>(token, &key, &validation) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error = %e, "rejected preview token");
            false
        }
    }
}

/// The cookie that turns preview on. Cross-site (`SameSite=None`) and `Secure`
/// outside local development, so the CMS canvas iframe can carry it.
pub fn preview_cookie(token: String, secure: bool) -> Cookie<'static> {
    let same_site = if secure { SameSite::None } else { SameSite::Lax };
    Cookie::build((PREVIEW_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .build()
}

pub fn expired_preview_cookie() -> Cookie<'static> {
    Cookie::build(PREVIEW_COOKIE).path("/").build()
}
