use crate::{
    AppState,
    access::{
        self, EditorMode,
        mode::{expired_preview_cookie, issue_preview_token, preview_cookie},
    },
    auth::{SignedIn, ViewerSession},
    config::Env,
    content::normalize_route,
    error::AppError,
    models::{PageResponse, RouteResolution, SessionSnapshot, ViewerContext},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderValue,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

// --- Query Structs ---

/// PreviewRequest
///
/// Query parameters the CMS sends when it opens a page in preview.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PreviewRequest {
    /// Must equal the configured preview secret.
    pub secret: String,
    /// Site-relative path of the page to preview. Defaults to `/`.
    pub slug: Option<String>,
}

// --- Handlers ---

/// get_root_page
///
/// [Public Route] The page at `/`.
#[utoipa::path(
    get,
    path = "/pages",
    responses(
        (status = 200, description = "Composition after access control", body = PageResponse),
        (status = 307, description = "Redirect configured in the CMS"),
        (status = 404, description = "No content for route"),
        (status = 502, description = "Session or content service failure")
    )
)]
pub async fn get_root_page(
    State(state): State<AppState>,
    mode: EditorMode,
    session: ViewerSession,
) -> Result<Response, AppError> {
    render_page(state, "/", mode, session).await
}

/// get_page
///
/// [Public Route] Resolves a route through the content service and applies
/// composition access control for the current viewer.
#[utoipa::path(
    get,
    path = "/pages/{route}",
    params(("route" = String, Path, description = "Page route, may contain slashes")),
    responses(
        (status = 200, description = "Composition after access control", body = PageResponse),
        (status = 307, description = "Redirect configured in the CMS"),
        (status = 404, description = "No content for route"),
        (status = 502, description = "Session or content service failure")
    )
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(route): Path<String>,
    mode: EditorMode,
    session: ViewerSession,
) -> Result<Response, AppError> {
    render_page(state, &route, mode, session).await
}

/// render_page
///
/// Fetches the tree, short-circuits redirects and not-found, then annotates and
/// (outside editor bypass) filters. `mode` and `session` were each resolved once
/// by their extractors and are used unchanged for every step.
async fn render_page(
    state: AppState,
    route: &str,
    mode: EditorMode,
    ViewerSession(session): ViewerSession,
) -> Result<Response, AppError> {
    let route = normalize_route(route);

    let composition = match state.content.fetch_route(&route, mode.release_state()).await? {
        RouteResolution::Composition { composition } => composition,
        RouteResolution::Redirect { location, permanent } => {
            tracing::debug!(%route, %location, permanent, "route redirects");
            let redirect = if permanent {
                Redirect::permanent(&location)
            } else {
                Redirect::temporary(&location)
            };
            return Ok(redirect.into_response());
        }
        RouteResolution::NotFound => return Err(AppError::NotFound(route)),
    };

    let viewer = ViewerContext::new(mode.is_editor_bypass(), session);
    let tree = access::enforce(composition, &viewer);

    Ok(Json(PageResponse {
        route,
        editor_bypass: viewer.is_editor_bypass,
        composition: tree.into_inner(),
    })
    .into_response())
}

/// enable_preview
///
/// [Public Route] Entry point used by the CMS. Verifies the shared secret, sets
/// the signed preview cookie and redirects to the requested page.
#[utoipa::path(
    get,
    path = "/api/preview",
    params(PreviewRequest),
    responses(
        (status = 307, description = "Preview enabled, redirecting to the page"),
        (status = 400, description = "Slug is not a site-relative path"),
        (status = 401, description = "Wrong preview secret")
    )
)]
pub async fn enable_preview(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(request): Query<PreviewRequest>,
) -> Result<(CookieJar, Redirect), AppError> {
    if request.secret != state.config.preview_secret {
        return Err(AppError::Unauthorized);
    }

    let slug = request.slug.unwrap_or_else(|| "/".to_string());
    if !slug.starts_with('/')
        || slug.starts_with("//")
        || slug.contains("://")
        || HeaderValue::from_str(&slug).is_err()
    {
        return Err(AppError::BadRequest(format!("slug {slug} is not site-relative")));
    }

    let token = issue_preview_token(&state.config.preview_secret)?;
    let secure = state.config.env == Env::Production;
    let target = match normalize_route(&slug).as_str() {
        "/" => "/pages".to_string(),
        route => format!("/pages{route}"),
    };

    tracing::info!(%target, "preview enabled");
    Ok((jar.add(preview_cookie(token, secure)), Redirect::temporary(&target)))
}

/// disable_preview
///
/// [Public Route] Clears the preview cookie and returns to the published site.
#[utoipa::path(
    get,
    path = "/api/preview/disable",
    responses((status = 307, description = "Preview disabled"))
)]
pub async fn disable_preview(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(expired_preview_cookie()), Redirect::temporary("/pages"))
}

/// get_me
///
/// [Authenticated Route] The session resolved for the current request.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current session", body = SessionSnapshot),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(SignedIn(session): SignedIn) -> Json<SessionSnapshot> {
    Json(session)
}
