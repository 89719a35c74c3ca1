use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. Whole routes are never gated here;
/// per-node visibility inside a page is decided by composition access control.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /pages and GET /pages/{*route}
        // Resolves the route through the content service, then annotates and
        // filters the composition for the current viewer.
        .route("/pages", get(handlers::get_root_page))
        .route("/pages/{*route}", get(handlers::get_page))
        // GET /api/preview?secret=...&slug=...
        // CMS entry point: sets the signed preview cookie.
        .route("/api/preview", get(handlers::enable_preview))
        // GET /api/preview/disable
        .route("/api/preview/disable", get(handlers::disable_preview))
}
