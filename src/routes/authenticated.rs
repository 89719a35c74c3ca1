use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes wrapped by the session-requiring middleware in `create_router`.
/// Handlers may rely on a session being present.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The session resolved for this request.
        .route("/me", get(handlers::get_me))
}
