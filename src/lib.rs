use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Composition access control: annotation, filtering, editor mode.
pub mod access;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod handlers;
pub mod models;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use auth::SignedIn;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{JwtSessionOracle, SessionState};
pub use config::AppConfig;
pub use content::{ContentState, HttpContentProvider, InMemoryContentProvider};
pub use error::AppError;

/// ApiDoc
///
/// OpenAPI document for every handler and response schema, served at
/// `/api-docs/openapi.json` and browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_root_page, handlers::get_page, handlers::enable_preview,
        handlers::disable_preview, handlers::get_me
    ),
    components(
        schemas(
            models::PageResponse, models::ContentNode, models::AccessDecision,
            models::AccessReason, models::AuthState, models::SessionSnapshot,
            models::SessionUser,
        )
    ),
    tags(
        (name = "composition-gate", description = "Composition access control API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable per-process state. Every request owns its own content tree;
/// nothing in here is mutated while serving.
#[derive(Clone)]
pub struct AppState {
    /// Content Tree Provider: resolves routes to compositions.
    pub content: ContentState,
    /// Session Oracle: resolves the viewer's session once per request.
    pub sessions: SessionState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ContentState {
    fn from_ref(app_state: &AppState) -> ContentState {
        app_state.content.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// session_middleware
///
/// Gates `authenticated_routes`. The `SignedIn` extractor rejects with 401 when
/// the oracle finds no session (or with 502 when it fails); the resolved session
/// is cached on the request so handlers do not look it up again.
async fn session_middleware(_signed_in: SignedIn, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles routing, scoped session middleware, observability layers and state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying method, uri and the `x-request-id`, so every
/// log line of one request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
