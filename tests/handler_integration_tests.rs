use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use composition_gate::{
    AppConfig, AppError, AppState, InMemoryContentProvider, create_router,
    access::mode::PREVIEW_COOKIE,
    auth::SessionOracle,
    content::{ContentProvider, normalize_route},
    models::{ContentNode, PageResponse, ReleaseState, RouteResolution, SessionSnapshot},
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// --- Mock Collaborators ---

struct FailingOracle;

#[async_trait]
impl SessionOracle for FailingOracle {
    async fn current_session(&self, _headers: &HeaderMap) -> Result<Option<SessionSnapshot>, AppError> {
        Err(AppError::SessionLookup("timeout".to_string()))
    }
}

struct AnonymousOracle;

#[async_trait]
impl SessionOracle for AnonymousOracle {
    async fn current_session(&self, _headers: &HeaderMap) -> Result<Option<SessionSnapshot>, AppError> {
        Ok(None)
    }
}

/// Records every route request so tests can check which revision was asked for.
#[derive(Default)]
struct RecordingContent {
    requests: Mutex<Vec<(String, ReleaseState)>>,
}

#[async_trait]
impl ContentProvider for RecordingContent {
    async fn fetch_route(&self, route: &str, state: ReleaseState) -> Result<RouteResolution, AppError> {
        self.requests.lock().unwrap().push((route.to_string(), state));
        Ok(RouteResolution::Composition {
            composition: ContentNode::default(),
        })
    }
}

fn state_with(content: Arc<dyn ContentProvider>, sessions: Arc<dyn SessionOracle>) -> AppState {
    AppState {
        content,
        sessions,
        config: AppConfig::default(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_session_failure_aborts_page() {
    let content = InMemoryContentProvider::new().with_composition("/", ContentNode::default());
    let router = create_router(state_with(Arc::new(content), Arc::new(FailingOracle)));

    let response = router.oneshot(get("/pages")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "session lookup failed: timeout");
}

#[tokio::test]
async fn test_route_key_is_normalized_and_published_by_default() {
    let content = Arc::new(RecordingContent::default());
    let router = create_router(state_with(content.clone(), Arc::new(AnonymousOracle)));

    let response = router.oneshot(get("/pages/blog/first-post/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page: PageResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(page.route, "/blog/first-post");

    let requests = content.requests.lock().unwrap();
    assert_eq!(
        *requests,
        vec![("/blog/first-post".to_string(), ReleaseState::Published)]
    );
}

#[tokio::test]
async fn test_preview_slug_must_be_site_relative() {
    let router = create_router(state_with(
        Arc::new(InMemoryContentProvider::new()),
        Arc::new(AnonymousOracle),
    ));
    let secret = AppConfig::default().preview_secret;

    for slug in ["https://evil.example", "//evil.example", "about"] {
        let uri = format!("/api/preview?secret={secret}&slug={slug}");
        let response = router.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "slug {slug}");
    }
}

#[tokio::test]
async fn test_preview_slug_with_control_characters_is_rejected_without_cookie() {
    let router = create_router(state_with(
        Arc::new(InMemoryContentProvider::new()),
        Arc::new(AnonymousOracle),
    ));
    let secret = AppConfig::default().preview_secret;

    let response = router
        .oneshot(get(&format!("/api/preview?secret={secret}&slug=/a%0Ab")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_preview_redirects_to_page_with_http_only_cookie() {
    let router = create_router(state_with(
        Arc::new(InMemoryContentProvider::new()),
        Arc::new(AnonymousOracle),
    ));
    let secret = AppConfig::default().preview_secret;

    let response = router
        .oneshot(get(&format!("/api/preview?secret={secret}&slug=/docs/intro")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/pages/docs/intro");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("{PREVIEW_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_disable_preview_expires_cookie() {
    let router = create_router(state_with(
        Arc::new(InMemoryContentProvider::new()),
        Arc::new(AnonymousOracle),
    ));

    let request = Request::builder()
        .uri("/api/preview/disable")
        .header(header::COOKIE, format!("{PREVIEW_COOKIE}=anything"))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/pages");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("{PREVIEW_COOKIE}=")));
    assert!(cookie.contains("Max-Age=0"));
}

#[test]
fn test_normalize_route() {
    assert_eq!(normalize_route(""), "/");
    assert_eq!(normalize_route("/"), "/");
    assert_eq!(normalize_route("about"), "/about");
    assert_eq!(normalize_route("/about/"), "/about");
    assert_eq!(normalize_route("docs/intro"), "/docs/intro");
}
