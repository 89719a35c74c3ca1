use async_trait::async_trait;
use reqwest::StatusCode;
use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{
    error::AppError,
    models::{ContentNode, ReleaseState, RouteResolution},
};

// 1. ContentProvider Contract
/// ContentProvider
///
/// Resolves a route key to a composition tree, a redirect, or not-found.
/// Each call returns a freshly owned tree for the current request.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn fetch_route(&self, route: &str, state: ReleaseState) -> Result<RouteResolution, AppError>;
}

/// ContentState
///
/// Shared handle to the content provider held in `AppState`.
pub type ContentState = Arc<dyn ContentProvider>;

/// normalize_route
///
/// Canonical route key: exactly one leading slash, no trailing slash except for `/`.
pub fn normalize_route(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

// 2. The Real Implementation (Content Delivery API)
/// HttpContentProvider
///
/// Queries the CMS route endpoint: `GET {base}/api/v1/route?projectId&path&state`
/// authenticated with an `x-api-key` header.
#[derive(Clone)]
pub struct HttpContentProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    project_id: String,
}

impl HttpContentProvider {
    pub fn new(base_url: &str, api_key: &str, project_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            project_id: project_id.to_string(),
        }
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn fetch_route(&self, route: &str, state: ReleaseState) -> Result<RouteResolution, AppError> {
        let route = normalize_route(route);
        let url = format!("{}/api/v1/route", self.base_url);

        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.api_key)
            .query(&[
                ("projectId", self.project_id.as_str()),
                ("path", route.as_str()),
                ("state", state.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RouteResolution::NotFound);
        }
        if !response.status().is_success() {
            return Err(AppError::ContentFetch(format!(
                "route {route} answered with status {}",
                response.status()
            )));
        }

        response
            .json::<RouteResolution>()
            .await
            .map_err(|e| AppError::ContentFetch(e.to_string()))
    }
}

// 3. The In-Memory Implementation (Local Fixtures and Tests)
/// InMemoryContentProvider
///
/// Serves route resolutions from memory. Draft entries shadow published ones
/// when preview content is requested.
#[derive(Clone, Default)]
pub struct InMemoryContentProvider {
    published: HashMap<String, RouteResolution>,
    drafts: HashMap<String, RouteResolution>,
    /// When true, every fetch fails as an unreachable content service would.
    pub should_fail: bool,
}

/// Fixture file layout: `{ "published": { route: resolution }, "drafts": { ... } }`.
#[derive(serde::Deserialize)]
struct Fixtures {
    #[serde(default)]
    published: HashMap<String, RouteResolution>,
    #[serde(default)]
    drafts: HashMap<String, RouteResolution>,
}

impl InMemoryContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub async fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::ContentFetch(format!("{}: {e}", path.display())))?;
        let fixtures: Fixtures =
            serde_json::from_str(&raw).map_err(|e| AppError::ContentFetch(e.to_string()))?;

        let normalize = |table: HashMap<String, RouteResolution>| -> HashMap<String, RouteResolution> {
            table
                .into_iter()
                .map(|(route, resolution)| (normalize_route(&route), resolution))
                .collect()
        };
        Ok(Self {
            published: normalize(fixtures.published),
            drafts: normalize(fixtures.drafts),
            should_fail: false,
        })
    }

    pub fn with_composition(mut self, route: &str, composition: ContentNode) -> Self {
        self.published
            .insert(normalize_route(route), RouteResolution::Composition { composition });
        self
    }

    pub fn with_draft(mut self, route: &str, composition: ContentNode) -> Self {
        self.drafts
            .insert(normalize_route(route), RouteResolution::Composition { composition });
        self
    }

    pub fn with_redirect(mut self, route: &str, location: &str, permanent: bool) -> Self {
        self.published.insert(
            normalize_route(route),
            RouteResolution::Redirect {
                location: location.to_string(),
                permanent,
            },
        );
        self
    }
}

#[async_trait]
impl ContentProvider for InMemoryContentProvider {
    async fn fetch_route(&self, route: &str, state: ReleaseState) -> Result<RouteResolution, AppError> {
        if self.should_fail {
            return Err(AppError::ContentFetch(
                "in-memory content service configured to fail".to_string(),
            ));
        }

        let route = normalize_route(route);
        let draft = match state {
            ReleaseState::Preview => self.drafts.get(&route),
            ReleaseState::Published => None,
        };

        Ok(draft
            .or_else(|| self.published.get(&route))
            .cloned()
            .unwrap_or(RouteResolution::NotFound))
    }
}
