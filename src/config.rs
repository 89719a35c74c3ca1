use std::env;
use thiserror::Error;

/// AppConfig
///
/// Holds the service's entire configuration state. Immutable once loaded and
/// pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local `x-user-id` session shortcut
    // and whether the preview cookie is marked `Secure`.
    pub env: Env,
    // Secret used to validate session JWTs issued by the identity provider.
    pub jwt_secret: String,
    // Shared secret the CMS presents to enable preview, also the preview token signing key.
    pub preview_secret: String,
    // Base URL of the content-delivery API. `None` means serve local fixtures.
    pub content_api_url: Option<String>,
    pub content_api_key: String,
    pub content_project_id: String,
    // JSON fixture file used by the in-memory content provider when no API is configured.
    pub content_fixtures: String,
    pub bind_addr: String,
}

/// Env
///
/// Runtime context: `Local` enables development shortcuts and defaults,
/// `Production` requires every secret to be set explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const LOCAL_PREVIEW_SECRET: &str = "local-preview-secret";

impl Default for AppConfig {
    /// Safe, non-failing values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            preview_secret: LOCAL_PREVIEW_SECRET.to_string(),
            content_api_url: None,
            content_api_key: String::new(),
            content_project_id: "local".to_string(),
            content_fixtures: "fixtures/routes.json".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads configuration from the environment (after `.env` has been applied).
    ///
    /// # Errors
    /// In `Production`, returns `ConfigError::Missing` for the first absent secret,
    /// so the service never starts with an incomplete or insecure configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();
        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let content_fixtures = env::var("CONTENT_FIXTURES").unwrap_or(defaults.content_fixtures);

        match env {
            Env::Local => Ok(Self {
                env: Env::Local,
                jwt_secret: env::var("AUTH_JWT_SECRET").unwrap_or(defaults.jwt_secret),
                preview_secret: env::var("PREVIEW_SECRET").unwrap_or(defaults.preview_secret),
                content_api_url: env::var("CONTENT_API_URL").ok(),
                content_api_key: env::var("CONTENT_API_KEY").unwrap_or_default(),
                content_project_id: env::var("CONTENT_PROJECT_ID")
                    .unwrap_or(defaults.content_project_id),
                content_fixtures,
                bind_addr,
            }),
            Env::Production => Ok(Self {
                env: Env::Production,
                jwt_secret: required("AUTH_JWT_SECRET")?,
                preview_secret: required("PREVIEW_SECRET")?,
                content_api_url: Some(required("CONTENT_API_URL")?),
                content_api_key: required("CONTENT_API_KEY")?,
                content_project_id: required("CONTENT_PROJECT_ID")?,
                content_fixtures,
                bind_addr,
            }),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}
