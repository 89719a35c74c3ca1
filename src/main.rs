use composition_gate::{
    AppState,
    config::{AppConfig, Env},
    content::{ContentState, HttpContentProvider, InMemoryContentProvider},
    create_router,
    auth::{JwtSessionOracle, SessionState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, wires the content provider and
/// session oracle into `AppState`, and serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging: RUST_LOG wins, otherwise development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "composition_gate=debug,tower_http=info,axum=trace".into());

    // 3. Pretty output locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Content Tree Provider: the delivery API when configured, fixtures otherwise.
    let content = match &config.content_api_url {
        Some(url) => {
            tracing::info!(%url, "using content delivery API");
            Arc::new(HttpContentProvider::new(
                url,
                &config.content_api_key,
                &config.content_project_id,
            )) as ContentState
        }
        None => {
            tracing::info!(fixtures = %config.content_fixtures, "using local content fixtures");
            let provider = InMemoryContentProvider::from_fixture_file(&config.content_fixtures)
                .await
                .expect("FATAL: failed to load content fixtures. Check CONTENT_FIXTURES.");
            Arc::new(provider) as ContentState
        }
    };

    // 5. Session Oracle
    let sessions = Arc::new(JwtSessionOracle::from_config(&config)) as SessionState;

    // 6. Router and server startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        content,
        sessions,
        config,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await.expect("server error");
}
