//! Authgate binary entry point

use std::net::SocketAddr;

use authgate::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start HTTP server
/// 6. Start background maintenance task
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("AUTHGATE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "authgate=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "authgate=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Authgate...");

    // 2. Initialize metrics
    authgate::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        environment = %config.server.environment.as_str(),
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone())?;

    // 5. Build Axum router
    let app = authgate::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Google OAuth: http://{}/auth/google", addr);

    // 7. Start background maintenance task
    spawn_maintenance_task(state.clone());

    // Start server
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Spawn background maintenance task
///
/// Prunes expired sessions and stale rate-limit windows so the
/// in-memory tables stay bounded on long-running processes.
fn spawn_maintenance_task(state: AppState) {
    const MAINTENANCE_INTERVAL_SECS: u64 = 3600;

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(MAINTENANCE_INTERVAL_SECS));

        // Consume the immediate first tick so the first pass runs after
        // one full interval.
        interval.tick().await;

        loop {
            interval.tick().await;

            tracing::debug!("Running session and rate-limit maintenance...");
            state.sessions.prune_expired().await;
            state.rate_limiter.prune_old().await;
        }
    });

    tracing::info!("Maintenance task spawned");
}
