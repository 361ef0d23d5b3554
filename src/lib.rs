//! Authgate - a minimal OAuth2 login backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                       │
//! │  - Auth endpoints (OAuth flow, session introspection)       │
//! │  - Protected JSON endpoints (profile, dashboard, users)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Auth Layer                             │
//! │  - Identity verification (code exchange, profile fetch)     │
//! │  - Session store, auth gate, login rate limiting            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                             │
//! │  - In-memory user store                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: protected JSON endpoints
//! - `auth`: OAuth flow, sessions, middleware, rate limiting
//! - `data`: in-memory user store
//! - `config`: configuration management
//! - `error`: error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains the injected
/// stores. All state is constructed at process start; nothing ambient.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// User store (volatile, lost on restart)
    pub users: Arc<data::UserStore>,

    /// Session store (volatile, lost on restart)
    pub sessions: Arc<auth::SessionStore>,

    /// Login rate limiter
    pub rate_limiter: Arc<auth::RateLimiter>,

    /// OAuth identity verifier
    pub verifier: Arc<auth::IdentityVerifier>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Configure error verbosity for the environment
    /// 2. Build the identity verifier from the provider config
    /// 3. Construct the in-memory stores
    ///
    /// # Errors
    /// Returns error if the provider configuration is invalid
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        error::set_detailed_errors(!config.server.environment.is_production());

        let verifier = auth::IdentityVerifier::new(&config.auth.google)?;
        let users = data::UserStore::new();
        let sessions = auth::SessionStore::new(config.auth.session_max_age);
        let rate_limiter = auth::RateLimiter::new(
            config.rate_limit.max_attempts,
            std::time::Duration::from_secs(config.rate_limit.window_seconds),
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            users: Arc::new(users),
            sessions: Arc::new(sessions),
            rate_limiter: Arc::new(rate_limiter),
            verifier: Arc::new(verifier),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.client);

    Router::new()
        .route("/", axum::routing::get(index))
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(state.clone()))
        .nest("/api", api::api_router(state.clone()))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(metrics::metrics_router())
}

/// Record a request counter per method, path, and status
async fn track_requests(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();

    response
}

fn build_cors_layer(client: &config::ClientConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    match HeaderValue::from_str(&client.origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %client.origin,
                "Failed to parse CORS origin from client config; denying cross-origin requests"
            );
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        }
    }
}

/// GET /
///
/// API index document.
async fn index() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "message": "Authgate OAuth API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": {
                "/auth/google": "Initiate Google OAuth",
                "/auth/google/callback": "Google OAuth callback",
                "/auth/logout": "Logout user",
                "/auth/user": "Get current user info",
                "/auth/status": "Session diagnostics",
            },
            "api": {
                "/api/profile": "Get user profile (protected)",
                "/api/dashboard": "Get dashboard data (protected)",
                "/api/users": "User store summary (protected)",
            },
            "system": {
                "/health": "System health check",
                "/metrics": "Prometheus metrics",
                "/": "API documentation",
            },
        },
    }))
}

/// GET /health
async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now(),
        "environment": state.config.server.environment.as_str(),
    }))
}

/// Fallback for unmatched routes
async fn not_found(uri: axum::http::Uri) -> impl axum::response::IntoResponse {
    (
        axum::http::StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({
            "error": "Not Found",
            "message": format!("Route {} not found", uri),
        })),
    )
}
