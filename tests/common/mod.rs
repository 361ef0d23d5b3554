//! Common test utilities for E2E tests

use std::net::SocketAddr;

use authgate::{AppState, config};
use httpmock::MockServer;
use tokio::net::TcpListener;

/// Test server instance
///
/// Runs the real router on a random port, with the OAuth provider
/// replaced by a local mock server.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance with default configuration
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, adjusting the configuration first
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        // Mock OAuth provider (token + userinfo endpoints)
        let provider = MockServer::start_async().await;

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                environment: config::Environment::Development,
            },
            client: config::ClientConfig {
                origin: "http://localhost:5173".to_string(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 86400,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    redirect_url: "http://localhost:3001/auth/google/callback".to_string(),
                    auth_url: provider.url("/authorize"),
                    token_url: provider.url("/token"),
                    userinfo_url: provider.url("/userinfo"),
                },
            },
            rate_limit: config::RateLimitConfig {
                max_attempts: 5,
                window_seconds: 900,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        adjust(&mut config);

        // Initialize app state
        let state = AppState::new(config).expect("app state initializes");

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = authgate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            provider,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register provider mocks for a successful exchange
    ///
    /// The token endpoint returns `access_token` and the userinfo
    /// endpoint returns `profile` for that token.
    pub async fn mock_successful_exchange(&self, access_token: &str, profile: serde_json::Value) {
        use httpmock::Method::{GET, POST};

        let token = access_token.to_string();
        self.provider
            .mock_async(move |when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(serde_json::json!({
                    "access_token": token,
                    "token_type": "Bearer",
                    "expires_in": 3600,
                    "scope": "profile email",
                }));
            })
            .await;

        let bearer = format!("Bearer {}", access_token);
        self.provider
            .mock_async(move |when, then| {
                when.method(GET)
                    .path("/userinfo")
                    .header("authorization", bearer.as_str());
                then.status(200).json_body(profile);
            })
            .await;
    }

    /// Drive the full login flow and return the session cookie value
    ///
    /// Assumes `mock_successful_exchange` has been called. Panics on any
    /// unexpected response, so failures point at the broken step.
    pub async fn login(&self) -> String {
        let client = no_redirect_client();

        // Step 1: initiate the flow, capturing state cookie and param
        let response = client
            .get(self.url("/auth/google"))
            .send()
            .await
            .expect("login initiation succeeds");
        assert!(response.status().is_redirection());

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        let authorize_url = url::Url::parse(location).expect("authorize URL parses");
        let state_param = authorize_url
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state param present");
        let state_cookie = set_cookie_value(&response, "oauth_state").expect("state cookie set");

        // Step 2: complete the callback with the provider-issued code
        let response = client
            .get(self.url(&format!(
                "/auth/google/callback?code=test-code&state={}",
                state_param
            )))
            .header("cookie", format!("oauth_state={}", state_cookie))
            .send()
            .await
            .expect("callback succeeds");
        assert!(response.status().is_redirection());

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("location header");
        assert!(
            location.ends_with("?auth=success"),
            "expected success redirect, got: {location}"
        );

        set_cookie_value(&response, "session").expect("session cookie set")
    }
}

/// HTTP client that surfaces redirects instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Extract a cookie value from Set-Cookie response headers
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| {
            let rest = header.strip_prefix(&prefix)?;
            let value = rest.split(';').next().unwrap_or(rest);
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        })
}

/// Default provider profile used across tests
pub fn test_profile() -> serde_json::Value {
    serde_json::json!({
        "sub": "g-123",
        "name": "Test User",
        "email": "testuser@example.com",
        "picture": "https://example.com/avatar.png",
    })
}
