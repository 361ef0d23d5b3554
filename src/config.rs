//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3001)
    pub port: u16,
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,
}

/// Deployment environment selector
///
/// Drives the `Secure` cookie attribute and how much detail 500
/// responses expose.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Client (frontend) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Origin allowed for CORS and used for post-login redirects
    /// (e.g., "http://localhost:5173")
    pub origin: String,
}

/// Authentication configuration (Google OAuth + sessions)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session cookie signing secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 86400 = 24h)
    pub session_max_age: i64,
    pub google: GoogleOAuthConfig,
}

/// Google OAuth configuration
///
/// The endpoint URLs default to Google's and exist as configuration so
/// tests can point the flow at a mock provider.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the provider
    /// (e.g., "http://localhost:3001/auth/google/callback")
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Login rate limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum login attempts per window (default: 5)
    pub max_attempts: u32,
    /// Window duration in seconds (default: 900 = 15 minutes)
    pub window_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTHGATE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment as EnvSource, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001)?
            .set_default("server.environment", "development")?
            .set_default("client.origin", "http://localhost:5173")?
            .set_default("auth.session_max_age", 86400)?
            .set_default(
                "auth.google.auth_url",
                "https://accounts.google.com/o/oauth2/v2/auth",
            )?
            .set_default("auth.google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default(
                "auth.google.userinfo_url",
                "https://openidconnect.googleapis.com/v1/userinfo",
            )?
            .set_default("rate_limit.max_attempts", 5)?
            .set_default("rate_limit.window_seconds", 900)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (AUTHGATE_*)
            .add_source(
                EnvSource::with_prefix("AUTHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Whether session cookies must carry the `Secure` attribute
    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.environment.is_production()
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.google.client_id.trim().is_empty()
            || self.auth.google.client_secret.trim().is_empty()
        {
            return Err(crate::error::AppError::Config(
                "auth.google.client_id and auth.google.client_secret must be set".to_string(),
            ));
        }

        for (key, value) in [
            ("auth.google.redirect_url", &self.auth.google.redirect_url),
            ("auth.google.auth_url", &self.auth.google.auth_url),
            ("auth.google.token_url", &self.auth.google.token_url),
            ("auth.google.userinfo_url", &self.auth.google.userinfo_url),
            ("client.origin", &self.client.origin),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(crate::error::AppError::Config(format!(
                    "{} must be a valid URL",
                    key
                )));
            }
        }

        if self.rate_limit.max_attempts == 0 {
            return Err(crate::error::AppError::Config(
                "rate_limit.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.window_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "rate_limit.window_seconds must be greater than 0".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                environment = %self.server.environment.as_str(),
                "Using insecure session cookies for local development"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                environment: Environment::Development,
            },
            client: ClientConfig {
                origin: "http://localhost:5173".to_string(),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 86_400,
                google: GoogleOAuthConfig {
                    client_id: "google-client-id".to_string(),
                    client_secret: "google-client-secret".to_string(),
                    redirect_url: "http://localhost:3001/auth/google/callback".to_string(),
                    auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                    token_url: "https://oauth2.googleapis.com/token".to_string(),
                    userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
                },
            },
            rate_limit: RateLimitConfig {
                max_attempts: 5,
                window_seconds: 900,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_development_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_zero_rate_limit_window() {
        let mut config = valid_config();
        config.rate_limit.window_seconds = 0;

        let error = config
            .validate()
            .expect_err("zero-length windows must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("rate_limit.window_seconds")
        ));
    }

    #[test]
    fn validate_rejects_malformed_redirect_url() {
        let mut config = valid_config();
        config.auth.google.redirect_url = "not a url".to_string();

        let error = config.validate().expect_err("malformed URLs must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.google.redirect_url")
        ));
    }

    #[test]
    fn production_requires_secure_cookies() {
        let mut config = valid_config();
        config.server.environment = Environment::Production;
        assert!(config.should_use_secure_cookies());
    }
}
