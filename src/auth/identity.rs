//! Identity verification against the OAuth provider
//!
//! Wraps the authorization-code exchange and the userinfo fetch. Every
//! failure path collapses into `AuthenticationFailed`; a partial or
//! unverified identity is never produced.

use std::time::Duration;

use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;

use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

/// OAuth client with authorization and token endpoints configured
type ConfiguredBasicClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Upper bound on any single provider round trip.
/// A timeout surfaces as `AuthenticationFailed`, never a hang.
const EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Identity asserted by the provider after a successful exchange
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Stable per-account provider id
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    /// Provider access token from this exchange
    pub access_token: String,
}

/// Userinfo endpoint response (OpenID Connect shape)
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

/// Performs the OAuth2 authorization-code exchange and profile fetch
pub struct IdentityVerifier {
    oauth_client: ConfiguredBasicClient,
    http_client: reqwest::Client,
    userinfo_url: String,
}

impl IdentityVerifier {
    /// Build a verifier from the provider configuration
    ///
    /// # Errors
    /// Returns `Config` if any endpoint URL is malformed.
    pub fn new(google: &GoogleOAuthConfig) -> Result<Self, AppError> {
        let auth_url = AuthUrl::new(google.auth_url.clone())
            .map_err(|e| AppError::Config(format!("auth.google.auth_url: {}", e)))?;
        let token_url = TokenUrl::new(google.token_url.clone())
            .map_err(|e| AppError::Config(format!("auth.google.token_url: {}", e)))?;
        let redirect_url = RedirectUrl::new(google.redirect_url.clone())
            .map_err(|e| AppError::Config(format!("auth.google.redirect_url: {}", e)))?;

        let oauth_client = BasicClient::new(ClientId::new(google.client_id.clone()))
            .set_client_secret(ClientSecret::new(google.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        // Redirects stay disabled on the token-exchange client.
        let http_client = reqwest::Client::builder()
            .user_agent("Authgate/0.1.0")
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(EXCHANGE_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            oauth_client,
            http_client,
            userinfo_url: google.userinfo_url.clone(),
        })
    }

    /// Build the provider authorization URL with a fresh CSRF state token
    ///
    /// Requested scopes: `profile`, `email`.
    pub fn authorize_url(&self) -> (url::Url, CsrfToken) {
        self.oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url()
    }

    /// Exchange an authorization code for a verified identity
    ///
    /// # Steps
    /// 1. Exchange the code for an access token
    /// 2. Fetch the profile from the userinfo endpoint
    ///
    /// # Errors
    /// Any provider error, network failure, or timeout becomes
    /// `AuthenticationFailed`.
    pub async fn exchange_code_for_profile(
        &self,
        code: &str,
    ) -> Result<VerifiedIdentity, AppError> {
        let token = self
            .oauth_client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::AuthenticationFailed(format!("code exchange failed: {}", e)))?;

        let access_token = token.access_token().secret().clone();

        let response = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| AppError::AuthenticationFailed(format!("profile fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::AuthenticationFailed(format!(
                "profile fetch returned {}",
                response.status()
            )));
        }

        let profile: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::AuthenticationFailed(format!("malformed profile: {}", e)))?;

        Ok(identity_from_profile(profile, access_token))
    }
}

fn identity_from_profile(profile: UserInfoResponse, access_token: String) -> VerifiedIdentity {
    let display_name = profile
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| profile.sub.clone());

    VerifiedIdentity {
        id: profile.sub,
        display_name,
        email: profile.email,
        avatar_url: profile.picture,
        access_token,
    }
}
