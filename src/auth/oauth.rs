//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Google and the
//! session endpoints that hang off it.

use axum::{
    Router,
    extract::{Query, State},
    middleware,
    response::{IntoResponse, Json, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::middleware::{
    rate_limit_login, reject_authenticated, session_from_headers, session_token_from_headers,
};
use super::session::{SESSION_COOKIE, sign_session_token};
use crate::AppState;
use crate::api::UserResponse;
use crate::error::AppError;
use crate::metrics::AUTH_ATTEMPTS_TOTAL;

/// CSRF state cookie set before redirecting to the provider
const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// How long the CSRF state cookie lives; the round trip through the
/// provider should take seconds, not minutes.
const OAUTH_STATE_MAX_AGE_SECS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google (rate limited, anonymous only)
/// - GET /auth/google/callback - OAuth callback
/// - POST /auth/logout - Logout
/// - GET /auth/user - Current user info
/// - GET /auth/status - Session diagnostics
pub fn auth_router(state: AppState) -> Router<AppState> {
    let login_routes = Router::new()
        .route("/auth/google", get(google_redirect))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            reject_authenticated,
        ))
        .route_layer(middleware::from_fn_with_state(state, rate_limit_login));

    Router::new()
        .merge(login_routes)
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/logout", post(logout))
        .route("/auth/user", get(auth_user))
        .route("/auth/status", get(auth_status))
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /auth/google
///
/// Redirects user to the Google authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to Google with client_id, redirect_uri, scope, state
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (authorize_url, csrf_state) = state.verifier.authorize_url();

    AUTH_ATTEMPTS_TOTAL.with_label_values(&["initiated"]).inc();

    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state.secret().clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(OAUTH_STATE_MAX_AGE_SECS))
        .build();

    Ok((jar.add(state_cookie), Redirect::to(authorize_url.as_str())))
}

/// Query parameters from the Google callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Provider-reported error (e.g. access_denied)
    error: Option<String>,
}

/// GET /auth/google/callback
///
/// Handles the OAuth callback from Google.
///
/// # Steps
/// 1. Verify CSRF state against the state cookie
/// 2. Exchange code for a verified identity
/// 3. Upsert the user record
/// 4. Create a session and set the signed cookie
/// 5. Redirect to the client with an auth=success marker
///
/// Every authentication failure redirects to the client login page; no
/// session is issued on any failure path.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = remove_cookie(jar, OAUTH_STATE_COOKIE);

    if let Some(provider_error) = &query.error {
        tracing::warn!(error = %provider_error, "Provider reported authorization error");
        return Ok(failure_redirect(&state, jar));
    }

    let state_matches = matches!(
        (&expected_state, &query.state),
        (Some(expected), Some(provided)) if expected == provided
    );
    if !state_matches {
        tracing::warn!("OAuth state mismatch or missing state cookie");
        return Ok(failure_redirect(&state, jar));
    }

    let Some(code) = query.code.as_deref() else {
        tracing::warn!("OAuth callback without authorization code");
        return Ok(failure_redirect(&state, jar));
    };

    let identity = match state.verifier.exchange_code_for_profile(code).await {
        Ok(identity) => identity,
        Err(error) => {
            tracing::warn!(error = %error, "OAuth code exchange failed");
            return Ok(failure_redirect(&state, jar));
        }
    };

    let user = state.users.upsert(&identity).await;
    let token = state.sessions.create(&user.id).await;
    let signed = sign_session_token(&token, &state.config.auth.session_secret)?;

    let session_cookie = Cookie::build((SESSION_COOKIE, signed))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(state.config.auth.session_max_age))
        .build();

    AUTH_ATTEMPTS_TOTAL.with_label_values(&["succeeded"]).inc();
    tracing::info!(user_id = %user.id, email = %user.email, "OAuth callback successful");

    let target = format!("{}?auth=success", state.config.client.origin);
    Ok((jar.add(session_cookie), Redirect::to(&target)))
}

fn failure_redirect(state: &AppState, jar: CookieJar) -> (CookieJar, Redirect) {
    AUTH_ATTEMPTS_TOTAL.with_label_values(&["failed"]).inc();
    let target = format!("{}/login?error=auth_failed", state.config.client.origin);
    (jar, Redirect::to(&target))
}

fn remove_cookie(jar: CookieJar, name: &'static str) -> CookieJar {
    let mut cookie = Cookie::from(name);
    cookie.set_path("/");
    jar.remove(cookie)
}

// =============================================================================
// Logout
// =============================================================================

/// POST /auth/logout
///
/// Destroys the caller's session and clears the cookie. Succeeds with a
/// confirmation payload whether or not the session was valid.
async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(token) = session_token_from_headers(&headers, &state.config.auth.session_secret) {
        if let Some(user_id) = state.sessions.resolve(&token).await {
            let email = state
                .users
                .get_by_id(&user_id)
                .await
                .map(|user| user.email)
                .unwrap_or_default();
            tracing::info!(user_id = %user_id, email = %email, "User logged out");
        }
        state.sessions.destroy(&token).await;
    }

    let jar = remove_cookie(jar, SESSION_COOKIE);
    (jar, Json(serde_json::json!({ "message": "Logged out successfully" })))
}

// =============================================================================
// Session introspection
// =============================================================================

/// Response for GET /auth/user
#[derive(Debug, Serialize)]
struct AuthUserResponse {
    authenticated: bool,
    user: Option<UserResponse>,
}

/// GET /auth/user
///
/// Reflects the current session state. Never errors: a session that
/// fails to resolve, or whose user record is gone, reads as anonymous.
async fn auth_user(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Json<AuthUserResponse> {
    let user = match session_from_headers(&state, &headers).await {
        Some(session) => state.users.get_by_id(&session.user_id).await,
        None => None,
    };

    Json(AuthUserResponse {
        authenticated: user.is_some(),
        user: user.as_ref().map(UserResponse::from),
    })
}

/// Response for GET /auth/status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthStatusResponse {
    authenticated: bool,
    session_id: Option<String>,
    timestamp: chrono::DateTime<Utc>,
}

/// GET /auth/status
///
/// Session diagnostics. The session id is the cookie token when its
/// signature verifies; a forged cookie yields null rather than echoing
/// attacker input.
async fn auth_status(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Json<AuthStatusResponse> {
    let session_id = session_token_from_headers(&headers, &state.config.auth.session_secret);
    let authenticated = match &session_id {
        Some(token) => state.sessions.resolve(token).await.is_some(),
        None => false,
    };

    Json(AuthStatusResponse {
        authenticated,
        session_id,
        timestamp: Utc::now(),
    })
}
