//! Authentication middleware
//!
//! Request-level predicates around the session store: require a valid
//! session, reject already-authenticated callers, and throttle login
//! attempts per source address.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use std::net::SocketAddr;

use super::session::{SESSION_COOKIE, verify_session_cookie};
use crate::AppState;
use crate::data::UserRecord;
use crate::error::AppError;

/// Resolved session attached to request extensions by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Server-side session token (cookie value minus the signature)
    pub token: String,
    /// User id the session is bound to
    pub user_id: String,
}

/// Recover the session token from the request cookies
///
/// Only signature-valid cookie values are considered; a tampered cookie
/// reads as no cookie at all.
pub fn session_token_from_headers(headers: &HeaderMap, secret: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE)?;
    verify_session_cookie(cookie.value(), secret)
}

/// Resolve the caller's session, if any
pub async fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Option<AuthSession> {
    let token = session_token_from_headers(headers, &state.config.auth.session_secret)?;
    let user_id = state.sessions.resolve(&token).await?;
    Some(AuthSession { token, user_id })
}

/// Middleware to require authentication
///
/// Resolves the session cookie; an anonymous caller gets 401 before the
/// handler runs. On success the resolved session is added to request
/// extensions for the `CurrentUser` extractor.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/profile", ...)
///     .layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = session_from_headers(&state, request.headers())
        .await
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Middleware to reject already-authenticated callers
///
/// The login-initiation route must not be re-entered by a caller who
/// already holds a valid session.
pub async fn reject_authenticated(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if session_from_headers(&state, request.headers()).await.is_some() {
        return Err(AppError::AlreadyAuthenticated);
    }

    Ok(next.run(request).await)
}

/// Middleware to throttle login attempts per source address
pub async fn rate_limit_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_addr(request.headers(), peer);

    if let Err(error) = state.rate_limiter.check_and_increment(&key).await {
        use crate::metrics::AUTH_ATTEMPTS_TOTAL;
        AUTH_ATTEMPTS_TOTAL.with_label_values(&["throttled"]).inc();
        tracing::warn!(source = %key, "Login attempt rate limited");
        return Err(error);
    }

    Ok(next.run(request).await)
}

/// Caller source address used as the rate-limit key
///
/// First X-Forwarded-For hop when present, else the socket peer
/// address. Shared NATs and proxies collapse onto one key; that is a
/// known limitation of address-based throttling.
pub fn client_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extractor for current authenticated user
///
/// Use in handlers behind `require_auth` to get the caller's record.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(user): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", user.display_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Extract current user from request
    ///
    /// A valid session whose user record is missing is a consistency
    /// fault: the session invariant says it cannot happen, so it
    /// surfaces as an internal error rather than 404.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let session = match parts.extensions.get::<AuthSession>().cloned() {
            Some(session) => session,
            None => session_from_headers(&app_state, &parts.headers)
                .await
                .ok_or(AppError::Unauthorized)?,
        };

        let user = app_state
            .users
            .get_by_id(&session.user_id)
            .await
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "session resolved to unknown user id {}",
                    session.user_id
                ))
            })?;

        parts.extensions.insert(session);

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_addr_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 70.41.3.18"),
        );

        assert_eq!(client_addr(&headers, None), "203.0.113.9");
    }

    #[test]
    fn client_addr_falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer = SocketAddr::from(([127, 0, 0, 1], 45678));

        assert_eq!(client_addr(&headers, Some(peer)), "127.0.0.1");
    }

    #[test]
    fn client_addr_without_any_source_is_unknown() {
        let headers = HeaderMap::new();

        assert_eq!(client_addr(&headers, None), "unknown");
    }
}
