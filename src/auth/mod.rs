//! Google OAuth authentication
//!
//! Handles:
//! - Google OAuth flow
//! - Session management
//! - Authentication middleware
//! - Login rate limiting

pub mod identity;
mod middleware;
mod oauth;
pub mod rate_limit;
pub mod session;

pub use identity::{IdentityVerifier, VerifiedIdentity};
pub use middleware::{
    AuthSession, CurrentUser, client_addr, rate_limit_login, reject_authenticated, require_auth,
    session_from_headers, session_token_from_headers,
};
pub use oauth::auth_router;
pub use rate_limit::RateLimiter;
pub use session::{SESSION_COOKIE, SessionStore, sign_session_token, verify_session_cookie};
