//! API layer
//!
//! Protected JSON endpoints. Every route in this router sits behind the
//! `require_auth` gate; anonymous callers are rejected before any
//! handler runs.

mod dashboard;
mod dto;
mod profile;
mod users;

pub use dto::{UserResponse, UserSummary};

use axum::{
    Router, middleware,
    routing::get,
};

use crate::AppState;
use crate::auth::require_auth;

/// Create the protected API router
///
/// Routes:
/// - GET /profile - Caller's profile
/// - PUT /profile - Update display name
/// - GET /dashboard - Demo dashboard data
/// - GET /users - User store summary
pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/users", get(users::list_users))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
