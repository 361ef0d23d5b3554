//! User listing endpoint

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use crate::AppState;
use crate::auth::CurrentUser;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsersResponse {
    message: String,
    note: String,
    user_count: usize,
    current_user: String,
}

/// GET /api/users
///
/// Protected demo endpoint reporting the size of the user store.
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    Json(UsersResponse {
        message: "This is a protected route - you are authenticated!".to_string(),
        note: "In production, this would require admin permissions".to_string(),
        user_count: state.users.count().await,
        current_user: user.email,
    })
}
