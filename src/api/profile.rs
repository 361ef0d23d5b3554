//! Profile endpoints

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use super::dto::{UserResponse, UserSummary};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// GET /api/profile response
#[derive(Debug, Serialize)]
struct ProfileResponse {
    profile: UserResponse,
    message: String,
}

/// GET /api/profile
///
/// Returns the authenticated caller's profile.
pub async fn get_profile(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ProfileResponse {
        profile: UserResponse::from(&user),
        message: "Profile retrieved successfully".to_string(),
    })
}

/// PUT /api/profile request body
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

/// PUT /api/profile response
#[derive(Debug, Serialize)]
struct UpdateProfileResponse {
    message: String,
    user: UserSummary,
}

/// PUT /api/profile
///
/// Updates the caller's display name. An empty or whitespace-only name
/// is rejected and the stored record stays unchanged.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = body
        .name
        .as_deref()
        .ok_or_else(|| AppError::Validation("Name is required".to_string()))?;

    let updated = state.users.update_display_name(&user.id, name).await?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserSummary::from(&updated),
    }))
}
