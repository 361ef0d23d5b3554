//! API response DTOs
//!
//! Wire shapes use camelCase to match the client contract.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::UserRecord;

/// User info returned to clients
///
/// The provider access token is deliberately absent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name.clone(),
            email: user.email.clone(),
            photo: user.avatar_url.clone(),
            created_at: user.created_at,
            last_login: user.last_login_at,
        }
    }
}

/// Abbreviated user info (profile updates, dashboard header)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo: String,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name.clone(),
            email: user.email.clone(),
            photo: user.avatar_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_never_carries_the_access_token() {
        let user = UserRecord {
            id: "g-123".to_string(),
            display_name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            avatar_url: "https://example.com/avatar.png".to_string(),
            created_at: Utc::now(),
            last_login_at: Utc::now(),
            provider_access_token: "super-secret-token".to_string(),
        };

        let serialized =
            serde_json::to_string(&UserResponse::from(&user)).expect("serialization succeeds");
        assert!(!serialized.contains("super-secret-token"));
        assert!(serialized.contains("\"createdAt\""));
        assert!(serialized.contains("\"lastLogin\""));
    }
}
