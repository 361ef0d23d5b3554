//! In-memory user store
//!
//! Maps provider identities to local user records. Volatile by design:
//! records live for the lifetime of the process.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::auth::identity::VerifiedIdentity;
use crate::error::AppError;

/// Local user record
///
/// One record per external identity. Profile fields are denormalized
/// from the provider and refreshed on every login.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Opaque external identity (Google profile id), primary key
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: String,
    /// Set once on first login, immutable afterwards
    pub created_at: DateTime<Utc>,
    /// Updated on every successful login
    pub last_login_at: DateTime<Utc>,
    /// Most recent provider access token, overwritten each login.
    /// Never validated, refreshed, or expired here; never serialized
    /// into API responses.
    pub provider_access_token: String,
}

/// In-memory user store
///
/// All mutations go through a single write lock, so there is at most
/// one record per identity even under concurrent logins.
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Create or refresh the record for a verified identity
    ///
    /// First login creates the record with `created_at = now`; later
    /// logins refresh the profile fields, the access token, and
    /// `last_login_at`. Returns the resulting record.
    pub async fn upsert(&self, identity: &VerifiedIdentity) -> UserRecord {
        let now = Utc::now();
        let mut users = self.users.write().await;

        let record = match users.get_mut(&identity.id) {
            Some(user) => {
                user.display_name = identity.display_name.clone();
                user.email = identity.email.clone().unwrap_or_default();
                user.avatar_url = identity.avatar_url.clone().unwrap_or_default();
                user.last_login_at = now;
                user.provider_access_token = identity.access_token.clone();
                tracing::info!(user_id = %user.id, email = %user.email, "Existing user logged in");
                user.clone()
            }
            None => {
                let user = UserRecord {
                    id: identity.id.clone(),
                    display_name: identity.display_name.clone(),
                    email: identity.email.clone().unwrap_or_default(),
                    avatar_url: identity.avatar_url.clone().unwrap_or_default(),
                    created_at: now,
                    last_login_at: now,
                    provider_access_token: identity.access_token.clone(),
                };
                users.insert(user.id.clone(), user.clone());
                tracing::info!(user_id = %user.id, email = %user.email, "New user created");
                user
            }
        };

        use crate::metrics::USERS_TOTAL;
        USERS_TOTAL.set(users.len() as i64);

        record
    }

    /// Get a user by external identity id
    pub async fn get_by_id(&self, id: &str) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.get(id).cloned()
    }

    /// Update a user's display name
    ///
    /// The name is trimmed; an empty result is a validation error and
    /// leaves the record unchanged.
    pub async fn update_display_name(
        &self,
        id: &str,
        new_name: &str,
    ) -> Result<UserRecord, AppError> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }

        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(AppError::NotFound)?;
        user.display_name = trimmed.to_string();
        tracing::info!(user_id = %user.id, email = %user.email, "Profile updated");

        Ok(user.clone())
    }

    /// Number of stored records
    pub async fn count(&self) -> usize {
        let users = self.users.read().await;
        users.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
