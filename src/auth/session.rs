//! Session management
//!
//! Server-side sessions: an unguessable token maps to a user id with a
//! fixed TTL. The cookie carries the token signed with the session
//! secret, so a tampered cookie never reaches the store.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::error::AppError;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";

const TOKEN_BYTES: usize = 32;

/// Server-side session entry
#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// In-memory session store
///
/// A session moves from Authenticated to LoggedOut (destroy) or Expired
/// (TTL); both read as anonymous afterwards, with no resurrection.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    /// Fixed TTL applied to every session
    max_age: Duration,
}

impl SessionStore {
    /// Create a store with the given session TTL in seconds
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age: Duration::seconds(max_age_seconds),
        }
    }

    /// Bind a fresh unguessable token to a user id
    pub async fn create(&self, user_id: &str) -> String {
        use base64::{Engine as _, engine::general_purpose};
        use rand::RngCore;

        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let entry = SessionEntry {
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + self.max_age,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), entry);

        use crate::metrics::SESSIONS_ACTIVE;
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        token
    }

    /// Resolve a token to its user id
    ///
    /// Unknown and expired tokens read as anonymous (`None`), never as a
    /// hard error. Expired entries are dropped on the way out.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(entry) if !entry.is_expired() => return Some(entry.user_id.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired entry: re-check under the write lock before removing.
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(token) {
            if !entry.is_expired() {
                return Some(entry.user_id.clone());
            }
            sessions.remove(token);
            use crate::metrics::SESSIONS_ACTIVE;
            SESSIONS_ACTIVE.set(sessions.len() as i64);
        }
        None
    }

    /// Remove a session binding
    ///
    /// Idempotent: succeeds whether or not the token was valid.
    pub async fn destroy(&self, token: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(token);

        use crate::metrics::SESSIONS_ACTIVE;
        SESSIONS_ACTIVE.set(sessions.len() as i64);
    }

    /// Drop all expired entries
    pub async fn prune_expired(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired());
        let removed = before - sessions.len();

        use crate::metrics::SESSIONS_ACTIVE;
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        if removed > 0 {
            tracing::debug!("Pruned {} expired sessions", removed);
        }
    }

    /// Number of stored sessions, expired entries included
    pub async fn count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}

/// Sign a session token for cookie transport
///
/// Cookie format: `{token}.{base64(hmac_sha256(token))}`
pub fn sign_session_token(token: &str, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(token.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", token, signature_b64))
}

/// Verify a signed cookie value and recover the session token
///
/// Malformed values and bad signatures read as anonymous (`None`).
pub fn verify_session_cookie(value: &str, secret: &str) -> Option<String> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (token, signature_b64) = value.split_once('.')?;
    if token.is_empty() {
        return None;
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(token.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
    mac.verify_slice(&expected_signature).ok()?;

    Some(token.to_string())
}
