//! Authenticated chat-user sessions.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::types::ChatUserId;
use crate::utils::mask_secret;

/// Opaque backend credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw key for use in the outbound credential header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", mask_secret(&self.0))
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_secret(&self.0))
    }
}

/// Proof that a chat identity holds a credential the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Chat-platform identity owning the session.
    pub user_id: ChatUserId,
    /// Credential sent with every backend call made on behalf of the user.
    pub credential: ApiKey,
    /// Set once the authenticating balance call succeeded.
    pub authenticated: bool,
    /// Timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent successful lookup.
    pub last_activity_at: DateTime<Utc>,
    /// Always `last_activity_at + timeout`.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: ChatUserId, credential: ApiKey, now: DateTime<Utc>, timeout: Duration) -> Self {
        Self {
            user_id,
            credential,
            authenticated: true,
            created_at: now,
            last_activity_at: now,
            expires_at: now + timeout,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Slides the expiry window forward to `now + timeout`.
    pub fn touch(&mut self, now: DateTime<Utc>, timeout: Duration) {
        self.last_activity_at = now;
        self.expires_at = now + timeout;
    }
}
