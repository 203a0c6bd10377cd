//! Short-lived registry of issued confirmation prompts.
//!
//! The proposal itself still travels inside the confirm button; this cache
//! only records which idempotency keys are outstanding and who owns them, so
//! a second click on the same prompt cannot execute the transfer twice.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{ChatUserId, IdempotencyKey};
use crate::utils::time::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEntry {
    owner: ChatUserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// First claim of a live key; the caller may execute the transfer.
    Claimed,
    /// Never issued, already claimed, cancelled, or swept.
    Unknown,
    Expired,
    /// Issued to a different chat user.
    NotOwner,
}

pub struct PendingTransfers {
    entries: Mutex<HashMap<IdempotencyKey, PendingEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PendingTransfers {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IdempotencyKey, PendingEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issues a fresh key owned by `owner`.
    pub fn issue(&self, owner: &ChatUserId) -> IdempotencyKey {
        let key = IdempotencyKey::new();
        let expires_at = self.clock.now() + self.ttl;
        self.lock().insert(
            key,
            PendingEntry {
                owner: owner.clone(),
                expires_at,
            },
        );
        key
    }

    /// Atomically consumes `key` for `user`. Only one caller ever sees `Claimed`.
    pub fn claim(&self, key: IdempotencyKey, user: &ChatUserId) -> ClaimOutcome {
        let now = self.clock.now();
        let mut entries = self.lock();
        let Some(entry) = entries.get(&key) else {
            return ClaimOutcome::Unknown;
        };
        if entry.owner != *user {
            return ClaimOutcome::NotOwner;
        }
        let expired = entry.expires_at <= now;
        entries.remove(&key);
        if expired {
            ClaimOutcome::Expired
        } else {
            ClaimOutcome::Claimed
        }
    }

    /// Drops a key the owner cancelled. Returns whether it was outstanding.
    pub fn release(&self, key: IdempotencyKey, user: &ChatUserId) -> bool {
        let mut entries = self.lock();
        let owned = matches!(entries.get(&key), Some(entry) if entry.owner == *user);
        owned && entries.remove(&key).is_some()
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(entries.len())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
