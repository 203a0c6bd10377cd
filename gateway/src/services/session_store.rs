//! Keyed, time-bounded storage of chat sessions with sliding expiry.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::models::session::{ApiKey, Session};
use crate::services::pending_transfers::PendingTransfers;
use crate::types::ChatUserId;
use crate::utils::time::Clock;

/// The only mutation surface for sessions. Callers never hold a session
/// across calls; every access re-fetches by user id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts or overwrites the session for `user_id`.
    async fn create(&self, user_id: &ChatUserId, credential: ApiKey) -> Session;

    /// Returns the live session and slides its expiry forward. Stale entries
    /// are removed and reported as absent.
    async fn get(&self, user_id: &ChatUserId) -> Option<Session>;

    /// Explicit logout. Returns whether a session existed.
    async fn remove(&self, user_id: &ChatUserId) -> bool;

    /// Drops every entry with `expires_at <= now`, returning how many were dropped.
    async fn sweep(&self, now: DateTime<Utc>) -> usize;

    /// Number of stored entries, expired ones included until swept.
    async fn len(&self) -> usize;
}

pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<ChatUserId, Session>>,
    timeout: Duration,
    max_sessions: usize,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(timeout: Duration, max_sessions: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
            max_sessions: max_sessions.max(1),
            clock,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChatUserId, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Makes room for one new user once the cap is reached: expired entries
    /// go first, then the least recently active session.
    fn make_room(
        sessions: &mut HashMap<ChatUserId, Session>,
        max_sessions: usize,
        now: DateTime<Utc>,
    ) -> Option<ChatUserId> {
        if sessions.len() < max_sessions {
            return None;
        }
        sessions.retain(|_, session| !session.is_expired_at(now));
        if sessions.len() < max_sessions {
            return None;
        }
        let victim = sessions
            .values()
            .min_by_key(|session| session.last_activity_at)
            .map(|session| session.user_id.clone())?;
        sessions.remove(&victim);
        Some(victim)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, user_id: &ChatUserId, credential: ApiKey) -> Session {
        let now = self.clock.now();
        let session = Session::new(user_id.clone(), credential, now, self.timeout);

        let evicted = {
            let mut sessions = self.lock();
            let evicted = if sessions.contains_key(user_id) {
                None
            } else {
                Self::make_room(&mut sessions, self.max_sessions, now)
            };
            sessions.insert(user_id.clone(), session.clone());
            evicted
        };

        if let Some(evicted) = evicted {
            tracing::info!(
                evicted_user = %evicted,
                max_sessions = self.max_sessions,
                "Session cap reached; evicted least recently active session"
            );
        }
        tracing::debug!(user_id = %user_id, expires_at = %session.expires_at, "Session created");
        session
    }

    async fn get(&self, user_id: &ChatUserId) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let session = sessions.get_mut(user_id)?;
        if session.is_expired_at(now) {
            sessions.remove(user_id);
            drop(sessions);
            tracing::debug!(user_id = %user_id, "Expired session removed on lookup");
            return None;
        }
        session.touch(now, self.timeout);
        Some(session.clone())
    }

    async fn remove(&self, user_id: &ChatUserId) -> bool {
        self.lock().remove(user_id).is_some()
    }

    async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before.saturating_sub(sessions.len())
    }

    async fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Runs `sweep` every `interval` until `shutdown` flips to `true` or its
/// sender is dropped. Outstanding confirmation keys are swept on the same tick.
pub fn spawn_session_sweeper(
    store: Arc<dyn SessionStore>,
    pending: Option<Arc<PendingTransfers>>,
    clock: Arc<dyn Clock>,
    interval: StdDuration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = clock.now();
                    let removed = store.sweep(now).await;
                    if removed > 0 {
                        tracing::info!(removed, "Swept expired sessions");
                    }
                    if let Some(pending) = pending.as_ref() {
                        let dropped = pending.sweep(now);
                        if dropped > 0 {
                            tracing::debug!(dropped, "Swept abandoned transfer confirmations");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Session sweeper stopped");
                        break;
                    }
                }
            }
        }
    })
}
