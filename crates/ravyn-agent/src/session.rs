// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-slot, expiring per-user pending actions.
//!
//! A pending session records that the next plain-text message from a user
//! completes an interactive action started by a button press. Consuming a
//! session is a compare-and-clear on the user's map entry: of two racing
//! consumers, exactly one gets the session.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ravyn_config::model::SessionConfig;
use ravyn_core::UserId;
use tracing::debug;

/// What the follow-up message completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    /// The follow-up describes changes for a variation of an artifact.
    AwaitingVariation,
}

/// A pending action awaiting a follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSession {
    pub kind: PendingKind,
    /// Opaque reference, e.g. an artifact id.
    pub payload: String,
    pub created_at: Instant,
}

/// Pending sessions keyed by user, with a fixed TTL.
pub struct SessionStore {
    sessions: DashMap<UserId, PendingSession>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::from_secs(config.pending_ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, session: &PendingSession, now: Instant) -> bool {
        now.saturating_duration_since(session.created_at) < self.ttl
    }

    /// Stores a pending action, replacing any earlier one.
    pub fn set_pending(&self, user_id: UserId, kind: PendingKind, payload: impl Into<String>) {
        self.set_pending_at(user_id, kind, payload, Instant::now());
    }

    pub fn set_pending_at(
        &self,
        user_id: UserId,
        kind: PendingKind,
        payload: impl Into<String>,
        now: Instant,
    ) {
        let session = PendingSession {
            kind,
            payload: payload.into(),
            created_at: now,
        };
        if self.sessions.insert(user_id, session).is_some() {
            debug!(user_id = %user_id, "pending session superseded");
        }
    }

    /// Returns the live session without consuming it.
    pub fn get_pending(&self, user_id: UserId) -> Option<PendingSession> {
        self.get_pending_at(user_id, Instant::now())
    }

    pub fn get_pending_at(&self, user_id: UserId, now: Instant) -> Option<PendingSession> {
        let live = self
            .sessions
            .get(&user_id)
            .filter(|s| self.is_live(s, now))
            .map(|s| s.value().clone());
        if live.is_none() {
            self.sessions.remove_if(&user_id, |_, s| !self.is_live(s, now));
        }
        live
    }

    /// Removes and returns the live session, atomically.
    ///
    /// An expired session is discarded and reported as absent.
    pub fn take_pending(&self, user_id: UserId) -> Option<PendingSession> {
        self.take_pending_at(user_id, Instant::now())
    }

    pub fn take_pending_at(&self, user_id: UserId, now: Instant) -> Option<PendingSession> {
        let (_, session) = self.sessions.remove(&user_id)?;
        if self.is_live(&session, now) {
            Some(session)
        } else {
            debug!(user_id = %user_id, "pending session expired");
            None
        }
    }

    /// Puts a taken session back, unless a newer one has been set meanwhile.
    pub fn restore(&self, user_id: UserId, session: PendingSession) {
        if let Entry::Vacant(slot) = self.sessions.entry(user_id) {
            slot.insert(session);
        }
    }

    pub fn clear(&self, user_id: UserId) {
        self.sessions.remove(&user_id);
    }

    /// Drops every expired session. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| self.is_live(s, now));
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(300))
    }

    #[test]
    fn set_then_get_returns_session() {
        let store = store();
        store.set_pending(UserId(1), PendingKind::AwaitingVariation, "abc123");
        let session = store.get_pending(UserId(1)).unwrap();
        assert_eq!(session.kind, PendingKind::AwaitingVariation);
        assert_eq!(session.payload, "abc123");
        // get does not consume.
        assert!(store.get_pending(UserId(1)).is_some());
    }

    #[test]
    fn new_session_supersedes_old() {
        let store = store();
        store.set_pending(UserId(1), PendingKind::AwaitingVariation, "first");
        store.set_pending(UserId(1), PendingKind::AwaitingVariation, "second");
        assert_eq!(store.take_pending(UserId(1)).unwrap().payload, "second");
        assert!(store.take_pending(UserId(1)).is_none());
    }

    #[test]
    fn expired_session_is_absent() {
        let store = store();
        let start = Instant::now();
        store.set_pending_at(UserId(1), PendingKind::AwaitingVariation, "x", start);
        let later = start + Duration::from_secs(300);
        assert!(store.get_pending_at(UserId(1), later).is_none());
        assert!(store.take_pending_at(UserId(1), later).is_none());
    }

    #[test]
    fn expired_session_is_not_taken() {
        let store = store();
        let start = Instant::now();
        store.set_pending_at(UserId(1), PendingKind::AwaitingVariation, "x", start);
        assert!(
            store
                .take_pending_at(UserId(1), start + Duration::from_secs(301))
                .is_none()
        );
        assert!(store.get_pending_at(UserId(1), start).is_none());
    }

    #[test]
    fn clear_removes_session() {
        let store = store();
        store.set_pending(UserId(1), PendingKind::AwaitingVariation, "x");
        store.clear(UserId(1));
        assert!(store.get_pending(UserId(1)).is_none());
    }

    #[test]
    fn restore_does_not_overwrite_newer_session() {
        let store = store();
        store.set_pending(UserId(1), PendingKind::AwaitingVariation, "old");
        let taken = store.take_pending(UserId(1)).unwrap();
        store.set_pending(UserId(1), PendingKind::AwaitingVariation, "new");
        store.restore(UserId(1), taken.clone());
        assert_eq!(store.get_pending(UserId(1)).unwrap().payload, "new");

        store.clear(UserId(1));
        store.restore(UserId(1), taken);
        assert_eq!(store.get_pending(UserId(1)).unwrap().payload, "old");
    }

    #[test]
    fn purge_expired_keeps_live_sessions() {
        let store = store();
        let start = Instant::now();
        store.set_pending_at(UserId(1), PendingKind::AwaitingVariation, "a", start);
        store.set_pending_at(
            UserId(2),
            PendingKind::AwaitingVariation,
            "b",
            start + Duration::from_secs(200),
        );
        assert_eq!(store.purge_expired(start + Duration::from_secs(400)), 1);
        assert!(
            store
                .get_pending_at(UserId(2), start + Duration::from_secs(400))
                .is_some()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_take_at_most_once() {
        for _ in 0..50 {
            let store = Arc::new(store());
            store.set_pending(UserId(7), PendingKind::AwaitingVariation, "img");
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move { store.take_pending(UserId(7)) })
                })
                .collect();
            let mut taken = 0;
            for task in tasks {
                if task.await.unwrap().is_some() {
                    taken += 1;
                }
            }
            assert_eq!(taken, 1);
        }
    }
}
