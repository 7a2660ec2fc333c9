// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplicate-delivery guard keyed by transport update id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

/// Purge expired keys once every this many insertions.
const PURGE_EVERY: u64 = 256;

/// Remembers recently seen update ids for a fixed TTL.
pub struct ReplayGuard {
    seen: DashMap<i64, Instant>,
    ttl: Duration,
    inserts: AtomicU64,
}

impl ReplayGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
            inserts: AtomicU64::new(0),
        }
    }

    /// Returns `true` the first time an id is seen within the TTL.
    pub fn first_seen(&self, update_id: i64) -> bool {
        self.first_seen_at(update_id, Instant::now())
    }

    pub fn first_seen_at(&self, update_id: i64, now: Instant) -> bool {
        let fresh = match self.seen.entry(update_id) {
            Entry::Occupied(mut seen) => {
                if now.saturating_duration_since(*seen.get()) < self.ttl {
                    false
                } else {
                    seen.insert(now);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        };

        if !fresh {
            debug!(update_id, "duplicate update dropped");
        } else if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            self.purge_expired(now);
        }
        fresh
    }

    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, at| now.saturating_duration_since(*at) < self.ttl);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
