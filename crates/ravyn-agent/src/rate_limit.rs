// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window admission control per user.
//!
//! Each user owns a queue of admission instants. The queue is only touched
//! while holding that user's map entry, so purge, check and record happen as
//! one step per user and never block other users.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use ravyn_config::model::LimitsConfig;
use ravyn_core::UserId;
use tracing::{debug, info, warn};

/// Window size and admission cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl From<&LimitsConfig> for RateLimit {
    fn from(config: &LimitsConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }
}

/// In-memory sliding-window limiter.
pub struct RateLimiter {
    windows: DashMap<UserId, VecDeque<Instant>>,
    limit: ArcSwap<RateLimit>,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            windows: DashMap::new(),
            limit: ArcSwap::from_pointee(limit),
        }
    }

    pub fn from_config(config: &LimitsConfig) -> Self {
        Self::new(RateLimit::from(config))
    }

    /// Admits the request now, or rejects it without recording.
    pub fn admit(&self, user_id: UserId) -> bool {
        self.admit_at(user_id, Instant::now())
    }

    /// Same as [`admit`](Self::admit) with an explicit clock reading.
    pub fn admit_at(&self, user_id: UserId, now: Instant) -> bool {
        let limit = **self.limit.load();
        let mut window = self.windows.entry(user_id).or_default();

        while window
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= limit.window)
        {
            window.pop_front();
        }

        if window.len() >= limit.max_requests as usize {
            warn!(
                user_id = %user_id,
                in_window = window.len(),
                max_requests = limit.max_requests,
                "rate limit exceeded"
            );
            return false;
        }

        window.push_back(now);
        true
    }

    /// Hands back an admission recorded at `admitted_at`, for requests that
    /// died on a store outage before doing any work.
    pub fn release(&self, user_id: UserId, admitted_at: Instant) {
        if let Some(mut window) = self.windows.get_mut(&user_id)
            && let Some(pos) = window.iter().rposition(|t| *t == admitted_at)
        {
            window.remove(pos);
            debug!(user_id = %user_id, "admission released");
        }
    }

    /// Forgets a user's window.
    pub fn reset_user(&self, user_id: UserId) {
        self.windows.remove(&user_id);
        debug!(user_id = %user_id, "rate limit window reset");
    }

    /// Replaces the limits. Windows already recorded are kept and judged
    /// against the new limits from the next call on.
    pub fn update_limits(&self, limit: RateLimit) {
        self.limit.store(Arc::new(limit));
        info!(
            max_requests = limit.max_requests,
            window_secs = limit.window.as_secs(),
            "rate limits updated"
        );
    }

    pub fn limits(&self) -> RateLimit {
        **self.limit.load()
    }

    /// Drops users whose every admission has aged out of the window.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let window = self.limits().window;
        let before = self.windows.len();
        self.windows.retain(|_, admitted| {
            admitted
                .back()
                .is_some_and(|t| now.saturating_duration_since(*t) < window)
        });
        before - self.windows.len()
    }

    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }
}
