// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user windowed history backed by the store.

use std::sync::Arc;

use ravyn_config::model::MemoryConfig;
use ravyn_core::{ConversationExchange, RavynError, StorageAdapter, UserId};
use tracing::debug;

/// Bounded ordered exchange history per user.
pub struct ConversationMemory {
    storage: Arc<dyn StorageAdapter>,
    max_entries: usize,
}

impl ConversationMemory {
    /// `max_entries` counts single entries, so it must be an even number of
    /// at least two (one pair).
    pub fn new(storage: Arc<dyn StorageAdapter>, max_entries: usize) -> Result<Self, RavynError> {
        if max_entries < 2 || max_entries % 2 != 0 {
            return Err(RavynError::Config(format!(
                "memory cap must be an even number of at least 2, got {max_entries}"
            )));
        }
        Ok(Self {
            storage,
            max_entries,
        })
    }

    pub fn from_config(
        storage: Arc<dyn StorageAdapter>,
        config: &MemoryConfig,
    ) -> Result<Self, RavynError> {
        Self::new(storage, config.max_entries)
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    async fn enabled(&self, user_id: UserId) -> Result<bool, RavynError> {
        Ok(self
            .storage
            .get_user(user_id)
            .await?
            .is_some_and(|user| user.memory_enabled))
    }

    /// Chronological history; empty when memory is off or the user is unknown.
    pub async fn read(&self, user_id: UserId) -> Result<Vec<ConversationExchange>, RavynError> {
        if !self.enabled(user_id).await? {
            return Ok(Vec::new());
        }
        self.storage.read_history(user_id).await
    }

    /// Stores one exchange and trims to the cap.
    ///
    /// Returns `false` without writing when memory is disabled for the user.
    pub async fn append(
        &self,
        user_id: UserId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<bool, RavynError> {
        if !self.enabled(user_id).await? {
            debug!(user_id = %user_id, "memory disabled, exchange not stored");
            return Ok(false);
        }
        self.storage
            .append_exchange(user_id, user_text, assistant_text, self.max_entries)
            .await?;
        Ok(true)
    }

    pub async fn reset(&self, user_id: UserId) -> Result<(), RavynError> {
        self.storage.clear_history(user_id).await?;
        debug!(user_id = %user_id, "memory cleared");
        Ok(())
    }

    /// Flips the per-user flag and returns the new state.
    pub async fn toggle(&self, user_id: UserId) -> Result<bool, RavynError> {
        self.storage
            .toggle_memory(user_id)
            .await?
            .ok_or_else(|| RavynError::Validation(format!("unknown user {user_id}")))
    }
}
