// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The store boundary: accounts, balances, history, audit log, artifacts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RavynError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Artifact, ConversationExchange, GlobalStats, InteractionLogEntry, NewUser, Preference,
    Subscription, UserAccount, UserId, UserStats,
};

/// Persistence backend for everything the dispatch engine keeps across events.
///
/// Every per-user mutation is a single atomic statement or transaction so
/// concurrent events for the same user cannot lose updates. Any `Err` from
/// these methods is an infrastructure failure.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the backend (connection, migrations).
    async fn initialize(&self) -> Result<(), RavynError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), RavynError>;

    // --- Accounts ---

    async fn get_user(&self, user_id: UserId) -> Result<Option<UserAccount>, RavynError>;

    /// Creates the account if absent, refreshes `last_activity`, and returns it.
    async fn ensure_user(&self, new_user: &NewUser) -> Result<UserAccount, RavynError>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserAccount>, RavynError>;

    /// Returns false if the user does not exist.
    async fn set_preference(
        &self,
        user_id: UserId,
        preference: &Preference,
    ) -> Result<bool, RavynError>;

    /// Flips the memory flag, returning the new value.
    async fn toggle_memory(&self, user_id: UserId) -> Result<Option<bool>, RavynError>;

    /// Sets the ban flag. Returns false if the user does not exist.
    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool, RavynError>;

    /// Replaces the user's subscription. Returns false if the user does not exist.
    async fn set_subscription(
        &self,
        user_id: UserId,
        subscription: &Subscription,
    ) -> Result<bool, RavynError>;

    async fn list_subscribers(&self) -> Result<Vec<UserAccount>, RavynError>;

    /// Credits `amount` and stamps `now` as the last bonus, only if the
    /// previous bonus (or the subscription start) is at or before `due_before`
    /// and the subscription was still active at `due_before`.
    /// Returns the new balance when granted.
    async fn grant_bonus_if_due(
        &self,
        user_id: UserId,
        amount: i64,
        due_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, RavynError>;

    // --- Balance ---

    async fn balance(&self, user_id: UserId) -> Result<Option<i64>, RavynError>;

    /// Decrements the balance only if it is at least `amount`.
    /// Returns the new balance, or `None` if insufficient or unknown.
    async fn debit_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, RavynError>;

    /// Increments the balance. Returns the new balance, or `None` if unknown.
    async fn credit(&self, user_id: UserId, amount: i64) -> Result<Option<i64>, RavynError>;

    // --- Conversation history ---

    /// Entries in chronological order.
    async fn read_history(&self, user_id: UserId)
    -> Result<Vec<ConversationExchange>, RavynError>;

    /// Appends a user/assistant pair and trims the oldest entries beyond
    /// `max_entries`, in one transaction.
    async fn append_exchange(
        &self,
        user_id: UserId,
        user_text: &str,
        assistant_text: &str,
        max_entries: usize,
    ) -> Result<(), RavynError>;

    async fn clear_history(&self, user_id: UserId) -> Result<(), RavynError>;

    // --- Interaction log ---

    async fn record_interaction(&self, entry: &InteractionLogEntry) -> Result<(), RavynError>;

    /// Most recent first.
    async fn recent_interactions(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<InteractionLogEntry>, RavynError>;

    async fn user_stats(&self, user_id: UserId) -> Result<UserStats, RavynError>;

    /// `active_since` bounds the "active today" count.
    async fn global_stats(&self, active_since: DateTime<Utc>) -> Result<GlobalStats, RavynError>;

    // --- Artifacts ---

    async fn put_artifact(&self, artifact: &Artifact) -> Result<(), RavynError>;

    async fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, RavynError>;

    // --- Settings ---

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), RavynError>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>, RavynError>;
}
