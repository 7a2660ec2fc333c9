// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper that fails chosen operations, for outage tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ravyn_core::types::{
    GlobalStats, ImagePreferences, NewUser, Preference, Subscription, UserStats,
};
use ravyn_core::{
    AdapterType, Artifact, ConversationExchange, HealthStatus, InteractionLogEntry,
    PluginAdapter, RavynError, StorageAdapter, UserAccount, UserId,
};

/// Store calls that can be switched into failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Debit,
    Credit,
    ReadHistory,
    AppendHistory,
    RecordInteraction,
    GetArtifact,
    PutArtifact,
}

/// Delegates to a real store until an operation is broken with
/// [`FaultyStorage::fail`]; broken calls return a storage error without
/// reaching the inner store.
pub struct FaultyStorage {
    inner: Arc<dyn StorageAdapter>,
    broken: Mutex<HashSet<StoreOp>>,
}

impl FaultyStorage {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner,
            broken: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: StoreOp) {
        self.ops().insert(op);
    }

    pub fn heal(&self, op: StoreOp) {
        self.ops().remove(&op);
    }

    pub fn heal_all(&self) {
        self.ops().clear();
    }

    fn ops(&self) -> std::sync::MutexGuard<'_, HashSet<StoreOp>> {
        // A panicking test thread must not wedge the others.
        self.broken.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, op: StoreOp) -> Result<(), RavynError> {
        if self.ops().contains(&op) {
            return Err(RavynError::Storage {
                source: Box::new(std::io::Error::other(format!("{op:?}: database is locked"))),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FaultyStorage {
    fn name(&self) -> &str {
        "faulty-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for FaultyStorage {
    async fn initialize(&self) -> Result<(), RavynError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), RavynError> {
        self.inner.close().await
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<UserAccount>, RavynError> {
        self.inner.get_user(user_id).await
    }

    async fn ensure_user(&self, new_user: &NewUser) -> Result<UserAccount, RavynError> {
        self.inner.ensure_user(new_user).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserAccount>, RavynError> {
        self.inner.list_users(limit, offset).await
    }

    async fn set_preference(
        &self,
        user_id: UserId,
        preference: &Preference,
    ) -> Result<bool, RavynError> {
        self.inner.set_preference(user_id, preference).await
    }

    async fn toggle_memory(&self, user_id: UserId) -> Result<Option<bool>, RavynError> {
        self.inner.toggle_memory(user_id).await
    }

    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool, RavynError> {
        self.inner.set_banned(user_id, banned).await
    }

    async fn set_subscription(
        &self,
        user_id: UserId,
        subscription: &Subscription,
    ) -> Result<bool, RavynError> {
        self.inner.set_subscription(user_id, subscription).await
    }

    async fn list_subscribers(&self) -> Result<Vec<UserAccount>, RavynError> {
        self.inner.list_subscribers().await
    }

    async fn grant_bonus_if_due(
        &self,
        user_id: UserId,
        amount: i64,
        due_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, RavynError> {
        self.check(StoreOp::Credit)?;
        self.inner
            .grant_bonus_if_due(user_id, amount, due_before, now)
            .await
    }

    async fn balance(&self, user_id: UserId) -> Result<Option<i64>, RavynError> {
        self.inner.balance(user_id).await
    }

    async fn debit_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, RavynError> {
        self.check(StoreOp::Debit)?;
        self.inner.debit_if_sufficient(user_id, amount).await
    }

    async fn credit(&self, user_id: UserId, amount: i64) -> Result<Option<i64>, RavynError> {
        self.check(StoreOp::Credit)?;
        self.inner.credit(user_id, amount).await
    }

    async fn read_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationExchange>, RavynError> {
        self.check(StoreOp::ReadHistory)?;
        self.inner.read_history(user_id).await
    }

    async fn append_exchange(
        &self,
        user_id: UserId,
        user_text: &str,
        assistant_text: &str,
        max_entries: usize,
    ) -> Result<(), RavynError> {
        self.check(StoreOp::AppendHistory)?;
        self.inner
            .append_exchange(user_id, user_text, assistant_text, max_entries)
            .await
    }

    async fn clear_history(&self, user_id: UserId) -> Result<(), RavynError> {
        self.inner.clear_history(user_id).await
    }

    async fn record_interaction(&self, entry: &InteractionLogEntry) -> Result<(), RavynError> {
        self.check(StoreOp::RecordInteraction)?;
        self.inner.record_interaction(entry).await
    }

    async fn recent_interactions(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<InteractionLogEntry>, RavynError> {
        self.inner.recent_interactions(user_id, limit).await
    }

    async fn user_stats(&self, user_id: UserId) -> Result<UserStats, RavynError> {
        self.inner.user_stats(user_id).await
    }

    async fn global_stats(&self, active_since: DateTime<Utc>) -> Result<GlobalStats, RavynError> {
        self.inner.global_stats(active_since).await
    }

    async fn put_artifact(&self, artifact: &Artifact) -> Result<(), RavynError> {
        self.check(StoreOp::PutArtifact)?;
        self.inner.put_artifact(artifact).await
    }

    async fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, RavynError> {
        self.check(StoreOp::GetArtifact)?;
        self.inner.get_artifact(id).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), RavynError> {
        self.inner.set_setting(key, value).await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, RavynError> {
        self.inner.get_setting(key).await
    }
}
