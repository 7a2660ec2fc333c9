// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use ravyn_config::model::StorageConfig;
use ravyn_core::types::{
    GlobalStats, NewUser, Preference, Subscription, UserStats,
};
use ravyn_core::{
    AdapterType, Artifact, ConversationExchange, HealthStatus, InteractionLogEntry,
    PluginAdapter, RavynError, StorageAdapter, UserAccount, UserId,
};

use crate::database::{checkpoint, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`];
/// every other method fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, RavynError> {
        self.db.get().ok_or_else(|| RavynError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(_) => return Ok(HealthStatus::Unhealthy("not initialized".into())),
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        if let Some(db) = self.db.get() {
            checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), RavynError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RavynError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RavynError> {
        checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Accounts ---

    async fn get_user(&self, user_id: UserId) -> Result<Option<UserAccount>, RavynError> {
        queries::users::get_user(self.db()?, user_id).await
    }

    async fn ensure_user(&self, new_user: &NewUser) -> Result<UserAccount, RavynError> {
        queries::users::ensure_user(self.db()?, new_user, Utc::now()).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserAccount>, RavynError> {
        queries::users::list_users(self.db()?, limit, offset).await
    }

    async fn set_preference(
        &self,
        user_id: UserId,
        preference: &Preference,
    ) -> Result<bool, RavynError> {
        queries::users::set_preference(self.db()?, user_id, preference).await
    }

    async fn toggle_memory(&self, user_id: UserId) -> Result<Option<bool>, RavynError> {
        queries::users::toggle_memory(self.db()?, user_id).await
    }

    async fn set_banned(&self, user_id: UserId, banned: bool) -> Result<bool, RavynError> {
        queries::users::set_banned(self.db()?, user_id, banned).await
    }

    async fn set_subscription(
        &self,
        user_id: UserId,
        subscription: &Subscription,
    ) -> Result<bool, RavynError> {
        queries::users::set_subscription(self.db()?, user_id, subscription).await
    }

    async fn list_subscribers(&self) -> Result<Vec<UserAccount>, RavynError> {
        queries::users::list_subscribers(self.db()?).await
    }

    async fn grant_bonus_if_due(
        &self,
        user_id: UserId,
        amount: i64,
        due_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, RavynError> {
        queries::users::grant_bonus_if_due(self.db()?, user_id, amount, due_before, now).await
    }

    // --- Balance ---

    async fn balance(&self, user_id: UserId) -> Result<Option<i64>, RavynError> {
        queries::balance::balance(self.db()?, user_id).await
    }

    async fn debit_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<Option<i64>, RavynError> {
        queries::balance::debit_if_sufficient(self.db()?, user_id, amount).await
    }

    async fn credit(&self, user_id: UserId, amount: i64) -> Result<Option<i64>, RavynError> {
        queries::balance::credit(self.db()?, user_id, amount).await
    }

    // --- Conversation history ---

    async fn read_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConversationExchange>, RavynError> {
        queries::history::read_history(self.db()?, user_id).await
    }

    async fn append_exchange(
        &self,
        user_id: UserId,
        user_text: &str,
        assistant_text: &str,
        max_entries: usize,
    ) -> Result<(), RavynError> {
        queries::history::append_exchange(
            self.db()?,
            user_id,
            user_text,
            assistant_text,
            max_entries,
        )
        .await
    }

    async fn clear_history(&self, user_id: UserId) -> Result<(), RavynError> {
        queries::history::clear_history(self.db()?, user_id).await
    }

    // --- Interaction log ---

    async fn record_interaction(&self, entry: &InteractionLogEntry) -> Result<(), RavynError> {
        queries::interactions::record_interaction(self.db()?, entry).await
    }

    async fn recent_interactions(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<InteractionLogEntry>, RavynError> {
        queries::interactions::recent_interactions(self.db()?, user_id, limit).await
    }

    async fn user_stats(&self, user_id: UserId) -> Result<UserStats, RavynError> {
        queries::interactions::user_stats(self.db()?, user_id).await
    }

    async fn global_stats(&self, active_since: DateTime<Utc>) -> Result<GlobalStats, RavynError> {
        queries::interactions::global_stats(self.db()?, active_since).await
    }

    // --- Artifacts ---

    async fn put_artifact(&self, artifact: &Artifact) -> Result<(), RavynError> {
        queries::artifacts::put_artifact(self.db()?, artifact).await
    }

    async fn get_artifact(&self, id: &str) -> Result<Option<Artifact>, RavynError> {
        queries::artifacts::get_artifact(self.db()?, id).await
    }

    // --- Settings ---

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), RavynError> {
        queries::settings::set_setting(self.db()?, key, value).await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, RavynError> {
        queries::settings::get_setting(self.db()?, key).await
    }
}
