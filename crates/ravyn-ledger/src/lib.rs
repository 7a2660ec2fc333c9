// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token accounting for the Ravyn dispatch gateway.
//!
//! Provides the per-kind cost table, the balance ledger with atomic
//! debit-if-sufficient, and the append-only interaction recorder.

pub mod costs;
pub mod ledger;
pub mod recorder;

pub use costs::TokenCostTable;
pub use ledger::{Charge, TokenLedger};
pub use recorder::{DailyUsage, InteractionRecorder};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use ravyn_config::model::StorageConfig;
    use ravyn_core::types::{ImagePreferences, NewUser};
    use ravyn_core::{StorageAdapter, UserId};
    use ravyn_storage::SqliteStorage;

    pub async fn storage() -> (Arc<dyn StorageAdapter>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("ledger.db").to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        (Arc::new(storage), dir)
    }

    pub async fn user_with_balance(storage: &Arc<dyn StorageAdapter>, id: i64, tokens: i64) {
        storage
            .ensure_user(&NewUser {
                user_id: UserId(id),
                username: None,
                starting_balance: tokens,
                preferred_provider: "gpt".into(),
                memory_enabled: true,
                image: ImagePreferences {
                    style: "realistic".into(),
                    size: "1024x1024".into(),
                    quality: "standard".into(),
                },
            })
            .await
            .unwrap();
    }
}
