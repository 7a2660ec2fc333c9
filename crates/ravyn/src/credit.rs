// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ravyn credit` command implementation.

use std::sync::Arc;

use ravyn_config::RavynConfig;
use ravyn_core::{InteractionKind, RavynError, StorageAdapter, UserId};
use ravyn_ledger::InteractionRecorder;
use ravyn_storage::SqliteStorage;

/// Model recorded for operator top-ups.
const OPERATOR_MODEL: &str = "operator";

/// Credits `amount` tokens to an existing user and logs it as a purchase.
pub async fn run_credit(config: &RavynConfig, user_id: i64, amount: i64) -> Result<(), RavynError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    let balance = credit(&storage, UserId(user_id), amount).await;
    storage.close().await?;
    let balance = balance?;

    println!("Credited {amount} tokens to user {user_id}. New balance: {balance} tokens.");
    Ok(())
}

async fn credit(
    storage: &Arc<dyn StorageAdapter>,
    user_id: UserId,
    amount: i64,
) -> Result<i64, RavynError> {
    let Some(balance) = storage.credit(user_id, amount).await? else {
        return Err(RavynError::Validation(format!("user {user_id} not found")));
    };
    InteractionRecorder::new(Arc::clone(storage))
        .record(user_id, InteractionKind::Purchase, OPERATOR_MODEL, amount)
        .await?;
    Ok(balance)
}
