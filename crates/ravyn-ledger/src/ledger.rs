// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token balance ledger.
//!
//! Balances live in the store; every debit is delegated to the store's
//! conditional update so the check and the decrement are one atomic step.
//! An insufficient balance is an ordinary outcome, not an error. Store
//! failures surface as [`RavynError::Storage`].

use std::sync::Arc;

use arc_swap::ArcSwap;
use ravyn_core::{InteractionKind, RavynError, StorageAdapter, UserId};
use tracing::{debug, info};

use crate::costs::TokenCostTable;

/// Result of charging a user for one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    /// The cost was reserved; `balance` is what remains.
    Debited { cost: i64, balance: i64 },
    /// The balance did not cover `cost`. Nothing changed.
    Insufficient { cost: i64, balance: i64 },
}

impl Charge {
    pub fn is_debited(&self) -> bool {
        matches!(self, Charge::Debited { .. })
    }

    pub fn cost(&self) -> i64 {
        match self {
            Charge::Debited { cost, .. } | Charge::Insufficient { cost, .. } => *cost,
        }
    }
}

/// Atomic balance operations plus the live cost table.
pub struct TokenLedger {
    storage: Arc<dyn StorageAdapter>,
    costs: ArcSwap<TokenCostTable>,
}

impl TokenLedger {
    pub fn new(storage: Arc<dyn StorageAdapter>, costs: TokenCostTable) -> Self {
        Self {
            storage,
            costs: ArcSwap::from_pointee(costs),
        }
    }

    /// Current balance. Unknown users hold zero.
    pub async fn get_balance(&self, user_id: UserId) -> Result<i64, RavynError> {
        Ok(self.storage.balance(user_id).await?.unwrap_or(0))
    }

    /// Debits `amount` only if the balance covers it.
    ///
    /// Returns `false` with no mutation when it does not.
    pub async fn debit_if_sufficient(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> Result<bool, RavynError> {
        if amount < 0 {
            return Err(RavynError::Validation(format!(
                "debit amount must be non-negative, got {amount}"
            )));
        }
        let remaining = self.storage.debit_if_sufficient(user_id, amount).await?;
        if let Some(balance) = remaining {
            debug!(user_id = %user_id, amount, balance, "tokens debited");
        }
        Ok(remaining.is_some())
    }

    /// Charges the current cost of `kind`, looked up at call time.
    pub async fn charge(&self, user_id: UserId, kind: InteractionKind) -> Result<Charge, RavynError> {
        let cost = self.cost_of(kind);
        match self.storage.debit_if_sufficient(user_id, cost).await? {
            Some(balance) => {
                debug!(user_id = %user_id, kind = %kind, cost, balance, "tokens debited");
                Ok(Charge::Debited { cost, balance })
            }
            None => {
                let balance = self.get_balance(user_id).await?;
                Ok(Charge::Insufficient { cost, balance })
            }
        }
    }

    /// Adds tokens. Returns the new balance, or `None` for an unknown user.
    pub async fn credit(&self, user_id: UserId, amount: i64) -> Result<Option<i64>, RavynError> {
        if amount < 0 {
            return Err(RavynError::Validation(format!(
                "credit amount must be non-negative, got {amount}"
            )));
        }
        let balance = self.storage.credit(user_id, amount).await?;
        if let Some(balance) = balance {
            info!(user_id = %user_id, amount, balance, "tokens credited");
        }
        Ok(balance)
    }

    pub fn cost_of(&self, kind: InteractionKind) -> i64 {
        self.costs.load().cost(kind)
    }

    /// Snapshot of the cost table.
    pub fn costs(&self) -> Arc<TokenCostTable> {
        self.costs.load_full()
    }

    /// Replaces one kind's cost. Charges already in flight keep the old price.
    pub fn set_cost(&self, kind: InteractionKind, cost: i64) -> Result<(), RavynError> {
        if cost < 0 {
            return Err(RavynError::Validation(format!(
                "cost for {kind} must be non-negative, got {cost}"
            )));
        }
        self.costs.rcu(|table| table.with_cost(kind, cost));
        info!(kind = %kind, cost, "token cost updated");
        Ok(())
    }
}
