// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock payment adapter that approves or declines on command.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use ravyn_core::{AdapterType, HealthStatus, PaymentAdapter, PluginAdapter, RavynError, UserId};

/// One recorded settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub user_id: UserId,
    pub tier: String,
    pub price: u32,
}

pub struct MockPayment {
    approve: AtomicBool,
    broken: AtomicBool,
    settlements: Arc<Mutex<Vec<Settlement>>>,
}

impl MockPayment {
    pub fn new(approve: bool) -> Self {
        Self {
            approve: AtomicBool::new(approve),
            broken: AtomicBool::new(false),
            settlements: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_approve(&self, approve: bool) {
        self.approve.store(approve, Ordering::SeqCst);
    }

    /// Makes `settle` return an error instead of a decision.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    pub async fn settlements(&self) -> Vec<Settlement> {
        self.settlements.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockPayment {
    fn name(&self) -> &str {
        "mock-payment"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Payment
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        Ok(())
    }
}

#[async_trait]
impl PaymentAdapter for MockPayment {
    async fn settle(&self, user_id: UserId, tier: &str, price: u32) -> Result<bool, RavynError> {
        self.settlements.lock().await.push(Settlement {
            user_id,
            tier: tier.to_string(),
            price,
        });
        if self.broken.load(Ordering::SeqCst) {
            return Err(RavynError::Payment {
                message: "payment backend unreachable".into(),
            });
        }
        Ok(self.approve.load(Ordering::SeqCst))
    }
}
