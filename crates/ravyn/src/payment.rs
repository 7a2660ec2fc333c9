// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment adapter that approves every settlement without charging anyone.

use async_trait::async_trait;
use ravyn_core::types::{AdapterType, HealthStatus};
use ravyn_core::{PaymentAdapter, PluginAdapter, RavynError, UserId};
use tracing::warn;

/// Enabled by `subscription.simulated_payments`, for demos and staging.
pub struct SimulatedPayment;

#[async_trait]
impl PluginAdapter for SimulatedPayment {
    fn name(&self) -> &str {
        "simulated-payment"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Payment
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        Ok(HealthStatus::Degraded("payments are simulated".into()))
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        Ok(())
    }
}

#[async_trait]
impl PaymentAdapter for SimulatedPayment {
    async fn settle(&self, user_id: UserId, tier: &str, price: u32) -> Result<bool, RavynError> {
        warn!(user_id = %user_id, tier, price, "approving simulated payment");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn approves_every_settlement() {
        let payment = SimulatedPayment;
        assert!(payment.settle(UserId(1), "basic", 5).await.unwrap());
        assert_eq!(payment.adapter_type(), AdapterType::Payment);
    }
}
