// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment settlement.

use async_trait::async_trait;

use crate::error::RavynError;
use crate::traits::adapter::PluginAdapter;
use crate::types::UserId;

/// An opaque payment processor.
#[async_trait]
pub trait PaymentAdapter: PluginAdapter {
    /// Settles a purchase. `Ok(false)` means the payment was declined.
    async fn settle(&self, user_id: UserId, tier: &str, price: u32) -> Result<bool, RavynError>;
}
