// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery to a messaging platform.

use async_trait::async_trait;

use crate::error::RavynError;
use crate::event::Outbound;
use crate::traits::adapter::PluginAdapter;

/// Delivers outbound directives produced by the dispatch engine.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Sends one directive.
    async fn send(&self, outbound: &Outbound) -> Result<(), RavynError>;
}
