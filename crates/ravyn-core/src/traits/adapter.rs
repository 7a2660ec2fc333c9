// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity shared by providers, channels, image and payment backends.

use async_trait::async_trait;

use crate::error::RavynError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle, and health for every adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Routing name, e.g. `gpt` or `telegram`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Cheap liveness check; must not spend provider tokens.
    async fn health_check(&self) -> Result<HealthStatus, RavynError>;

    /// Called once while the gateway stops.
    async fn shutdown(&self) -> Result<(), RavynError>;
}
