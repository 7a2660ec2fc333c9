// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text completion providers (OpenAI, Anthropic, Mistral, ...).

use async_trait::async_trait;

use crate::error::RavynError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ConversationExchange;

/// A backend that turns a message plus prior exchanges into a reply.
///
/// [`PluginAdapter::name`] is the routing key users select (`gpt`, `claude`, ...).
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Generates a completion with the given model.
    async fn generate(
        &self,
        model: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> Result<String, RavynError>;

    /// Model names this provider accepts.
    fn models(&self) -> Vec<String>;

    /// Model used until one is explicitly selected.
    fn default_model(&self) -> &str;
}
