// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat completion provider over the OpenAI dialect.
//!
//! One type serves both `gpt` (OpenAI) and `mistral` (Mistral), which differ
//! only in base URL, credentials, model list, and system prompt.

use std::time::Duration;

use async_trait::async_trait;
use ravyn_config::model::{ProviderEntry, ProvidersConfig};
use ravyn_core::{
    AdapterType, ConversationExchange, HealthStatus, PluginAdapter, ProviderAdapter, RavynError,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::resolve_api_key;
use crate::types::{ChatMessage, ChatRequest};

const GPT_SYSTEM_PROMPT: &str = "You are ChatGPT, a large language model trained by OpenAI. \
You are helping users in a Telegram bot. Be helpful, concise, and friendly.";

const MISTRAL_SYSTEM_PROMPT: &str =
    "You are Mistral AI, helping users in a Telegram bot. Be helpful, concise, and friendly.";

pub struct OpenAiChatProvider {
    name: String,
    client: OpenAiClient,
    default_model: String,
    models: Vec<String>,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChatProvider {
    /// The `gpt` provider. Key resolution: `providers.openai.api_key`, then `OPENAI_API_KEY`.
    pub fn gpt(config: &ProvidersConfig) -> Result<Self, RavynError> {
        Self::from_entry("gpt", &config.openai, config, "OPENAI_API_KEY", GPT_SYSTEM_PROMPT)
    }

    /// The `mistral` provider. Key resolution: `providers.mistral.api_key`, then `MISTRAL_API_KEY`.
    pub fn mistral(config: &ProvidersConfig) -> Result<Self, RavynError> {
        Self::from_entry(
            "mistral",
            &config.mistral,
            config,
            "MISTRAL_API_KEY",
            MISTRAL_SYSTEM_PROMPT,
        )
    }

    fn from_entry(
        name: &str,
        entry: &ProviderEntry,
        config: &ProvidersConfig,
        env_var: &str,
        default_prompt: &str,
    ) -> Result<Self, RavynError> {
        let api_key = resolve_api_key(&entry.api_key, env_var)?;
        let client = OpenAiClient::new(
            &api_key,
            &entry.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(provider = name, model = %entry.default_model, "chat provider initialized");
        Ok(Self {
            name: name.to_string(),
            client,
            default_model: entry.default_model.clone(),
            models: entry.models.clone(),
            system_prompt: entry
                .system_prompt
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| default_prompt.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// System prompt, then history in order, then the new message.
    fn to_chat_request(
        &self,
        model: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new("system", self.system_prompt.clone()));
        messages.extend(
            history
                .iter()
                .map(|entry| ChatMessage::new(entry.role.to_string(), entry.content.clone())),
        );
        messages.push(ChatMessage::new("user", message));

        ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        debug!(provider = %self.name, "chat provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiChatProvider {
    async fn generate(
        &self,
        model: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> Result<String, RavynError> {
        let request = self.to_chat_request(model, message, history);
        let response = self.client.chat_completion(&request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RavynError::Provider {
                message: format!("{} returned no completion text", self.name),
                source: None,
            })
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}
