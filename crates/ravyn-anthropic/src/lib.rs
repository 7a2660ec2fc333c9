// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider adapter for the Ravyn dispatch gateway.
//!
//! This crate implements [`ProviderAdapter`] for the Anthropic Messages API
//! under the routing name `claude`.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use ravyn_config::model::ProvidersConfig;
use ravyn_core::{
    AdapterType, ConversationExchange, HealthStatus, PluginAdapter, ProviderAdapter, RavynError,
};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::types::{MessagesBody, Turn};

const DEFAULT_API_VERSION: &str = "2023-06-01";

const DEFAULT_SYSTEM_PROMPT: &str = "You are Claude, an AI assistant by Anthropic, helping users \
in a Telegram bot. Be helpful, concise, and friendly.";

/// The `claude` provider.
///
/// The key comes from `providers.anthropic.api_key`, else `ANTHROPIC_API_KEY`.
pub struct AnthropicProvider {
    client: AnthropicClient,
    system_prompt: String,
    default_model: String,
    models: Vec<String>,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(config: &ProvidersConfig) -> Result<Self, RavynError> {
        let entry = &config.anthropic;
        let api_key = resolve_api_key(&entry.api_key)?;
        let client = AnthropicClient::new(
            &api_key,
            entry.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION),
            &entry.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;

        info!(model = %entry.default_model, "Anthropic provider initialized");

        Ok(Self {
            client,
            system_prompt: entry
                .system_prompt
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            default_model: entry.default_model.clone(),
            models: entry.models.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn messages_body(
        &self,
        model: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> MessagesBody {
        let messages = history
            .iter()
            .map(|entry| Turn {
                role: entry.role.to_string(),
                content: entry.content.clone(),
            })
            .chain(std::iter::once(Turn::user(message)))
            .collect();

        MessagesBody {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: Some(self.system_prompt.clone()),
            messages,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        // No API call here; a real request would cost tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        debug!(provider = "claude", "shutdown");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn generate(
        &self,
        model: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> Result<String, RavynError> {
        let body = self.messages_body(model, message, history);
        let response = self.client.send(&body).await?;
        let text = response.text();
        if text.is_empty() {
            return Err(RavynError::Provider {
                message: format!("Anthropic response {} had no text content", response.id),
                source: None,
            });
        }
        Ok(text)
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, RavynError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        RavynError::Config(
            "Anthropic API key not found. Set providers.anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> ProvidersConfig {
        let mut config = ProvidersConfig::default();
        config.anthropic.api_key = Some("sk-ant-test".into());
        config.anthropic.base_url = base_url.to_string();
        config
    }

    #[test]
    fn resolve_api_key_from_config() {
        assert_eq!(resolve_api_key(&Some("sk-test-123".into())).unwrap(), "sk-test-123");
    }

    #[test]
    fn request_carries_history_then_message() {
        let provider = AnthropicProvider::new(&config_for("http://localhost")).unwrap();
        let history = vec![
            ConversationExchange::user("first"),
            ConversationExchange::assistant("second"),
        ];
        let req = provider.messages_body("claude-3-haiku-20240307", "third", &history);
        let roles: Vec<&str> = req.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(req.messages[2].content, "third");
        assert!(req.system.as_deref().unwrap().starts_with("You are Claude"));
        assert_eq!(req.max_tokens, 1000);
    }

    #[test]
    fn plugin_adapter_metadata() {
        let provider = AnthropicProvider::new(&config_for("http://localhost")).unwrap();
        assert_eq!(provider.name(), "claude");
        assert_eq!(provider.version(), semver::Version::new(0, 1, 0));
        assert_eq!(provider.adapter_type(), AdapterType::Provider);
        assert_eq!(provider.default_model(), "claude-3-opus-20240229");
        assert!(provider.models().contains(&"claude-3-haiku-20240307".to_string()));
    }

    #[tokio::test]
    async fn generate_uses_requested_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(serde_json::json!({"model": "claude-3-sonnet-20240229"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "type": "message",
                "model": "claude-3-sonnet-20240229",
                "content": [{"type": "text", "text": "Bonjour"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&config_for(&server.uri())).unwrap();
        let text = provider
            .generate("claude-3-sonnet-20240229", "Hello", &[])
            .await
            .unwrap();
        assert_eq!(text, "Bonjour");
    }

    #[tokio::test]
    async fn empty_content_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_2",
                "type": "message",
                "model": "claude-3-opus-20240229",
                "content": []
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&config_for(&server.uri())).unwrap();
        assert!(provider.generate("claude-3-opus-20240229", "x", &[]).await.is_err());
    }
}
