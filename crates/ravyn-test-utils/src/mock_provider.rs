// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses,
//! an optional artificial delay, and a failure switch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ravyn_core::{
    AdapterType, ConversationExchange, HealthStatus, PluginAdapter, ProviderAdapter, RavynError,
};

/// One recorded call to [`MockProvider::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub model: String,
    pub message: String,
    pub history: Vec<ConversationExchange>,
}

/// A mock provider that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// `"mock response"` is returned.
pub struct MockProvider {
    name: String,
    models: Vec<String>,
    responses: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl MockProvider {
    /// A provider named `mock` accepting `mock-1` and `mock-2`.
    pub fn new() -> Self {
        Self::named("mock", &["mock-1", "mock-2"])
    }

    /// A provider with the given routing name and model allow-list.
    /// The first model is the default.
    pub fn named(name: &str, models: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            models: models.iter().map(|m| m.to_string()).collect(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub fn with_responses(self, responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..self
        }
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Makes every following call fail with a provider error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
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
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn generate(
        &self,
        model: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> Result<String, RavynError> {
        self.calls.lock().await.push(ProviderCall {
            model: model.to_string(),
            message: message.to_string(),
            history: history.to_vec(),
        });

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RavynError::Provider {
                message: format!("{} is unavailable", self.name),
                source: None,
            });
        }
        Ok(self.next_response().await)
    }

    fn models(&self) -> Vec<String> {
        self.models.clone()
    }

    fn default_model(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or("mock-1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_queued_then_default() {
        let provider = MockProvider::new().with_responses(vec!["first".into()]);
        assert_eq!(provider.generate("mock-1", "hi", &[]).await.unwrap(), "first");
        assert_eq!(
            provider.generate("mock-1", "hi", &[]).await.unwrap(),
            "mock response"
        );
        assert_eq!(provider.call_count().await, 2);
    }

    #[tokio::test]
    async fn failing_provider_errors() {
        let provider = MockProvider::named("gpt", &["gpt-4o"]);
        provider.set_failing(true);
        let err = provider.generate("gpt-4o", "hi", &[]).await.unwrap_err();
        assert!(err.to_string().contains("gpt is unavailable"));
        assert_eq!(provider.default_model(), "gpt-4o");
    }
}
