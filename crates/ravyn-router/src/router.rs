// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Name-keyed provider registry with a fail-soft generate boundary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ravyn_config::model::ProvidersConfig;
use ravyn_core::{ConversationExchange, ProviderAdapter};
use tracing::{debug, error, info, warn};

/// Outcome of one routed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Provider that handled the call, after fallback.
    pub provider: String,
    /// Model the provider was asked to use.
    pub model: String,
    /// Reply text, or the apology when `failed` is set.
    pub text: String,
    /// The provider errored or timed out.
    pub failed: bool,
}

/// Registry of text providers plus their currently selected models.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    fallback: Arc<dyn ProviderAdapter>,
    models: DashMap<String, String>,
    timeout: Duration,
    apology: String,
}

impl ProviderRouter {
    /// Creates a router whose fallback is `fallback`, registered under its own name.
    pub fn new(fallback: Arc<dyn ProviderAdapter>, timeout: Duration, apology: impl Into<String>) -> Self {
        let mut router = Self {
            providers: HashMap::new(),
            fallback: Arc::clone(&fallback),
            models: DashMap::new(),
            timeout,
            apology: apology.into(),
        };
        router.register(fallback);
        router
    }

    /// Uses the timeout and apology from the `[providers]` section.
    pub fn from_config(fallback: Arc<dyn ProviderAdapter>, config: &ProvidersConfig) -> Self {
        Self::new(
            fallback,
            Duration::from_secs(config.timeout_secs),
            config.apology.clone(),
        )
    }

    /// Adds a provider. A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>) {
        let name = provider.name().to_string();
        self.models
            .insert(name.clone(), provider.default_model().to_string());
        debug!(provider = %name, "provider registered");
        if name == self.fallback.name() {
            self.fallback = Arc::clone(&provider);
        }
        self.providers.insert(name, provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.register(provider);
        self
    }

    pub fn fallback_name(&self) -> &str {
        self.fallback.name()
    }

    pub fn apology(&self) -> &str {
        &self.apology
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Allow-list of a provider's models, or `None` for an unknown provider.
    pub fn list_models(&self, name: &str) -> Option<Vec<String>> {
        self.providers.get(name).map(|p| p.models())
    }

    pub fn current_model(&self, name: &str) -> Option<String> {
        self.models.get(name).map(|m| m.value().clone())
    }

    /// Selects the model a provider uses from now on.
    ///
    /// Returns `false` and leaves the current selection untouched when the
    /// provider is unknown or the model is not on its allow-list.
    pub fn set_model(&self, name: &str, model: &str) -> bool {
        let Some(provider) = self.providers.get(name) else {
            warn!(provider = %name, "set_model for unknown provider");
            return false;
        };
        if !provider.models().iter().any(|m| m == model) {
            warn!(provider = %name, model = %model, "rejected model outside allow-list");
            return false;
        }
        self.models.insert(name.to_string(), model.to_string());
        info!(provider = %name, model = %model, "model selected");
        true
    }

    /// Resolves a name to a provider, using the fallback for unknown names.
    fn resolve(&self, name: &str) -> &Arc<dyn ProviderAdapter> {
        match self.providers.get(name) {
            Some(provider) => provider,
            None => {
                debug!(requested = %name, fallback = %self.fallback.name(), "unknown provider, using fallback");
                &self.fallback
            }
        }
    }

    /// Generates a reply. Never fails: provider errors and timeouts become
    /// the apology text with `failed` set, and are logged.
    pub async fn generate(
        &self,
        name: &str,
        message: &str,
        history: &[ConversationExchange],
    ) -> Generation {
        let provider = self.resolve(name);
        let provider_name = provider.name();
        let model = self
            .current_model(provider_name)
            .unwrap_or_else(|| provider.default_model().to_string());

        let result =
            tokio::time::timeout(self.timeout, provider.generate(&model, message, history)).await;

        let failure = match result {
            Ok(Ok(text)) => {
                return Generation {
                    provider: provider_name.to_string(),
                    model,
                    text,
                    failed: false,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}s", self.timeout.as_secs()),
        };

        error!(
            provider = %provider_name,
            model = %model,
            error = %failure,
            "provider call failed"
        );
        Generation {
            provider: provider_name.to_string(),
            model,
            text: self.apology.clone(),
            failed: true,
        }
    }
}
