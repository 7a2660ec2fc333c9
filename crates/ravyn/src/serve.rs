// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ravyn serve` command implementation.
//!
//! Opens SQLite storage, builds the enabled providers and the image adapter,
//! assembles the dispatch engine, and runs the webhook server next to the
//! monthly bonus task until SIGINT/SIGTERM.

use std::sync::Arc;

use ravyn_agent::{Adapters, DispatchEngine, install_signal_handler, recording, run_bonus_task};
use ravyn_anthropic::AnthropicProvider;
use ravyn_config::RavynConfig;
use ravyn_core::{
    ImageAdapter, PaymentAdapter, PluginAdapter, ProviderAdapter, RavynError, StorageAdapter,
};
use ravyn_openai::{DalleImageAdapter, OpenAiChatProvider};
use ravyn_router::ProviderRouter;
use ravyn_storage::SqliteStorage;
use ravyn_telegram::{TelegramChannel, WebhookState};
use tracing::{error, info, warn};

use crate::payment::SimulatedPayment;

/// Runs the `ravyn serve` command.
pub async fn run_serve(config: RavynConfig) -> Result<(), RavynError> {
    init_tracing(&config.agent.log_level);
    info!(agent = %config.agent.name, "starting ravyn serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    let router = build_router(&config)?;
    let image = build_image(&config);
    let payment: Option<Arc<dyn PaymentAdapter>> = if config.subscription.simulated_payments {
        warn!("subscription.simulated_payments is on: purchases are approved without payment");
        Some(Arc::new(SimulatedPayment))
    } else {
        None
    };

    let channel = Arc::new(TelegramChannel::new(&config.telegram)?);
    if let Err(e) = channel.register_webhook(&config.telegram).await {
        // Telegram keeps the previous registration; serving still works.
        warn!(error = %e, "webhook registration failed");
    }

    let engine = Arc::new(DispatchEngine::new(
        &config,
        Adapters {
            storage: Arc::clone(&storage),
            router,
            channel,
            image,
            payment,
        },
    )?);
    engine.restore_settings().await?;
    recording::register_metrics();

    let cancel = install_signal_handler();
    let bonus = tokio::spawn(run_bonus_task(Arc::clone(&engine), cancel.clone()));

    let state = WebhookState::new(Arc::clone(&engine), config.telegram.webhook_secret.as_deref());
    let served = ravyn_telegram::serve(&config.telegram, state, cancel.clone()).await;

    // A bind failure returns before any signal; stop the bonus task too.
    cancel.cancel();
    if let Err(e) = bonus.await {
        error!(error = %e, "bonus task panicked");
    }
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    served?;
    info!("ravyn stopped");
    Ok(())
}

/// Builds every enabled provider. Providers that cannot start (usually a
/// missing API key) are skipped, except the default one.
fn build_router(config: &RavynConfig) -> Result<ProviderRouter, RavynError> {
    let providers_config = &config.providers;
    let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

    for (name, entry) in providers_config.entries() {
        if !entry.enabled {
            continue;
        }
        let built: Result<Arc<dyn ProviderAdapter>, RavynError> = match name {
            "gpt" => OpenAiChatProvider::gpt(providers_config).map(|p| Arc::new(p) as _),
            "mistral" => OpenAiChatProvider::mistral(providers_config).map(|p| Arc::new(p) as _),
            "claude" => AnthropicProvider::new(providers_config).map(|p| Arc::new(p) as _),
            other => Err(RavynError::Config(format!("no adapter for provider `{other}`"))),
        };
        match built {
            Ok(provider) => providers.push(provider),
            Err(e) if name == providers_config.default => return Err(e),
            Err(e) => warn!(provider = name, error = %e, "provider disabled"),
        }
    }

    let fallback = providers
        .iter()
        .find(|p| p.name() == providers_config.default)
        .cloned()
        .ok_or_else(|| {
            RavynError::Config(format!(
                "default provider `{}` is not available",
                providers_config.default
            ))
        })?;

    let mut router = ProviderRouter::from_config(fallback, providers_config);
    for provider in providers {
        router.register(provider);
    }
    info!(providers = ?router.provider_names(), "provider router ready");
    Ok(router)
}

fn build_image(config: &RavynConfig) -> Option<Arc<dyn ImageAdapter>> {
    if !config.image.enabled {
        info!("image generation disabled");
        return None;
    }
    match DalleImageAdapter::new(&config.image, &config.providers) {
        Ok(adapter) => Some(Arc::new(adapter)),
        Err(e) => {
            warn!(error = %e, "image generation unavailable");
            None
        }
    }
}

/// `RUST_LOG` overrides `agent.log_level` when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ravyn={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys() -> RavynConfig {
        let mut config = RavynConfig::default();
        config.providers.openai.api_key = Some("sk-test".into());
        config.providers.anthropic.api_key = Some("sk-ant-test".into());
        config.providers.mistral.api_key = Some("mistral-test".into());
        config
    }

    #[test]
    fn router_registers_every_enabled_provider() {
        let router = build_router(&config_with_keys()).unwrap();
        assert_eq!(router.provider_names(), vec!["claude", "gpt", "mistral"]);
        assert_eq!(router.fallback_name(), "gpt");
        assert_eq!(router.current_model("gpt").as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn disabled_providers_are_skipped() {
        let mut config = config_with_keys();
        config.providers.mistral.enabled = false;
        let router = build_router(&config).unwrap();
        assert!(!router.contains("mistral"));
        assert!(router.contains("claude"));
    }

    #[test]
    fn image_adapter_follows_config() {
        let mut config = config_with_keys();
        assert!(build_image(&config).is_some());
        config.image.enabled = false;
        assert!(build_image(&config).is_none());
    }
}
