// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde attributes cannot express. All failures are
//! collected rather than stopping at the first.

use std::collections::HashSet;
use std::str::FromStr;

use ravyn_core::InteractionKind;

use crate::diagnostic::ConfigError;
use crate::model::RavynConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &RavynConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let addr = config.telegram.bind_address.trim();
    let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !addr.is_empty()
        && addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
    if !is_valid_ip && !is_valid_hostname {
        errors.push(ConfigError::validation(format!(
            "telegram.bind_address `{addr}` is not a valid IP address or hostname"
        )));
    }

    if !config.telegram.webhook_path.starts_with('/') {
        errors.push(ConfigError::validation(format!(
            "telegram.webhook_path must start with `/`, got `{}`",
            config.telegram.webhook_path
        )));
    }

    if config.limits.max_requests == 0 {
        errors.push(ConfigError::validation(
            "limits.max_requests must be at least 1",
        ));
    }
    if config.limits.window_secs == 0 {
        errors.push(ConfigError::validation(
            "limits.window_secs must be at least 1",
        ));
    }

    if config.ledger.starting_balance < 0 {
        errors.push(ConfigError::validation(format!(
            "ledger.starting_balance must be non-negative, got {}",
            config.ledger.starting_balance
        )));
    }
    for (kind, cost) in &config.ledger.costs {
        match InteractionKind::from_str(kind) {
            Ok(k) if k.is_billable() => {}
            _ => errors.push(ConfigError::validation(format!(
                "ledger.costs.{kind} is not a billable interaction kind (chat, image, upscale, variation)"
            ))),
        }
        if *cost < 0 {
            errors.push(ConfigError::validation(format!(
                "ledger.costs.{kind} must be non-negative, got {cost}"
            )));
        }
    }

    let cap = config.memory.max_entries;
    if cap < 2 || cap % 2 != 0 {
        errors.push(ConfigError::validation(format!(
            "memory.max_entries must be an even number of at least 2, got {cap}"
        )));
    }

    if config.session.pending_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "session.pending_ttl_secs must be at least 1",
        ));
    }

    let providers = &config.providers;
    if providers.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "providers.timeout_secs must be at least 1",
        ));
    }
    if !(0.0..=2.0).contains(&providers.temperature) {
        errors.push(ConfigError::validation(format!(
            "providers.temperature must be within 0.0..=2.0, got {}",
            providers.temperature
        )));
    }
    let mut any_enabled = false;
    for (name, entry) in providers.entries() {
        if !entry.enabled {
            continue;
        }
        any_enabled = true;
        if !entry.models.contains(&entry.default_model) {
            errors.push(ConfigError::validation(format!(
                "default model `{}` of provider `{name}` is not in its models list",
                entry.default_model
            )));
        }
        if entry.base_url.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "base_url of provider `{name}` must not be empty"
            )));
        }
    }
    if !any_enabled {
        errors.push(ConfigError::validation(
            "at least one provider must be enabled",
        ));
    }
    let default_known = providers
        .entries()
        .iter()
        .any(|(name, entry)| *name == providers.default && entry.enabled);
    if !default_known {
        errors.push(ConfigError::validation(format!(
            "providers.default `{}` is not an enabled provider (gpt, claude, mistral)",
            providers.default
        )));
    }

    if config.image.enabled && !config.image.models.contains(&config.image.model) {
        errors.push(ConfigError::validation(format!(
            "image.model `{}` is not in image.models",
            config.image.model
        )));
    }

    if config.subscription.period_days < 1 {
        errors.push(ConfigError::validation(format!(
            "subscription.period_days must be at least 1, got {}",
            config.subscription.period_days
        )));
    }
    let mut seen_tiers = HashSet::new();
    for tier in &config.subscription.tiers {
        if !seen_tiers.insert(tier.id.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate subscription tier id `{}`",
                tier.id
            )));
        }
        if tier.id.is_empty() || tier.id.contains(char::is_whitespace) {
            errors.push(ConfigError::validation(format!(
                "subscription tier id `{}` must be a non-empty word",
                tier.id
            )));
        }
        if tier.tokens < 0 || tier.monthly_bonus < 0 {
            errors.push(ConfigError::validation(format!(
                "subscription tier `{}` must not grant negative tokens",
                tier.id
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
