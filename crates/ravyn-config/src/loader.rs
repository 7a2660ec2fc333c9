// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ravyn.toml` > `~/.config/ravyn/ravyn.toml` > `/etc/ravyn/ravyn.toml`
//! with environment variable overrides via `RAVYN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RavynConfig;

/// Top-level sections, used to turn `RAVYN_<SECTION>_<KEY>` into `section.key`.
const SECTIONS: &[&str] = &[
    "agent",
    "telegram",
    "storage",
    "limits",
    "ledger",
    "memory",
    "session",
    "providers",
    "image",
    "subscription",
];

/// Provider sub-tables under `[providers]`.
const PROVIDER_TABLES: &[&str] = &["openai", "anthropic", "mistral"];

/// Paths searched for config files, lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/ravyn/ravyn.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("ravyn/ravyn.toml"));
    }
    paths.push(PathBuf::from("ravyn.toml"));
    paths
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ravyn/ravyn.toml` (system-wide)
/// 3. `~/.config/ravyn/ravyn.toml` (user XDG config)
/// 4. `./ravyn.toml` (local directory)
/// 5. `RAVYN_*` environment variables
pub fn load_config() -> Result<RavynConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RavynConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RavynConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RavynConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RavynConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the standard lookup, before extraction.
pub fn build_figment() -> Figment {
    config_file_paths().into_iter().fold(
        Figment::new().merge(Serialized::defaults(RavynConfig::default())),
        |figment, path| figment.merge(Toml::file(path)),
    )
    .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Splitting on `_` would turn `RAVYN_TELEGRAM_BOT_TOKEN` into
/// `telegram.bot.token`; only the section (and provider table) separators
/// become dots.
fn env_provider() -> Env {
    Env::prefixed("RAVYN_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a config key path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        else {
            continue;
        };
        if *section == "providers" {
            for table in PROVIDER_TABLES {
                if let Some(field) = rest.strip_prefix(table).and_then(|r| r.strip_prefix('_')) {
                    return format!("providers.{table}.{field}");
                }
            }
        }
        return format!("{section}.{rest}");
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_section_boundaries() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("limits_max_requests"), "limits.max_requests");
        assert_eq!(
            map_env_key("providers_openai_api_key"),
            "providers.openai.api_key"
        );
        assert_eq!(map_env_key("providers_timeout_secs"), "providers.timeout_secs");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let paths = config_file_paths();
        assert_eq!(paths.first().unwrap(), Path::new("/etc/ravyn/ravyn.toml"));
        assert_eq!(paths.last().unwrap(), Path::new("ravyn.toml"));
    }
}
