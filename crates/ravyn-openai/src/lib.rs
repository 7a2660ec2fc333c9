// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible adapters for the Ravyn dispatch gateway.
//!
//! - [`OpenAiChatProvider`] implements
//!   [`ProviderAdapter`](ravyn_core::ProviderAdapter) for the `gpt` and
//!   `mistral` providers.
//! - [`DalleImageAdapter`] implements [`ImageAdapter`](ravyn_core::ImageAdapter)
//!   on the images endpoint.

pub mod chat;
pub mod client;
pub mod image;
pub mod types;

pub use chat::OpenAiChatProvider;
pub use client::OpenAiClient;
pub use image::DalleImageAdapter;

use ravyn_core::RavynError;

/// Resolves an API key from config, then from `env_var`.
pub(crate) fn resolve_api_key(config_key: &Option<String>, env_var: &str) -> Result<String, RavynError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var(env_var).map_err(|_| {
        RavynError::Config(format!(
            "API key not found. Set it in config or the {env_var} environment variable."
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_key_wins() {
        assert_eq!(
            resolve_api_key(&Some("sk-config".into()), "RAVYN_TEST_UNSET_KEY").unwrap(),
            "sk-config"
        );
    }

    #[test]
    fn empty_config_key_falls_back_to_env() {
        let err = resolve_api_key(&Some(String::new()), "RAVYN_TEST_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("RAVYN_TEST_UNSET_KEY"));
    }
}
