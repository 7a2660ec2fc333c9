// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ravyn dispatch gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Ravyn configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RavynConfig {
    /// Gateway identity, logging, and admin identity.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot and webhook settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-user rate limiting.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Starting balance and per-interaction token costs.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Conversation memory window.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Pending-session and replay-guard lifetimes.
    #[serde(default)]
    pub session: SessionConfig,

    /// Text providers and routing.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Image generation.
    #[serde(default)]
    pub image: ImageConfig,

    /// Subscription tiers and monthly bonus.
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// Gateway identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in greetings and system prompts.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Platform username allowed to use admin commands and callbacks.
    #[serde(default = "default_admin_username")]
    pub admin_username: Option<String>,

    /// Language codes offered in the language menu.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            admin_username: default_admin_username(),
            languages: default_languages(),
        }
    }
}

fn default_agent_name() -> String {
    "ravyn".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_admin_username() -> Option<String> {
    Some("MLBOR".to_string())
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "ar".to_string()]
}

/// Telegram bot and webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required to serve.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Path the webhook listens on.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Expected `X-Telegram-Bot-Api-Secret-Token` header. `None` disables the check.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Address to bind the webhook server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to bind the webhook server to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public HTTPS base URL registered with Telegram on startup, if set.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            webhook_path: default_webhook_path(),
            webhook_secret: None,
            bind_address: default_bind_address(),
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8443
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ravyn").join("ravyn.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ravyn.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Sliding-window rate limit applied to billable events.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Requests admitted per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

/// Token ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Balance granted to a newly seen user.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,

    /// Token cost per billable interaction kind (`chat`, `image`, `upscale`, `variation`).
    /// Kinds left out fall back to built-in defaults.
    #[serde(default = "default_costs")]
    pub costs: BTreeMap<String, i64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            costs: default_costs(),
        }
    }
}

fn default_starting_balance() -> i64 {
    5
}

fn default_costs() -> BTreeMap<String, i64> {
    BTreeMap::from([
        ("chat".to_string(), 1),
        ("image".to_string(), 3),
        ("upscale".to_string(), 2),
        ("variation".to_string(), 3),
    ])
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Maximum stored entries per user. Must be even (entries come in pairs).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Memory flag for new accounts.
    #[serde(default = "default_enabled_by_default")]
    pub enabled_by_default: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            enabled_by_default: default_enabled_by_default(),
        }
    }
}

fn default_max_entries() -> usize {
    20
}

fn default_enabled_by_default() -> bool {
    true
}

/// Lifetimes of short-lived per-user state.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Seconds a pending follow-up action stays valid.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,

    /// Seconds a seen update id is remembered for duplicate suppression.
    #[serde(default = "default_replay_ttl_secs")]
    pub replay_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl_secs(),
            replay_ttl_secs: default_replay_ttl_secs(),
        }
    }
}

fn default_pending_ttl_secs() -> u64 {
    300
}

fn default_replay_ttl_secs() -> u64 {
    600
}

/// Text provider settings shared by all providers plus one entry per provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Provider used for new accounts and for unrecognized selections.
    #[serde(default = "default_provider")]
    pub default: String,

    /// Hard per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum tokens generated per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Reply sent when a provider fails or times out.
    #[serde(default = "default_apology")]
    pub apology: String,

    #[serde(default = "default_openai")]
    pub openai: ProviderEntry,

    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderEntry,

    #[serde(default = "default_mistral")]
    pub mistral: ProviderEntry,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            apology: default_apology(),
            openai: default_openai(),
            anthropic: default_anthropic(),
            mistral: default_mistral(),
        }
    }
}

impl ProvidersConfig {
    /// Entries keyed by the routing name users select.
    pub fn entries(&self) -> [(&'static str, &ProviderEntry); 3] {
        [
            ("gpt", &self.openai),
            ("claude", &self.anthropic),
            ("mistral", &self.mistral),
        ]
    }
}

fn default_provider() -> String {
    "gpt".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_apology() -> String {
    "Sorry, I encountered an error while processing your request. Please try again later."
        .to_string()
}

/// Connection and model settings for one provider.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    /// Whether the provider is registered at startup.
    #[serde(default)]
    pub enabled: bool,

    /// API key. Falls back to the provider's conventional env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the API, without the endpoint path.
    #[serde(default)]
    pub base_url: String,

    /// Model used until an admin selects another one.
    #[serde(default)]
    pub default_model: String,

    /// Allow-list of selectable models.
    #[serde(default)]
    pub models: Vec<String>,

    /// System prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// API version header (Anthropic only).
    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_openai() -> ProviderEntry {
    ProviderEntry {
        enabled: true,
        api_key: None,
        base_url: "https://api.openai.com/v1".to_string(),
        default_model: "gpt-4o".to_string(),
        models: vec![
            "gpt-4o".to_string(),
            "gpt-4-turbo".to_string(),
            "gpt-3.5-turbo".to_string(),
        ],
        system_prompt: None,
        api_version: None,
    }
}

fn default_anthropic() -> ProviderEntry {
    ProviderEntry {
        enabled: true,
        api_key: None,
        base_url: "https://api.anthropic.com/v1".to_string(),
        default_model: "claude-3-opus-20240229".to_string(),
        models: vec![
            "claude-3-opus-20240229".to_string(),
            "claude-3-sonnet-20240229".to_string(),
            "claude-3-haiku-20240307".to_string(),
        ],
        system_prompt: None,
        api_version: Some("2023-06-01".to_string()),
    }
}

fn default_mistral() -> ProviderEntry {
    ProviderEntry {
        enabled: true,
        api_key: None,
        base_url: "https://api.mistral.ai/v1".to_string(),
        default_model: "mistral-large-latest".to_string(),
        models: vec![
            "mistral-large-latest".to_string(),
            "mistral-medium-latest".to_string(),
            "mistral-small-latest".to_string(),
        ],
        system_prompt: None,
        api_version: None,
    }
}

/// Image generation configuration. Uses the OpenAI provider's credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default = "default_image_enabled")]
    pub enabled: bool,

    #[serde(default = "default_image_model")]
    pub model: String,

    /// Allow-list of image models.
    #[serde(default = "default_image_models")]
    pub models: Vec<String>,

    /// Default render size for new accounts.
    #[serde(default = "default_image_size")]
    pub size: String,

    /// Default render quality for new accounts (`standard` or `hd`).
    #[serde(default = "default_image_quality")]
    pub quality: String,

    /// Default style for new accounts.
    #[serde(default = "default_image_style")]
    pub default_style: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: default_image_enabled(),
            model: default_image_model(),
            models: default_image_models(),
            size: default_image_size(),
            quality: default_image_quality(),
            default_style: default_image_style(),
        }
    }
}

fn default_image_enabled() -> bool {
    true
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_models() -> Vec<String> {
    vec!["dall-e-3".to_string(), "dall-e-2".to_string()]
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_image_quality() -> String {
    "standard".to_string()
}

fn default_image_style() -> String {
    "realistic".to_string()
}

/// Subscription tiers and bonus schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionConfig {
    /// Subscription length and bonus interval in days.
    #[serde(default = "default_period_days")]
    pub period_days: i64,

    /// How often the bonus task scans subscribers, in seconds.
    #[serde(default = "default_bonus_check_interval_secs")]
    pub bonus_check_interval_secs: u64,

    /// Approve every purchase without a payment provider. For demos and staging.
    #[serde(default)]
    pub simulated_payments: bool,

    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierConfig>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            period_days: default_period_days(),
            bonus_check_interval_secs: default_bonus_check_interval_secs(),
            simulated_payments: false,
            tiers: default_tiers(),
        }
    }
}

impl SubscriptionConfig {
    pub fn tier(&self, id: &str) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.id == id)
    }
}

fn default_period_days() -> i64 {
    30
}

fn default_bonus_check_interval_secs() -> u64 {
    3600
}

fn default_tiers() -> Vec<TierConfig> {
    let tier = |id: &str,
                name: &str,
                price: u32,
                tokens: i64,
                monthly_bonus: i64,
                benefits: &[&str]| TierConfig {
        id: id.to_string(),
        name: name.to_string(),
        price,
        tokens,
        monthly_bonus,
        benefits: benefits.iter().map(|b| b.to_string()).collect(),
    };
    vec![
        tier(
            "basic",
            "Basic",
            5,
            50,
            10,
            &["Access to all AI models", "Basic image generation"],
        ),
        tier(
            "standard",
            "Standard",
            10,
            150,
            30,
            &[
                "Access to all AI models",
                "HD image generation",
                "Priority support",
            ],
        ),
        tier(
            "premium",
            "Premium",
            25,
            500,
            100,
            &[
                "Access to all AI models",
                "HD image generation",
                "Priority support",
                "Exclusive features",
            ],
        ),
    ]
}

/// One purchasable tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    /// Identifier used in callback data.
    pub id: String,
    pub name: String,
    pub price: u32,
    /// Tokens credited on purchase.
    pub tokens: i64,
    /// Tokens credited every period while subscribed.
    pub monthly_bonus: i64,
    #[serde(default)]
    pub benefits: Vec<String>,
}
