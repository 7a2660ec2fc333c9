// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the stores, the providers, and the dispatch engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform-assigned user identifier. Immutable for the life of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(UserId)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in a registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    Image,
    Storage,
    Payment,
}

/// Speaker of a conversation entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of conversation memory. Entries come in user/assistant pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationExchange {
    pub role: Role,
    pub content: String,
}

impl ConversationExchange {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Kind of a logged interaction. Billable kinds have an entry in the cost table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// A chat turn answered by a text provider.
    Chat,
    /// A generated image.
    Image,
    /// A higher-quality render of an earlier image.
    Upscale,
    /// A new image derived from an earlier one plus a follow-up prompt.
    Variation,
    /// Tokens bought through a subscription tier.
    Purchase,
    /// Monthly subscriber bonus.
    Bonus,
    /// Thumbs up/down on a response.
    Feedback,
}

impl InteractionKind {
    /// Kinds that debit the ledger when performed.
    pub const BILLABLE: [InteractionKind; 4] = [
        InteractionKind::Chat,
        InteractionKind::Image,
        InteractionKind::Upscale,
        InteractionKind::Variation,
    ];

    pub fn is_billable(self) -> bool {
        Self::BILLABLE.contains(&self)
    }
}

/// Per-user image preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePreferences {
    pub style: String,
    pub size: String,
    pub quality: String,
}

/// Active subscription attached to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub tier: String,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_bonus_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Instant the next monthly bonus becomes due.
    pub fn next_bonus_at(&self, period: chrono::Duration) -> DateTime<Utc> {
        self.last_bonus_at.unwrap_or(self.started_at) + period
    }
}

/// A user account as held by the store.
///
/// The balance is never negative: every debit is a conditional update
/// applied by the store in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub username: Option<String>,
    pub language: String,
    pub tokens: i64,
    pub preferred_provider: String,
    pub memory_enabled: bool,
    pub is_banned: bool,
    pub image: ImagePreferences,
    pub subscription: Option<Subscription>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl UserAccount {
    pub fn is_premium(&self) -> bool {
        self.subscription.is_some()
    }
}

/// Values used when an unseen identifier is first stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub user_id: UserId,
    pub username: Option<String>,
    pub starting_balance: i64,
    pub preferred_provider: String,
    pub memory_enabled: bool,
    pub image: ImagePreferences,
}

/// Single-field preference mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preference {
    Provider(String),
    Language(String),
    ImageStyle(String),
    MemoryEnabled(bool),
}

/// Append-only audit record of one interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub id: String,
    pub user_id: UserId,
    pub kind: InteractionKind,
    /// Provider or model identifier that served the interaction.
    pub model: String,
    pub tokens: i64,
    pub created_at: DateTime<Utc>,
}

/// Aggregates over a single user's interaction log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_interactions: i64,
    pub total_tokens: i64,
    pub by_model: BTreeMap<String, i64>,
    pub by_kind: BTreeMap<String, i64>,
}

/// Aggregates across every account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_users: i64,
    pub active_today: i64,
    pub total_interactions: i64,
    pub total_tokens: i64,
    pub by_model: BTreeMap<String, i64>,
    pub by_kind: BTreeMap<String, i64>,
}

/// A generated image kept so later callbacks can refer to it by a short id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub user_id: UserId,
    pub prompt: String,
    pub style: Option<String>,
    /// URL or path of the rendered image.
    pub location: String,
    pub created_at: DateTime<Utc>,
}

/// Options for a single image render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOptions {
    pub style: Option<String>,
    pub size: String,
    pub quality: String,
}

/// A rendered image returned by an image adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub location: String,
    /// The prompt actually sent upstream, after style decoration.
    pub prompt: String,
    pub model: String,
}

/// Formats a timestamp the way every table stores it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
