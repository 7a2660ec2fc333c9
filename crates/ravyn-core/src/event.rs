// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized inbound events and outbound directives.
//!
//! Commands and callback tags are decoded exactly once, here, into closed
//! enums. The dispatch engine matches on them exhaustively and never looks
//! at raw strings again. [`CallbackAction::encode`] is the inverse of
//! [`CallbackAction::parse`] and is the only place button payloads are built.

use strum::{Display, EnumString};

use crate::types::{Artifact, UserId};

/// Usage line for `/add_tokens`.
pub const ADD_TOKENS_USAGE: &str = "/add_tokens <user_id> <amount>";
/// Usage line for `/user_info`.
pub const USER_INFO_USAGE: &str = "/user_info <user_id>";
/// Usage line for `/broadcast`.
pub const BROADCAST_USAGE: &str = "/broadcast <message>";
/// Usage line for `/image`.
pub const IMAGE_USAGE: &str = "/image <description>";
/// Usage line for `/ban`.
pub const BAN_USAGE: &str = "/ban <user_id>";
/// Usage line for `/unban`.
pub const UNBAN_USAGE: &str = "/unban <user_id>";
/// Usage line for `/set_model`.
pub const SET_MODEL_USAGE: &str = "/set_model <provider> <model>";

const ADMIN_COMMANDS: [&str; 6] = ["add_tokens", "user_info", "broadcast", "ban", "unban", "set_model"];

/// An event delivered by the transport, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Transport-level idempotency key, when the transport provides one.
    pub update_id: Option<i64>,
    pub user_id: UserId,
    pub chat_id: i64,
    pub username: Option<String>,
    pub kind: EventKind,
}

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Freeform text.
    Text(String),
    /// A slash command.
    Command(Command),
    /// An inline-button press.
    Callback {
        query_id: String,
        action: CallbackAction,
    },
}

impl EventKind {
    /// Classifies a message body as a command or freeform text.
    pub fn from_text(text: &str) -> Self {
        match Command::parse(text) {
            Some(command) => EventKind::Command(command),
            None => EventKind::Text(text.to_string()),
        }
    }
}

/// Slash commands understood by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Settings,
    Balance,
    Models,
    Language,
    Subscribe,
    Usage,
    Reset,
    Memory,
    Image { prompt: String },
    Admin,
    AddTokens { target: UserId, amount: i64 },
    UserInfo { target: UserId },
    Broadcast { message: String },
    Stats,
    Ban { target: UserId },
    Unban { target: UserId },
    /// Selects the model a provider uses for every user.
    SetModel { provider: String, model: String },
    /// A known command with missing or malformed arguments.
    Invalid { command: String, usage: &'static str },
    /// Anything else starting with `/`.
    Unknown(String),
}

impl Command {
    /// Parses a message starting with `/`. Returns `None` for plain text.
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (word, rest) = match body.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (body, ""),
        };
        let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();

        let invalid = |usage: &'static str| Command::Invalid {
            command: name.clone(),
            usage,
        };

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "settings" => Command::Settings,
            "balance" => Command::Balance,
            "models" => Command::Models,
            "language" => Command::Language,
            "subscribe" => Command::Subscribe,
            "usage" => Command::Usage,
            "reset" => Command::Reset,
            "memory" => Command::Memory,
            "image" if rest.is_empty() => invalid(IMAGE_USAGE),
            "image" => Command::Image {
                prompt: rest.to_string(),
            },
            "admin" => Command::Admin,
            "stats" => Command::Stats,
            "add_tokens" => {
                let mut args = rest.split_whitespace();
                match (
                    args.next().and_then(|a| a.parse::<UserId>().ok()),
                    args.next().and_then(|a| a.parse::<i64>().ok()),
                    args.next(),
                ) {
                    (Some(target), Some(amount), None) if amount > 0 => {
                        Command::AddTokens { target, amount }
                    }
                    _ => invalid(ADD_TOKENS_USAGE),
                }
            }
            "user_info" => match single_user_arg(rest) {
                Some(target) => Command::UserInfo { target },
                None => invalid(USER_INFO_USAGE),
            },
            "ban" => match single_user_arg(rest) {
                Some(target) => Command::Ban { target },
                None => invalid(BAN_USAGE),
            },
            "unban" => match single_user_arg(rest) {
                Some(target) => Command::Unban { target },
                None => invalid(UNBAN_USAGE),
            },
            "set_model" => {
                let mut args = rest.split_whitespace();
                match (args.next(), args.next(), args.next()) {
                    (Some(provider), Some(model), None) => Command::SetModel {
                        provider: provider.to_ascii_lowercase(),
                        model: model.to_string(),
                    },
                    _ => invalid(SET_MODEL_USAGE),
                }
            }
            "broadcast" if rest.is_empty() => invalid(BROADCAST_USAGE),
            "broadcast" => Command::Broadcast {
                message: rest.to_string(),
            },
            _ => Command::Unknown(name.clone()),
        };
        Some(command)
    }

    /// True for commands restricted to the configured admin identity,
    /// including malformed invocations of them.
    pub fn requires_admin(&self) -> bool {
        match self {
            Command::Admin
            | Command::AddTokens { .. }
            | Command::UserInfo { .. }
            | Command::Broadcast { .. }
            | Command::Stats
            | Command::Ban { .. }
            | Command::Unban { .. }
            | Command::SetModel { .. } => true,
            Command::Invalid { command, .. } => ADMIN_COMMANDS.contains(&command.as_str()),
            _ => false,
        }
    }
}

fn single_user_arg(rest: &str) -> Option<UserId> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next()) {
        (Some(id), None) => id.parse().ok(),
        _ => None,
    }
}

/// Navigation targets reachable from inline menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MenuTarget {
    Main,
    Settings,
    Models,
    Balance,
    Styles,
    Language,
}

/// Admin panel actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    Panel,
    Users,
    Tokens,
    Stats,
    Settings,
    Broadcast,
    AddTokens(UserId),
    ToggleBan(UserId),
    SettingTokenCost,
    SettingRateLimit,
    Unknown(String),
}

impl AdminAction {
    fn parse(tag: &str) -> Self {
        if let Some(id) = tag.strip_prefix("add_tokens_") {
            return id
                .parse()
                .map(AdminAction::AddTokens)
                .unwrap_or_else(|_| AdminAction::Unknown(tag.to_string()));
        }
        if let Some(id) = tag.strip_prefix("toggle_ban_") {
            return id
                .parse()
                .map(AdminAction::ToggleBan)
                .unwrap_or_else(|_| AdminAction::Unknown(tag.to_string()));
        }
        match tag {
            "panel" | "back" => AdminAction::Panel,
            "users" => AdminAction::Users,
            "tokens" => AdminAction::Tokens,
            "stats" => AdminAction::Stats,
            "settings" => AdminAction::Settings,
            "broadcast" => AdminAction::Broadcast,
            "setting_token_cost" => AdminAction::SettingTokenCost,
            "setting_rate_limit" => AdminAction::SettingRateLimit,
            other => AdminAction::Unknown(other.to_string()),
        }
    }

    fn encode(&self) -> String {
        match self {
            AdminAction::Panel => "panel".into(),
            AdminAction::Users => "users".into(),
            AdminAction::Tokens => "tokens".into(),
            AdminAction::Stats => "stats".into(),
            AdminAction::Settings => "settings".into(),
            AdminAction::Broadcast => "broadcast".into(),
            AdminAction::AddTokens(id) => format!("add_tokens_{id}"),
            AdminAction::ToggleBan(id) => format!("toggle_ban_{id}"),
            AdminAction::SettingTokenCost => "setting_token_cost".into(),
            AdminAction::SettingRateLimit => "setting_rate_limit".into(),
            AdminAction::Unknown(tag) => tag.clone(),
        }
    }
}

/// Inline-button actions, decoded from callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    SelectProvider(String),
    SelectLanguage(String),
    SelectStyle(String),
    /// Show the subscription tiers.
    Subscribe,
    /// Buy a specific tier.
    BuyTier(String),
    /// Re-render an artifact at higher quality. Billable.
    Upscale(String),
    /// Wait for a follow-up prompt describing a variation of an artifact.
    Variation(String),
    ToggleMemory,
    Menu(MenuTarget),
    Admin(AdminAction),
    Feedback { positive: bool },
    Unknown(String),
}

impl CallbackAction {
    /// Decodes raw callback data.
    pub fn parse(data: &str) -> Self {
        let data = data.trim();
        if data == "subscribe" {
            return CallbackAction::Subscribe;
        }
        if data == "memory_toggle" {
            return CallbackAction::ToggleMemory;
        }
        if data == "back" {
            return CallbackAction::Menu(MenuTarget::Main);
        }
        let Some((prefix, rest)) = data.split_once('_') else {
            return CallbackAction::Unknown(data.to_string());
        };
        if rest.is_empty() {
            return CallbackAction::Unknown(data.to_string());
        }
        match prefix {
            "model" => CallbackAction::SelectProvider(rest.to_string()),
            "lang" => CallbackAction::SelectLanguage(rest.to_string()),
            "style" => CallbackAction::SelectStyle(rest.to_string()),
            "subscribe" => CallbackAction::BuyTier(rest.to_string()),
            "upscale" => CallbackAction::Upscale(rest.to_string()),
            "variation" => CallbackAction::Variation(rest.to_string()),
            "admin" => CallbackAction::Admin(AdminAction::parse(rest)),
            "menu" => rest
                .parse()
                .map(CallbackAction::Menu)
                .unwrap_or_else(|_| CallbackAction::Unknown(data.to_string())),
            "feedback" => match rest {
                "up" => CallbackAction::Feedback { positive: true },
                "down" => CallbackAction::Feedback { positive: false },
                _ => CallbackAction::Unknown(data.to_string()),
            },
            _ => CallbackAction::Unknown(data.to_string()),
        }
    }

    /// Encodes the action as callback data.
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::SelectProvider(p) => format!("model_{p}"),
            CallbackAction::SelectLanguage(l) => format!("lang_{l}"),
            CallbackAction::SelectStyle(s) => format!("style_{s}"),
            CallbackAction::Subscribe => "subscribe".into(),
            CallbackAction::BuyTier(t) => format!("subscribe_{t}"),
            CallbackAction::Upscale(id) => format!("upscale_{id}"),
            CallbackAction::Variation(id) => format!("variation_{id}"),
            CallbackAction::ToggleMemory => "memory_toggle".into(),
            CallbackAction::Menu(target) => format!("menu_{target}"),
            CallbackAction::Admin(action) => format!("admin_{}", action.encode()),
            CallbackAction::Feedback { positive: true } => "feedback_up".into(),
            CallbackAction::Feedback { positive: false } => "feedback_down".into(),
            CallbackAction::Unknown(raw) => raw.clone(),
        }
    }
}

/// An inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

impl Button {
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Rows of inline buttons.
pub type Keyboard = Vec<Vec<Button>>;

/// A directive for the transport to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message {
        chat_id: i64,
        text: String,
        buttons: Keyboard,
    },
    Artifact {
        chat_id: i64,
        artifact: Artifact,
        caption: String,
        buttons: Keyboard,
    },
    CallbackAnswer {
        query_id: String,
        text: Option<String>,
    },
}

impl Outbound {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Outbound::Message {
            chat_id,
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(chat_id: i64, text: impl Into<String>, buttons: Keyboard) -> Self {
        Outbound::Message {
            chat_id,
            text: text.into(),
            buttons,
        }
    }

    /// Text of a message or the caption of an artifact.
    pub fn body(&self) -> Option<&str> {
        match self {
            Outbound::Message { text, .. } => Some(text),
            Outbound::Artifact { caption, .. } => Some(caption),
            Outbound::CallbackAnswer { text, .. } => text.as_deref(),
        }
    }
}
