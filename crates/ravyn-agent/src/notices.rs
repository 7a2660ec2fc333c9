// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing texts and the inline keyboards attached to them.

use std::collections::BTreeMap;

use ravyn_core::types::{GlobalStats, UserStats};
use ravyn_core::{Button, CallbackAction, Keyboard, MenuTarget, UserAccount};

pub const WELCOME: &str = "👋 Welcome! I can chat with several AI models and generate images.\n\n\
Just send me a message to start a conversation, or use /image <description> to create a picture. \
Use the buttons below to pick a model, adjust your settings or check your balance.";

pub const HELP: &str = "ℹ️ Available commands\n\n\
/start - Show the main menu\n\
/help - Show this help\n\
/settings - Language, model, memory and image style\n\
/balance - Show your token balance\n\
/models - Choose an AI model\n\
/language - Choose your language\n\
/subscribe - Buy tokens\n\
/usage - Show your token usage\n\
/image <description> - Generate an image\n\
/memory - Turn conversation memory on or off\n\
/reset - Clear conversation memory";

pub const RATE_LIMITED: &str =
    "⏳ You're sending requests too quickly. Please wait a moment and try again.";
pub const NO_TOKENS: &str =
    "🪙 You don't have enough tokens for this. Subscribe to get more tokens.";
pub const BANNED: &str = "🚫 Your account has been suspended.";
pub const NOT_AUTHORIZED: &str = "You are not authorized to use admin commands.";
pub const IMAGES_DISABLED: &str = "Image generation is currently disabled.";
pub const ARTIFACT_MISSING: &str = "That image is no longer available. Generate a new one with /image.";
pub const VARIATION_PROMPT: &str =
    "🎨 Describe the changes you want for the variation in your next message.";
pub const MEMORY_CLEARED: &str = "🧹 Conversation memory cleared.";
pub const FEEDBACK_THANKS: &str = "Thanks for your feedback!";
pub const UNKNOWN_ACTION: &str = "This button is no longer supported.";
pub const PAYMENTS_UNAVAILABLE: &str = "Payments are not available right now.";
pub const PAYMENT_DECLINED: &str = "❌ Payment was declined. No tokens were added.";
pub const NO_USAGE: &str = "You have no recorded usage yet.";

pub fn unknown_command(name: &str) -> String {
    format!("Unknown command /{name}. Send /help to see what I can do.")
}

pub fn usage(usage: &str) -> String {
    format!("Usage: {usage}")
}

pub fn memory_state(enabled: bool) -> String {
    if enabled {
        "🧠 Conversation memory enabled.".to_string()
    } else {
        "🧠 Conversation memory disabled. Previous messages will not be used.".to_string()
    }
}

pub fn on_off(enabled: bool) -> &'static str {
    if enabled { "Enabled" } else { "Disabled" }
}

/// Uppercases the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn back_row() -> Vec<Button> {
    vec![Button::new("⬅️ Back", CallbackAction::Menu(MenuTarget::Main))]
}

pub fn main_menu() -> Keyboard {
    vec![
        vec![Button::new("🤖 Models", CallbackAction::Menu(MenuTarget::Models))],
        vec![Button::new("⚙️ Settings", CallbackAction::Menu(MenuTarget::Settings))],
        vec![Button::new("💰 Balance", CallbackAction::Menu(MenuTarget::Balance))],
    ]
}

pub fn subscribe_button() -> Keyboard {
    vec![vec![Button::new("💎 Subscribe", CallbackAction::Subscribe)]]
}

pub fn feedback_buttons() -> Keyboard {
    vec![vec![
        Button::new("👍", CallbackAction::Feedback { positive: true }),
        Button::new("👎", CallbackAction::Feedback { positive: false }),
    ]]
}

pub fn artifact_buttons(artifact_id: &str) -> Keyboard {
    vec![vec![
        Button::new("🔍 Upscale", CallbackAction::Upscale(artifact_id.to_string())),
        Button::new("🔄 Variation", CallbackAction::Variation(artifact_id.to_string())),
    ]]
}

pub fn settings(user: &UserAccount) -> (String, Keyboard) {
    let text = format!(
        "⚙️ Settings\n\n\
         Current settings:\n\
         • Language: {}\n\
         • AI model: {}\n\
         • Memory: {}\n\
         • Default image style: {}",
        user.language.to_uppercase(),
        user.preferred_provider.to_uppercase(),
        on_off(user.memory_enabled),
        capitalize(&user.image.style),
    );
    let keyboard = vec![
        vec![Button::new("🌐 Language", CallbackAction::Menu(MenuTarget::Language))],
        vec![Button::new("🤖 AI model", CallbackAction::Menu(MenuTarget::Models))],
        vec![Button::new("🧠 Memory", CallbackAction::ToggleMemory)],
        vec![Button::new("🎨 Image styles", CallbackAction::Menu(MenuTarget::Styles))],
        back_row(),
    ];
    (text, keyboard)
}

pub fn balance(user: &UserAccount) -> (String, Keyboard) {
    let mut text = format!("💰 Your balance: {} tokens", user.tokens);
    if let Some(subscription) = &user.subscription {
        text.push_str(&format!(
            "\n\nSubscription: {} (until {})",
            capitalize(&subscription.tier),
            subscription.expires_at.format("%Y-%m-%d")
        ));
    }
    let keyboard = vec![
        vec![Button::new("💎 Subscribe", CallbackAction::Subscribe)],
        back_row(),
    ];
    (text, keyboard)
}

/// `providers` pairs each provider name with its selected model.
pub fn models(user: &UserAccount, providers: &[(String, String)]) -> (String, Keyboard) {
    let mut text = format!(
        "🤖 Choose an AI model\n\nCurrent: {}\n",
        user.preferred_provider.to_uppercase()
    );
    let mut keyboard: Keyboard = Vec::with_capacity(providers.len() + 1);
    for (name, model) in providers {
        text.push_str(&format!("\n• {} ({model})", name.to_uppercase()));
        let marker = if *name == user.preferred_provider { "✅ " } else { "" };
        keyboard.push(vec![Button::new(
            format!("{marker}{}", name.to_uppercase()),
            CallbackAction::SelectProvider(name.clone()),
        )]);
    }
    keyboard.push(back_row());
    (text, keyboard)
}

pub fn languages(user: &UserAccount, available: &[String]) -> (String, Keyboard) {
    let text = format!(
        "🌐 Choose your language\n\nCurrent: {}",
        user.language.to_uppercase()
    );
    let mut keyboard: Keyboard = available
        .iter()
        .map(|code| {
            vec![Button::new(
                code.to_uppercase(),
                CallbackAction::SelectLanguage(code.clone()),
            )]
        })
        .collect();
    keyboard.push(back_row());
    (text, keyboard)
}

pub fn styles(user: &UserAccount, available: &[String]) -> (String, Keyboard) {
    let text = format!(
        "🎨 Choose a default image style\n\nCurrent: {}",
        capitalize(&user.image.style)
    );
    let mut keyboard: Keyboard = available
        .iter()
        .map(|style| {
            vec![Button::new(
                capitalize(style),
                CallbackAction::SelectStyle(style.clone()),
            )]
        })
        .collect();
    keyboard.push(back_row());
    (text, keyboard)
}

fn push_breakdown(text: &mut String, by_model: &BTreeMap<String, i64>, by_kind: &BTreeMap<String, i64>) {
    if !by_model.is_empty() {
        text.push_str("\nBy model:\n");
        for (model, count) in by_model {
            text.push_str(&format!("- {}: {count}\n", model.to_uppercase()));
        }
    }
    if !by_kind.is_empty() {
        text.push_str("\nBy type:\n");
        for (kind, count) in by_kind {
            text.push_str(&format!("- {}: {count}\n", capitalize(kind)));
        }
    }
}

pub fn user_stats(stats: &UserStats) -> String {
    let mut text = format!(
        "Total interactions: {}\nTotal tokens used: {}\n",
        stats.total_interactions, stats.total_tokens
    );
    push_breakdown(&mut text, &stats.by_model, &stats.by_kind);
    text
}

pub fn global_stats(stats: &GlobalStats) -> String {
    let mut text = format!(
        "📊 Global Statistics\n\n\
         Total users: {}\n\
         Active users (today): {}\n\
         Total interactions: {}\n\
         Total tokens used: {}\n",
        stats.total_users, stats.active_today, stats.total_interactions, stats.total_tokens
    );
    push_breakdown(&mut text, &stats.by_model, &stats.by_kind);
    text
}
