// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Ravyn gateway.
//!
//! Decodes webhook updates into [`InboundEvent`](ravyn_core::InboundEvent)s,
//! serves the webhook over axum, and implements [`ChannelAdapter`] on top of
//! teloxide's `Bot` with MarkdownV2 formatting and inline keyboards.

pub mod markdown;
pub mod update;
pub mod webhook;

use async_trait::async_trait;
use ravyn_config::model::TelegramConfig;
use ravyn_core::types::{AdapterType, HealthStatus};
use ravyn_core::{ChannelAdapter, Keyboard, Outbound, PluginAdapter, RavynError};
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use tracing::{debug, info, warn};

pub use update::Update;
pub use webhook::{WebhookState, router, serve};

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, RavynError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            RavynError::Config("telegram.bot_token is required for the Telegram adapter".into())
        })?;
        if token.trim().is_empty() {
            return Err(RavynError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Points Telegram at `{public_url}{webhook_path}`.
    ///
    /// Does nothing when no public URL is configured, e.g. behind a proxy
    /// that registers the webhook itself.
    pub async fn register_webhook(&self, config: &TelegramConfig) -> Result<(), RavynError> {
        let Some(public_url) = config.public_url.as_deref() else {
            info!("telegram.public_url not set, skipping webhook registration");
            return Ok(());
        };
        let url = webhook_url(public_url, &config.webhook_path)?;

        let mut request = self.bot.set_webhook(url.clone());
        if let Some(secret) = &config.webhook_secret {
            request = request.secret_token(secret.clone());
        }
        request
            .await
            .map_err(|e| channel_error("failed to register webhook", e))?;
        info!(url = %url, "telegram webhook registered");
        Ok(())
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &Keyboard,
    ) -> Result<(), RavynError> {
        let escaped = markdown::escape_markdown_v2(text);
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), escaped)
            .parse_mode(ParseMode::MarkdownV2);
        if !buttons.is_empty() {
            request = request.reply_markup(inline_keyboard(buttons));
        }

        match request.await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(chat_id, error = %e, "MarkdownV2 failed, sending as plain text");
                metrics::counter!("ravyn_telegram_markdown_fallbacks_total").increment(1);
                let mut plain = self.bot.send_message(ChatId(chat_id), text);
                if !buttons.is_empty() {
                    plain = plain.reply_markup(inline_keyboard(buttons));
                }
                plain
                    .await
                    .map(|_| ())
                    .map_err(|e| channel_error("failed to send message", e))
            }
        }
    }

    async fn send_artifact(
        &self,
        chat_id: i64,
        location: &str,
        caption: &str,
        buttons: &Keyboard,
    ) -> Result<(), RavynError> {
        let photo = match reqwest::Url::parse(location) {
            Ok(url) => InputFile::url(url),
            Err(_) => InputFile::file(location),
        };
        let mut request = self
            .bot
            .send_photo(ChatId(chat_id), photo)
            .caption(caption);
        if !buttons.is_empty() {
            request = request.reply_markup(inline_keyboard(buttons));
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| channel_error("failed to send photo", e))
    }

    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> Result<(), RavynError> {
        let mut request = self.bot.answer_callback_query(teloxide::types::CallbackQueryId(query_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| channel_error("failed to answer callback query", e))
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        debug!("Telegram channel shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn send(&self, outbound: &Outbound) -> Result<(), RavynError> {
        let result = match outbound {
            Outbound::Message {
                chat_id,
                text,
                buttons,
            } => self.send_message(*chat_id, text, buttons).await,
            Outbound::Artifact {
                chat_id,
                artifact,
                caption,
                buttons,
            } => {
                self.send_artifact(*chat_id, &artifact.location, caption, buttons)
                    .await
            }
            Outbound::CallbackAnswer { query_id, text } => {
                self.answer_callback(query_id, text.as_deref()).await
            }
        };
        if result.is_err() {
            metrics::counter!("ravyn_telegram_send_failures_total").increment(1);
        }
        result
    }
}

/// Renders button rows as an inline keyboard with encoded callback data.
pub fn inline_keyboard(buttons: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(buttons.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.action.encode()))
            .collect::<Vec<_>>()
    }))
}

fn webhook_url(public_url: &str, path: &str) -> Result<reqwest::Url, RavynError> {
    let raw = format!("{}{}", public_url.trim_end_matches('/'), path);
    reqwest::Url::parse(&raw)
        .map_err(|e| RavynError::Config(format!("invalid webhook url {raw}: {e}")))
}

fn channel_error(context: &str, e: RequestError) -> RavynError {
    RavynError::Channel {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravyn_core::{Button, CallbackAction, MenuTarget};
    use teloxide::types::InlineKeyboardButtonKind;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(String::from),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(&config(None)).is_err());
        assert!(TelegramChannel::new(&config(Some("  "))).is_err());
        assert!(TelegramChannel::new(&config(Some("123456:ABC-DEF1234ghIkl"))).is_ok());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let channel = TelegramChannel::new(&config(Some("test:token"))).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }

    #[test]
    fn keyboard_carries_encoded_callback_data() {
        let markup = inline_keyboard(&vec![
            vec![
                Button::new("GPT", CallbackAction::SelectProvider("gpt".into())),
                Button::new("Claude", CallbackAction::SelectProvider("claude".into())),
            ],
            vec![Button::new("Back", CallbackAction::Menu(MenuTarget::Main))],
        ]);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "GPT");
        assert!(matches!(
            &first.kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "model_gpt"
        ));
        assert!(matches!(
            &markup.inline_keyboard[1][0].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "menu_main"
        ));
    }

    #[test]
    fn webhook_url_joins_public_url_and_path() {
        let url = webhook_url("https://bot.example.com/", "/webhook").unwrap();
        assert_eq!(url.as_str(), "https://bot.example.com/webhook");
        assert!(webhook_url("not a url", "/webhook").is_err());
    }
}
