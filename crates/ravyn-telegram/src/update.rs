// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook update decoding.
//!
//! Only the fields the gateway reads are modelled; everything else in the
//! Bot API payload is ignored by serde.

use ravyn_core::{CallbackAction, EventKind, InboundEvent, UserId};
use serde::Deserialize;
use tracing::debug;

/// A Bot API `Update`, reduced to message and callback-query payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The message carrying the pressed button, when still accessible.
    #[serde(default)]
    pub message: Option<CallbackMessage>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMessage {
    pub chat: Chat,
}

impl Update {
    /// Normalizes the update into an [`InboundEvent`].
    ///
    /// Returns `None` for updates the gateway does not act on: non-text
    /// messages, messages without a sender, and other update kinds.
    pub fn into_event(self) -> Option<InboundEvent> {
        let update_id = Some(self.update_id);

        if let Some(message) = self.message {
            let Some(from) = message.from else {
                debug!(update_id = self.update_id, "ignoring message without sender");
                return None;
            };
            let Some(text) = message.text else {
                debug!(update_id = self.update_id, "ignoring non-text message");
                return None;
            };
            return Some(InboundEvent {
                update_id,
                user_id: UserId(from.id),
                chat_id: message.chat.id,
                username: from.username,
                kind: EventKind::from_text(&text),
            });
        }

        if let Some(query) = self.callback_query {
            let chat_id = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(query.from.id);
            let action = CallbackAction::parse(query.data.as_deref().unwrap_or_default());
            return Some(InboundEvent {
                update_id,
                user_id: UserId(query.from.id),
                chat_id,
                username: query.from.username,
                kind: EventKind::Callback {
                    query_id: query.id,
                    action,
                },
            });
        }

        debug!(update_id = self.update_id, "ignoring unsupported update kind");
        None
    }
}
