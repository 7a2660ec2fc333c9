// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter that captures outbound directives.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ravyn_core::{
    AdapterType, ChannelAdapter, HealthStatus, Outbound, PluginAdapter, RavynError,
};

/// Captures everything the engine asks the transport to deliver.
///
/// Chats registered with [`MockChannel::fail_for`] reject sends, which
/// lets broadcast tests count partial delivery.
pub struct MockChannel {
    sent: Arc<Mutex<Vec<Outbound>>>,
    unreachable: Arc<Mutex<HashSet<i64>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            unreachable: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn fail_for(&self, chat_id: i64) {
        self.unreachable.lock().await.insert(chat_id);
    }

    pub async fn sent_messages(&self) -> Vec<Outbound> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Message bodies sent to one chat, in order.
    pub async fn texts_for(&self, chat: i64) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|outbound| match outbound {
                Outbound::Message { chat_id, text, .. } if *chat_id == chat => Some(text.clone()),
                Outbound::Artifact {
                    chat_id, caption, ..
                } if *chat_id == chat => Some(caption.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn send(&self, outbound: &Outbound) -> Result<(), RavynError> {
        let chat_id = match outbound {
            Outbound::Message { chat_id, .. } | Outbound::Artifact { chat_id, .. } => {
                Some(*chat_id)
            }
            Outbound::CallbackAnswer { .. } => None,
        };
        if let Some(chat_id) = chat_id {
            if self.unreachable.lock().await.contains(&chat_id) {
                return Err(RavynError::Channel {
                    message: format!("chat {chat_id} unreachable"),
                    source: None,
                });
            }
        }
        self.sent.lock().await.push(outbound.clone());
        Ok(())
    }
}
