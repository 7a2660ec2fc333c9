// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch testing.
//!
//! `TestHarness` assembles a complete [`DispatchEngine`] over a temp SQLite
//! database (wrapped so tests can simulate outages) with mock providers, a mock image backend, a mock payment
//! adapter and a capturing channel. Events are built with the same
//! normalization the Telegram transport uses.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use ravyn_agent::{Adapters, Dispatch, DispatchEngine, DispatchOutcome};
use ravyn_config::model::{RavynConfig, StorageConfig};
use ravyn_core::{
    CallbackAction, ChannelAdapter, EventKind, ImageAdapter, InboundEvent, PaymentAdapter,
    PluginAdapter, ProviderAdapter, RavynError, StorageAdapter, UserAccount, UserId,
};
use ravyn_router::ProviderRouter;
use ravyn_storage::SqliteStorage;

use crate::faulty_storage::FaultyStorage;
use crate::mock_channel::MockChannel;
use crate::mock_image::MockImage;
use crate::mock_payment::MockPayment;
use crate::mock_provider::MockProvider;

/// Username the harness config treats as the admin.
pub const ADMIN_USERNAME: &str = "MLBOR";
/// User id used by [`TestHarness::admin`].
pub const ADMIN_USER_ID: i64 = 900_000;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: RavynConfig,
    responses: Vec<String>,
    provider_delay: Option<Duration>,
    image: bool,
    payment: Option<bool>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = RavynConfig::default();
        config.agent.admin_username = Some(ADMIN_USERNAME.to_string());
        // Generous by default so only tests that care about limits hit them.
        config.limits.max_requests = 1_000;
        Self {
            config,
            responses: Vec::new(),
            provider_delay: None,
            image: true,
            payment: Some(true),
        }
    }

    /// Queue responses for the default provider.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Adjust the configuration before the engine is built.
    pub fn with_config(mut self, tweak: impl FnOnce(&mut RavynConfig)) -> Self {
        tweak(&mut self.config);
        self
    }

    pub fn with_starting_balance(mut self, balance: i64) -> Self {
        self.config.ledger.starting_balance = balance;
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.config.limits.max_requests = max_requests;
        self.config.limits.window_secs = window_secs;
        self
    }

    /// Delay every default-provider answer.
    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = Some(delay);
        self
    }

    pub fn without_image(mut self) -> Self {
        self.image = false;
        self
    }

    /// Payment adapter that approves (`true`) or declines (`false`).
    pub fn with_payment(mut self, approve: bool) -> Self {
        self.payment = Some(approve);
        self
    }

    pub fn without_payment(mut self) -> Self {
        self.payment = None;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, RavynError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| RavynError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let sqlite = SqliteStorage::new(config.storage.clone());
        sqlite.initialize().await?;
        let faults = Arc::new(FaultyStorage::new(Arc::new(sqlite)));
        let storage: Arc<dyn StorageAdapter> = faults.clone();

        let mut mocks = Vec::new();
        for (name, entry) in config.providers.entries() {
            let models: Vec<&str> = entry.models.iter().map(String::as_str).collect();
            let mut provider = MockProvider::named(name, &models);
            if name == config.providers.default {
                provider = provider.with_responses(self.responses.clone());
                if let Some(delay) = self.provider_delay {
                    provider.set_delay(delay);
                }
            }
            mocks.push(Arc::new(provider));
        }
        let provider = mocks
            .iter()
            .find(|p| p.name() == config.providers.default)
            .cloned()
            .ok_or_else(|| {
                RavynError::Config(format!(
                    "default provider {} has no entry",
                    config.providers.default
                ))
            })?;

        let fallback: Arc<dyn ProviderAdapter> = provider.clone();
        let mut router = ProviderRouter::from_config(fallback, &config.providers);
        for mock in &mocks {
            router.register(mock.clone() as Arc<dyn ProviderAdapter>);
        }

        let channel = Arc::new(MockChannel::new());
        let image = Arc::new(MockImage::new());
        let payment = Arc::new(MockPayment::new(self.payment.unwrap_or(false)));

        let engine = DispatchEngine::new(
            &config,
            Adapters {
                storage: Arc::clone(&storage),
                router,
                channel: channel.clone() as Arc<dyn ChannelAdapter>,
                image: self
                    .image
                    .then(|| image.clone() as Arc<dyn ImageAdapter>),
                payment: self
                    .payment
                    .map(|_| payment.clone() as Arc<dyn PaymentAdapter>),
            },
        )?;

        Ok(TestHarness {
            engine: Arc::new(engine),
            provider,
            providers: mocks,
            image,
            payment,
            channel,
            storage,
            faults,
            config,
            next_update: AtomicI64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub engine: Arc<DispatchEngine>,
    /// The default provider.
    pub provider: Arc<MockProvider>,
    /// Every registered provider, default included.
    pub providers: Vec<Arc<MockProvider>>,
    pub image: Arc<MockImage>,
    pub payment: Arc<MockPayment>,
    /// Receives broadcasts, bonus notices and anything sent via [`TestHarness::deliver`].
    pub channel: Arc<MockChannel>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    /// The same store as `storage`; breaks chosen operations on demand.
    pub faults: Arc<FaultyStorage>,
    pub config: RavynConfig,
    next_update: AtomicI64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Mock registered under `name`.
    pub fn provider_named(&self, name: &str) -> Option<&Arc<MockProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// A private-chat event from `user_id` with a fresh update id.
    pub fn event(&self, user_id: i64, kind: EventKind) -> InboundEvent {
        InboundEvent {
            update_id: Some(self.next_update.fetch_add(1, Ordering::SeqCst)),
            user_id: UserId(user_id),
            chat_id: user_id,
            username: Some(format!("user{user_id}")),
            kind,
        }
    }

    /// A message event; slash commands are parsed the way the transport does.
    pub fn message(&self, user_id: i64, text: &str) -> InboundEvent {
        self.event(user_id, EventKind::from_text(text))
    }

    pub fn button(&self, user_id: i64, data: &str) -> InboundEvent {
        let update_id = self.next_update.load(Ordering::SeqCst);
        self.event(
            user_id,
            EventKind::Callback {
                query_id: format!("q{update_id}"),
                action: CallbackAction::parse(data),
            },
        )
    }

    /// Sends a message and returns what the engine would reply.
    pub async fn send(&self, user_id: i64, text: &str) -> Result<Dispatch, RavynError> {
        self.engine.handle(&self.message(user_id, text)).await
    }

    /// Presses a button and returns what the engine would reply.
    pub async fn press(&self, user_id: i64, data: &str) -> Result<Dispatch, RavynError> {
        self.engine.handle(&self.button(user_id, data)).await
    }

    /// Sends a message as the configured admin.
    pub async fn admin(&self, text: &str) -> Result<Dispatch, RavynError> {
        let mut event = self.message(ADMIN_USER_ID, text);
        event.username = Some(ADMIN_USERNAME.to_string());
        self.engine.handle(&event).await
    }

    /// Presses a button as the configured admin.
    pub async fn admin_press(&self, data: &str) -> Result<Dispatch, RavynError> {
        let mut event = self.button(ADMIN_USER_ID, data);
        event.username = Some(ADMIN_USERNAME.to_string());
        self.engine.handle(&event).await
    }

    /// Dispatches through the channel, as the webhook does.
    pub async fn deliver(&self, event: &InboundEvent) -> Result<DispatchOutcome, RavynError> {
        self.engine.dispatch(event).await
    }

    pub async fn balance(&self, user_id: i64) -> Result<Option<i64>, RavynError> {
        self.storage.balance(UserId(user_id)).await
    }

    pub async fn user(&self, user_id: i64) -> Result<Option<UserAccount>, RavynError> {
        self.storage.get_user(UserId(user_id)).await
    }

    /// Creates the account by sending `/start`.
    pub async fn register(&self, user_id: i64) -> Result<(), RavynError> {
        self.send(user_id, "/start").await.map(|_| ())
    }

    /// Add a response to the default provider's queue.
    pub async fn add_provider_response(&self, text: impl Into<String>) {
        self.provider.add_response(text).await;
    }
}
