// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch engine: one normalized event in, zero or more directives out.
//!
//! A chat event moves through `Received -> Admitted | RateLimited ->
//! Funded | Unfunded -> Routed -> Responded | Failed`. Tokens are debited
//! before the provider is called and are not refunded when the provider
//! fails; the interaction is logged either way.
//!
//! Admission rejections are outcomes, not errors. An `Err` from
//! [`DispatchEngine::handle`] is always an infrastructure failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ravyn_config::model::{RavynConfig, SubscriptionConfig};
use ravyn_core::types::{ImageOptions, ImagePreferences, NewUser, RenderedImage};
use ravyn_core::{
    Artifact, ChannelAdapter, EventKind, ImageAdapter, InboundEvent, InteractionKind, Outbound,
    PaymentAdapter, RavynError, StorageAdapter, UserAccount, UserId,
};
use ravyn_ledger::{Charge, InteractionRecorder, TokenCostTable, TokenLedger};
use ravyn_memory::ConversationMemory;
use ravyn_router::ProviderRouter;
use tracing::{debug, error, info, warn};

use crate::notices;
use crate::rate_limit::{RateLimit, RateLimiter};
use crate::recording;
use crate::replay::ReplayGuard;
use crate::session::{PendingKind, PendingSession, SessionStore};

/// Settings keys persisted by the admin panel.
pub const SETTING_MAX_REQUESTS: &str = "limits.max_requests";
pub const SETTING_WINDOW_SECS: &str = "limits.window_secs";
pub const SETTING_COST_PREFIX: &str = "costs.";

/// How an inbound event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The update id was already processed.
    Duplicate,
    /// The user is banned.
    Banned,
    RateLimited,
    /// The balance did not cover the cost. Nothing was debited.
    Unfunded {
        kind: InteractionKind,
        cost: i64,
        balance: i64,
    },
    /// A billable interaction completed.
    Responded { kind: InteractionKind, cost: i64 },
    /// A billable interaction was debited but the provider failed.
    Failed { kind: InteractionKind, cost: i64 },
    /// Malformed input, unknown command or callback, or an invalid choice.
    Rejected,
    /// An admin-only action from a non-admin.
    Unauthorized,
    /// A non-billable command or callback completed.
    Handled,
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Duplicate => "duplicate",
            DispatchOutcome::Banned => "banned",
            DispatchOutcome::RateLimited => "rate_limited",
            DispatchOutcome::Unfunded { .. } => "unfunded",
            DispatchOutcome::Responded { .. } => "responded",
            DispatchOutcome::Failed { .. } => "failed",
            DispatchOutcome::Rejected => "rejected",
            DispatchOutcome::Unauthorized => "unauthorized",
            DispatchOutcome::Handled => "handled",
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub outcome: DispatchOutcome,
    /// Directives for the transport, in delivery order.
    pub replies: Vec<Outbound>,
}

impl Dispatch {
    pub fn new(outcome: DispatchOutcome, replies: Vec<Outbound>) -> Self {
        Self { outcome, replies }
    }

    pub fn silent(outcome: DispatchOutcome) -> Self {
        Self::new(outcome, Vec::new())
    }

    pub fn reply(outcome: DispatchOutcome, reply: Outbound) -> Self {
        Self::new(outcome, vec![reply])
    }

    /// Puts a callback acknowledgment in front of the other replies.
    pub(crate) fn acknowledged(mut self, query_id: &str, text: Option<String>) -> Self {
        self.replies.insert(
            0,
            Outbound::CallbackAnswer {
                query_id: query_id.to_string(),
                text,
            },
        );
        self
    }
}

/// External collaborators the engine is wired to.
pub struct Adapters {
    pub storage: Arc<dyn StorageAdapter>,
    pub router: ProviderRouter,
    /// Used for broadcasts and bonus notifications; per-event replies are
    /// returned to the caller instead.
    pub channel: Arc<dyn ChannelAdapter>,
    pub image: Option<Arc<dyn ImageAdapter>>,
    pub payment: Option<Arc<dyn PaymentAdapter>>,
}

/// Values the engine reads from configuration once.
#[derive(Debug, Clone)]
pub(crate) struct EngineSettings {
    pub admin_username: Option<String>,
    pub starting_balance: i64,
    pub default_provider: String,
    pub memory_enabled_by_default: bool,
    pub image_defaults: ImagePreferences,
    pub languages: Vec<String>,
    pub subscription: SubscriptionConfig,
    pub generation_timeout: Duration,
}

impl EngineSettings {
    fn from_config(config: &RavynConfig) -> Self {
        Self {
            admin_username: config.agent.admin_username.clone(),
            starting_balance: config.ledger.starting_balance,
            default_provider: config.providers.default.clone(),
            memory_enabled_by_default: config.memory.enabled_by_default,
            image_defaults: ImagePreferences {
                style: config.image.default_style.clone(),
                size: config.image.size.clone(),
                quality: config.image.quality.clone(),
            },
            languages: config.agent.languages.clone(),
            subscription: config.subscription.clone(),
            generation_timeout: Duration::from_secs(config.providers.timeout_secs),
        }
    }
}

/// Composition root of admission, funding, routing and memory.
pub struct DispatchEngine {
    pub(crate) storage: Arc<dyn StorageAdapter>,
    pub(crate) channel: Arc<dyn ChannelAdapter>,
    pub(crate) image: Option<Arc<dyn ImageAdapter>>,
    pub(crate) payment: Option<Arc<dyn PaymentAdapter>>,
    pub(crate) limiter: RateLimiter,
    pub(crate) ledger: TokenLedger,
    pub(crate) recorder: InteractionRecorder,
    pub(crate) memory: ConversationMemory,
    pub(crate) router: ProviderRouter,
    pub(crate) sessions: SessionStore,
    pub(crate) replay: ReplayGuard,
    pub(crate) settings: EngineSettings,
}

impl DispatchEngine {
    pub fn new(config: &RavynConfig, adapters: Adapters) -> Result<Self, RavynError> {
        let Adapters {
            storage,
            router,
            channel,
            image,
            payment,
        } = adapters;

        let memory = ConversationMemory::from_config(Arc::clone(&storage), &config.memory)?;
        let ledger = TokenLedger::new(
            Arc::clone(&storage),
            TokenCostTable::from_config(&config.ledger),
        );

        info!(
            agent_name = config.agent.name.as_str(),
            providers = ?router.provider_names(),
            image = ?image.as_ref().map(|i| i.name()),
            payment = ?payment.as_ref().map(|p| p.name()),
            "dispatch engine initialized"
        );

        Ok(Self {
            recorder: InteractionRecorder::new(Arc::clone(&storage)),
            limiter: RateLimiter::from_config(&config.limits),
            sessions: SessionStore::from_config(&config.session),
            replay: ReplayGuard::new(Duration::from_secs(config.session.replay_ttl_secs)),
            settings: EngineSettings::from_config(config),
            storage,
            channel,
            image,
            payment,
            ledger,
            memory,
            router,
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn recorder(&self) -> &InteractionRecorder {
        &self.recorder
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Re-applies limits and costs an admin persisted in an earlier run.
    pub async fn restore_settings(&self) -> Result<(), RavynError> {
        let max = self.storage.get_setting(SETTING_MAX_REQUESTS).await?;
        let window = self.storage.get_setting(SETTING_WINDOW_SECS).await?;
        if let (Some(max), Some(window)) = (max, window) {
            match (max.parse::<u32>(), window.parse::<u64>()) {
                (Ok(max), Ok(window)) if max > 0 && window > 0 => {
                    self.limiter
                        .update_limits(RateLimit::new(max, Duration::from_secs(window)));
                }
                _ => warn!(%max, %window, "ignoring malformed persisted rate limit"),
            }
        }

        for kind in InteractionKind::BILLABLE {
            let key = format!("{SETTING_COST_PREFIX}{kind}");
            if let Some(value) = self.storage.get_setting(&key).await? {
                match value.parse::<i64>() {
                    Ok(cost) => self.ledger.set_cost(kind, cost)?,
                    Err(_) => warn!(key = %key, value = %value, "ignoring malformed persisted cost"),
                }
            }
        }
        Ok(())
    }

    /// Handles one event and delivers its replies through the channel.
    ///
    /// Delivery failures are logged and do not fail the dispatch.
    pub async fn dispatch(&self, event: &InboundEvent) -> Result<DispatchOutcome, RavynError> {
        let Dispatch { outcome, replies } = self.handle(event).await?;
        for reply in &replies {
            if let Err(e) = self.channel.send(reply).await {
                error!(user_id = %event.user_id, error = %e, "failed to deliver reply");
            }
        }
        Ok(outcome)
    }

    /// Handles one event and returns the replies without sending them.
    pub async fn handle(&self, event: &InboundEvent) -> Result<Dispatch, RavynError> {
        if let Some(update_id) = event.update_id {
            if !self.replay.first_seen(update_id) {
                recording::record_outcome(DispatchOutcome::Duplicate.label());
                return Ok(Dispatch::silent(DispatchOutcome::Duplicate));
            }
        }

        let dispatch = self.route(event).await?;
        debug!(
            user_id = %event.user_id,
            outcome = dispatch.outcome.label(),
            replies = dispatch.replies.len(),
            "event dispatched"
        );
        recording::record_outcome(dispatch.outcome.label());
        Ok(dispatch)
    }

    async fn route(&self, event: &InboundEvent) -> Result<Dispatch, RavynError> {
        if let Some(existing) = self.storage.get_user(event.user_id).await? {
            if existing.is_banned {
                debug!(user_id = %event.user_id, "event from banned user");
                return Ok(self.banned(event));
            }
        }

        let user = self.storage.ensure_user(&self.new_user(event)).await?;

        match &event.kind {
            EventKind::Text(text) => self.handle_text(event, &user, text).await,
            EventKind::Command(command) => self.handle_command(event, &user, command).await,
            EventKind::Callback { query_id, action } => {
                self.handle_callback(event, &user, query_id, action).await
            }
        }
    }

    fn banned(&self, event: &InboundEvent) -> Dispatch {
        match &event.kind {
            EventKind::Callback { query_id, .. } => Dispatch::reply(
                DispatchOutcome::Banned,
                Outbound::CallbackAnswer {
                    query_id: query_id.clone(),
                    text: Some(notices::BANNED.to_string()),
                },
            ),
            _ => Dispatch::reply(
                DispatchOutcome::Banned,
                Outbound::text(event.chat_id, notices::BANNED),
            ),
        }
    }

    fn new_user(&self, event: &InboundEvent) -> NewUser {
        NewUser {
            user_id: event.user_id,
            username: event.username.clone(),
            starting_balance: self.settings.starting_balance,
            preferred_provider: self.settings.default_provider.clone(),
            memory_enabled: self.settings.memory_enabled_by_default,
            image: self.settings.image_defaults.clone(),
        }
    }

    pub(crate) fn rate_limited(&self, chat_id: i64) -> Dispatch {
        Dispatch::reply(
            DispatchOutcome::RateLimited,
            Outbound::text(chat_id, notices::RATE_LIMITED),
        )
    }

    pub(crate) fn unfunded(&self, chat_id: i64, kind: InteractionKind, charge: Charge) -> Dispatch {
        let balance = match charge {
            Charge::Insufficient { balance, .. } | Charge::Debited { balance, .. } => balance,
        };
        Dispatch::reply(
            DispatchOutcome::Unfunded {
                kind,
                cost: charge.cost(),
                balance,
            },
            Outbound::with_buttons(chat_id, notices::NO_TOKENS, notices::subscribe_button()),
        )
    }

    /// Plain text: a pending follow-up if one is waiting, otherwise a chat turn.
    async fn handle_text(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        text: &str,
    ) -> Result<Dispatch, RavynError> {
        self.admitted(user.user_id, event.chat_id, async {
            if let Some(pending) = self.sessions.take_pending(user.user_id) {
                match pending.kind {
                    PendingKind::AwaitingVariation => {
                        return self.resume_variation(event, user, text, pending).await;
                    }
                }
            }
            self.chat(event, user, text).await
        })
        .await
    }

    /// Runs `work` under a fresh rate-limit admission. A failed dispatch
    /// hands the admission back.
    async fn admitted<F>(
        &self,
        user_id: UserId,
        chat_id: i64,
        work: F,
    ) -> Result<Dispatch, RavynError>
    where
        F: std::future::Future<Output = Result<Dispatch, RavynError>>,
    {
        let admitted_at = Instant::now();
        if !self.limiter.admit_at(user_id, admitted_at) {
            return Ok(self.rate_limited(chat_id));
        }
        let result = work.await;
        if result.is_err() {
            self.limiter.release(user_id, admitted_at);
        }
        result
    }

    async fn chat(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        text: &str,
    ) -> Result<Dispatch, RavynError> {
        let user_id = user.user_id;
        let charge = self.ledger.charge(user_id, InteractionKind::Chat).await?;
        let Charge::Debited { cost, .. } = charge else {
            return Ok(self.unfunded(event.chat_id, InteractionKind::Chat, charge));
        };
        recording::record_debit("chat", cost);

        let history = self.memory.read(user_id).await?;
        let started = Instant::now();
        let generation = self
            .router
            .generate(&user.preferred_provider, text, &history)
            .await;
        recording::record_latency(started.elapsed().as_secs_f64());

        // The audit row goes in first so every debit has one.
        self.recorder
            .record(user_id, InteractionKind::Chat, &generation.provider, cost)
            .await?;
        if generation.failed {
            recording::record_provider_failure(&generation.provider);
        } else {
            self.memory.append(user_id, text, &generation.text).await?;
        }

        let kind = InteractionKind::Chat;
        if generation.failed {
            Ok(Dispatch::reply(
                DispatchOutcome::Failed { kind, cost },
                Outbound::text(event.chat_id, generation.text),
            ))
        } else {
            Ok(Dispatch::reply(
                DispatchOutcome::Responded { kind, cost },
                Outbound::with_buttons(event.chat_id, generation.text, notices::feedback_buttons()),
            ))
        }
    }

    pub(crate) fn image_options(&self, user: &UserAccount) -> ImageOptions {
        ImageOptions {
            style: Some(user.image.style.clone()),
            size: user.image.size.clone(),
            quality: user.image.quality.clone(),
        }
    }

    /// Loads an artifact owned by `user_id`.
    pub(crate) async fn owned_artifact(
        &self,
        user_id: UserId,
        artifact_id: &str,
    ) -> Result<Option<Artifact>, RavynError> {
        Ok(self
            .storage
            .get_artifact(artifact_id)
            .await?
            .filter(|a| a.user_id == user_id))
    }

    /// `/image <prompt>`.
    pub(crate) async fn generate_image(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        prompt: &str,
    ) -> Result<Dispatch, RavynError> {
        let Some(image) = self.image.clone() else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::IMAGES_DISABLED),
            ));
        };
        self.admitted(user.user_id, event.chat_id, async {
            let kind = InteractionKind::Image;
            let charge = self.ledger.charge(user.user_id, kind).await?;
            let Charge::Debited { cost, .. } = charge else {
                return Ok(self.unfunded(event.chat_id, kind, charge));
            };
            recording::record_debit("image", cost);

            let options = self.image_options(user);
            let result = self
                .with_timeout(image.generate(prompt, &options))
                .await;
            self.finish_render(event, user, &*image, kind, cost, prompt, options.style, result)
                .await
        })
        .await
    }

    /// Upscale button on an earlier artifact.
    pub(crate) async fn upscale(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        artifact_id: &str,
    ) -> Result<Dispatch, RavynError> {
        let Some(image) = self.image.clone() else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::IMAGES_DISABLED),
            ));
        };
        let Some(source) = self.owned_artifact(user.user_id, artifact_id).await? else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::ARTIFACT_MISSING),
            ));
        };
        self.admitted(user.user_id, event.chat_id, async {
            let kind = InteractionKind::Upscale;
            let charge = self.ledger.charge(user.user_id, kind).await?;
            let Charge::Debited { cost, .. } = charge else {
                return Ok(self.unfunded(event.chat_id, kind, charge));
            };
            recording::record_debit("upscale", cost);

            let result = self.with_timeout(image.upscale(&source)).await;
            self.finish_render(
                event,
                user,
                &*image,
                kind,
                cost,
                &source.prompt,
                source.style.clone(),
                result,
            )
            .await
        })
        .await
    }

    /// Variation button: waits for the follow-up describing the changes.
    pub(crate) async fn begin_variation(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        artifact_id: &str,
    ) -> Result<Dispatch, RavynError> {
        if self.image.is_none() {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::IMAGES_DISABLED),
            ));
        }
        if self.owned_artifact(user.user_id, artifact_id).await?.is_none() {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::ARTIFACT_MISSING),
            ));
        }
        self.sessions
            .set_pending(user.user_id, PendingKind::AwaitingVariation, artifact_id);
        debug!(user_id = %user.user_id, artifact_id, "awaiting variation prompt");
        Ok(Dispatch::reply(
            DispatchOutcome::Handled,
            Outbound::text(event.chat_id, notices::VARIATION_PROMPT),
        ))
    }

    /// Runs a taken variation. The session is put back when the render could
    /// not be paid for or the store failed, so the same follow-up can be
    /// sent again.
    async fn resume_variation(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        changes: &str,
        pending: PendingSession,
    ) -> Result<Dispatch, RavynError> {
        let result = self.complete_variation(event, user, changes, &pending).await;
        let reopen = match &result {
            Ok(dispatch) => matches!(dispatch.outcome, DispatchOutcome::Unfunded { .. }),
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "variation failed, keeping it pending");
                true
            }
        };
        if reopen {
            self.sessions.restore(user.user_id, pending);
        }
        result
    }

    /// Renders a variation with the follow-up text as the change request.
    async fn complete_variation(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        changes: &str,
        pending: &PendingSession,
    ) -> Result<Dispatch, RavynError> {
        let Some(image) = self.image.clone() else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::IMAGES_DISABLED),
            ));
        };
        let Some(source) = self.owned_artifact(user.user_id, &pending.payload).await? else {
            return Ok(Dispatch::reply(
                DispatchOutcome::Rejected,
                Outbound::text(event.chat_id, notices::ARTIFACT_MISSING),
            ));
        };
        let kind = InteractionKind::Variation;
        let charge = self.ledger.charge(user.user_id, kind).await?;
        let Charge::Debited { cost, .. } = charge else {
            return Ok(self.unfunded(event.chat_id, kind, charge));
        };
        recording::record_debit("variation", cost);

        let options = self.image_options(user);
        let result = self
            .with_timeout(image.variation(&source, changes, &options))
            .await;
        let concept = format!("{}, {}", source.prompt, changes);
        self.finish_render(event, user, &*image, kind, cost, &concept, options.style, result)
            .await
    }

    async fn with_timeout<F>(&self, call: F) -> Result<RenderedImage, RavynError>
    where
        F: std::future::Future<Output = Result<RenderedImage, RavynError>>,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.settings.generation_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RavynError::Timeout {
                duration: self.settings.generation_timeout,
            }),
        };
        recording::record_latency(started.elapsed().as_secs_f64());
        result
    }

    /// Stores and logs a render, or turns its failure into the apology.
    #[allow(clippy::too_many_arguments)]
    async fn finish_render(
        &self,
        event: &InboundEvent,
        user: &UserAccount,
        image: &dyn ImageAdapter,
        kind: InteractionKind,
        cost: i64,
        concept: &str,
        style: Option<String>,
        result: Result<RenderedImage, RavynError>,
    ) -> Result<Dispatch, RavynError> {
        let user_id = user.user_id;
        let rendered = match result {
            Ok(rendered) => rendered,
            Err(e) => {
                error!(user_id = %user_id, kind = %kind, adapter = image.name(), error = %e, "image call failed");
                recording::record_provider_failure(image.name());
                self.recorder.record(user_id, kind, image.name(), cost).await?;
                return Ok(Dispatch::reply(
                    DispatchOutcome::Failed { kind, cost },
                    Outbound::text(event.chat_id, self.router.apology()),
                ));
            }
        };

        let artifact = Artifact {
            id: new_artifact_id(),
            user_id,
            prompt: concept.to_string(),
            style,
            location: rendered.location,
            created_at: chrono::Utc::now(),
        };
        self.storage.put_artifact(&artifact).await?;
        self.recorder
            .record(user_id, kind, &rendered.model, cost)
            .await?;

        let caption = match kind {
            InteractionKind::Upscale => format!("🔍 Upscaled: {concept}"),
            InteractionKind::Variation => format!("🔄 Variation: {concept}"),
            _ => format!("🖼️ {concept}"),
        };
        let buttons = notices::artifact_buttons(&artifact.id);
        Ok(Dispatch::reply(
            DispatchOutcome::Responded { kind, cost },
            Outbound::Artifact {
                chat_id: event.chat_id,
                artifact,
                caption,
                buttons,
            },
        ))
    }

    /// True when the event comes from the configured admin username.
    pub(crate) fn is_admin(&self, event: &InboundEvent) -> bool {
        match (&self.settings.admin_username, &event.username) {
            (Some(admin), Some(username)) => admin
                .trim_start_matches('@')
                .eq_ignore_ascii_case(username.trim_start_matches('@')),
            _ => false,
        }
    }

    /// Drops expired pending sessions, replay keys and idle limiter windows.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let sessions = self.sessions.purge_expired(now);
        let windows = self.limiter.purge_idle(now);
        let updates = self.replay.purge_expired(now);
        debug!(sessions, windows, updates, "expired in-memory state purged");
    }
}

/// Short id used in callback data.
fn new_artifact_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..12].to_string()
}
