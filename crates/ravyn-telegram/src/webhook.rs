// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Updates are acknowledged as soon as they are decoded; dispatch runs on a
//! tracked task so Telegram never waits on a provider round-trip.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use ravyn_agent::DispatchEngine;
use ravyn_config::model::TelegramConfig;
use ravyn_core::RavynError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::update::Update;

/// Header Telegram echoes back with the secret given to `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    engine: Arc<DispatchEngine>,
    secret: Option<Arc<str>>,
    tasks: TaskTracker,
}

impl WebhookState {
    pub fn new(engine: Arc<DispatchEngine>, secret: Option<&str>) -> Self {
        Self {
            engine,
            secret: secret.map(Arc::from),
            tasks: TaskTracker::new(),
        }
    }

    /// In-flight dispatch tasks.
    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }
}

/// Builds the webhook router: `POST {webhook_path}` and `GET /health`.
pub fn router(state: WebhookState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(receive_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the webhook until `cancel` fires, then waits for in-flight
/// dispatches to finish.
pub async fn serve(
    config: &TelegramConfig,
    state: WebhookState,
    cancel: CancellationToken,
) -> Result<(), RavynError> {
    let app = router(state.clone(), &config.webhook_path);
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RavynError::Channel {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!(addr = %addr, path = %config.webhook_path, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| RavynError::Channel {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    state.tasks.close();
    debug!(pending = state.tasks.len(), "waiting for in-flight dispatches");
    state.tasks.wait().await;
    info!("webhook server stopped");
    Ok(())
}

/// Byte comparison whose running time does not depend on where the first
/// mismatch is.
fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

async fn health() -> &'static str {
    "OK"
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.secret {
        let provided = headers.get(SECRET_HEADER).map(|v| v.as_bytes());
        if !provided.is_some_and(|p| secret_matches(p, secret.as_bytes())) {
            warn!("webhook request with missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    // Malformed payloads are acknowledged so Telegram stops redelivering them.
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "ignoring malformed update");
            return StatusCode::OK;
        }
    };
    let Some(event) = update.into_event() else {
        return StatusCode::OK;
    };

    let engine = Arc::clone(&state.engine);
    state.tasks.spawn(async move {
        match engine.dispatch(&event).await {
            Ok(outcome) => debug!(
                user_id = %event.user_id,
                outcome = outcome.label(),
                "update handled"
            ),
            Err(e) if e.is_infrastructure() => {
                error!(user_id = %event.user_id, error = %e, "store unavailable, update dropped")
            }
            Err(e) => error!(user_id = %event.user_id, error = %e, "dispatch failed"),
        }
    });
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_must_match_exactly() {
        assert!(secret_matches(b"s3cret-token", b"s3cret-token"));
        assert!(!secret_matches(b"s3cret-tokeN", b"s3cret-token"));
        assert!(!secret_matches(b"s3cret", b"s3cret-token"));
        assert!(!secret_matches(b"", b"s3cret-token"));
    }
}
