// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messages API transport: auth headers, status classification, one retry.

use std::time::Duration;

use ravyn_core::RavynError;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ErrorEnvelope, MessagesBody, MessagesReply};

/// Pause before the single retry of an overloaded or throttled call.
const RETRY_DELAY: Duration = Duration::from_millis(800);

/// What one HTTP attempt produced.
enum Attempt {
    Done(MessagesReply),
    /// Worth one more try: throttled, overloaded, or a 5xx.
    Transient(RavynError),
    Fatal(RavynError),
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AnthropicClient {
    /// `base_url` is the API root, e.g. `https://api.anthropic.com/v1`.
    pub fn new(
        api_key: &str,
        api_version: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, RavynError> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-api-key"), header_value("API key", api_key)?);
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            header_value("API version", api_version)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| provider_error("cannot build Anthropic HTTP client", e))?;

        Ok(Self {
            http,
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
        })
    }

    /// Sends one Messages call, retrying once on a transient status.
    pub async fn send(&self, body: &MessagesBody) -> Result<MessagesReply, RavynError> {
        match self.attempt(body).await {
            Attempt::Done(reply) => Ok(reply),
            Attempt::Fatal(e) => Err(e),
            Attempt::Transient(first) => {
                warn!(error = %first, "Anthropic call throttled, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                match self.attempt(body).await {
                    Attempt::Done(reply) => Ok(reply),
                    Attempt::Transient(e) | Attempt::Fatal(e) => Err(e),
                }
            }
        }
    }

    async fn attempt(&self, body: &MessagesBody) -> Attempt {
        let response = match self.http.post(&self.endpoint).json(body).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Fatal(provider_error("Anthropic request failed", e)),
        };
        let status = response.status();
        debug!(status = %status, model = %body.model, "Anthropic responded");

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Attempt::Fatal(provider_error("cannot read Anthropic response", e)),
        };

        if status.is_success() {
            return match serde_json::from_str(&text) {
                Ok(reply) => Attempt::Done(reply),
                Err(e) => Attempt::Fatal(provider_error("malformed Anthropic response", e)),
            };
        }

        let error = RavynError::Provider {
            message: describe_failure(status, &text),
            source: None,
        };
        if is_transient(status) {
            Attempt::Transient(error)
        } else {
            Attempt::Fatal(error)
        }
    }
}

/// 429, 5xx and Anthropic's 529 "overloaded".
fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() || status.as_u16() == 529
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "Anthropic {status} {}: {}",
            envelope.error.kind, envelope.error.message
        ),
        Err(_) => format!("Anthropic {status}: {body}"),
    }
}

fn header_value(what: &str, value: &str) -> Result<HeaderValue, RavynError> {
    HeaderValue::from_str(value)
        .map_err(|e| RavynError::Config(format!("invalid Anthropic {what} header: {e}")))
}

fn provider_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> RavynError {
    RavynError::Provider {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}
