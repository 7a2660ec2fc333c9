// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible APIs.
//!
//! [`OpenAiClient`] sends bearer-authenticated JSON and repeats a call once
//! when the upstream is throttled or failing. Mistral's API speaks the same
//! dialect and shares this client.

use std::time::Duration;

use ravyn_core::RavynError;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse, ImageRequest, ImageResponse};

/// Wait before the second and last attempt.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// A failed attempt and whether it may be repeated.
struct Failure {
    error: RavynError,
    retryable: bool,
}

impl Failure {
    fn fatal(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            error: RavynError::Provider {
                message: format!("{context}: {e}"),
                source: Some(Box::new(e)),
            },
            retryable: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_root: String,
}

impl OpenAiClient {
    /// `base_url` is the API root without an endpoint, e.g. `https://api.openai.com/v1`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, RavynError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| RavynError::Config(format!("API key is not a valid header: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Failure::fatal("cannot build HTTP client", e).error)?;

        Ok(Self {
            http,
            api_root: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, RavynError> {
        self.post_json("/chat/completions", request).await
    }

    pub async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse, RavynError> {
        self.post_json("/images/generations", request).await
    }

    /// POSTs `body` to `endpoint`; a throttled or failing upstream gets one
    /// more attempt.
    async fn post_json<B, R>(&self, endpoint: &str, body: &B) -> Result<R, RavynError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.api_root);
        match self.exchange(&url, body).await {
            Ok(parsed) => Ok(parsed),
            Err(Failure { error, retryable: true }) => {
                warn!(endpoint, error = %error, "upstream busy, retrying");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.exchange(&url, body).await.map_err(|f| f.error)
            }
            Err(failure) => Err(failure.error),
        }
    }

    async fn exchange<B, R>(&self, url: &str, body: &B) -> Result<R, Failure>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Failure::fatal("HTTP request failed", e))?;
        let status = response.status();
        debug!(status = %status, url, "upstream responded");

        let text = response
            .text()
            .await
            .map_err(|e| Failure::fatal("cannot read response body", e))?;
        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| Failure::fatal("unexpected response shape", e));
        }

        Err(Failure {
            error: RavynError::Provider {
                message: describe_status(status, &text),
                source: None,
            },
            retryable: is_retryable(status),
        })
    }
}

fn describe_status(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => format!(
            "upstream {status} ({}): {}",
            parsed.error.type_.as_deref().unwrap_or("unknown"),
            parsed.error.message
        ),
        Err(_) => format!("upstream {status}: {body}"),
    }
}

/// Rate limits, generic 5xx and the 529 overload status.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() || status.as_u16() == 529
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::new("user", "Hello")],
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        })
    }

    #[tokio::test]
    async fn chat_completion_success_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hi there!")))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", &server.uri(), Duration::from_secs(5)).unwrap();
        let resp = client.chat_completion(&request()).await.unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("Hi there!"));
    }

    #[tokio::test]
    async fn retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_exceeded", "message": "slow down"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("After retry")))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", &server.uri(), Duration::from_secs(5)).unwrap();
        let resp = client.chat_completion(&request()).await.unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("After retry"));
    }

    #[tokio::test]
    async fn second_failure_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"type": "server_error", "message": "overloaded"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", &server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.chat_completion(&request()).await.unwrap_err().to_string();
        assert!(err.contains("server_error"), "got: {err}");
    }

    #[tokio::test]
    async fn bad_request_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", &server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.chat_completion(&request()).await.unwrap_err().to_string();
        assert!(err.contains("400") && err.contains("bad request"), "got: {err}");
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::from_u16(529).unwrap()));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new("sk-test", &server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.chat_completion(&request()).await.unwrap_err();
        assert!(matches!(err, RavynError::Provider { .. }));
    }
}
