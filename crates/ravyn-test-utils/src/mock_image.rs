// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock image adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ravyn_core::types::{ImageOptions, RenderedImage};
use ravyn_core::{AdapterType, Artifact, HealthStatus, ImageAdapter, PluginAdapter, RavynError};

/// Model reported for every render.
pub const MOCK_IMAGE_MODEL: &str = "mock-image-1";

/// Which adapter entry point produced a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Generate,
    Upscale,
    Variation,
}

/// One recorded render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub kind: RenderKind,
    pub prompt: String,
    pub style: Option<String>,
}

/// Renders fake URLs of the form `https://images.test/<n>.png`.
pub struct MockImage {
    styles: Vec<String>,
    counter: AtomicU64,
    fail: AtomicBool,
    delay_ms: AtomicU64,
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl MockImage {
    pub fn new() -> Self {
        Self {
            styles: ["realistic", "anime", "digital-art"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            counter: AtomicU64::new(0),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().await.clone()
    }

    async fn render(
        &self,
        kind: RenderKind,
        prompt: String,
        style: Option<String>,
    ) -> Result<RenderedImage, RavynError> {
        self.calls.lock().await.push(RenderCall {
            kind,
            prompt: prompt.clone(),
            style: style.clone(),
        });
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RavynError::Provider {
                message: "image backend unavailable".into(),
                source: None,
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = match style {
            Some(style) => format!("{prompt}, {style} style"),
            None => prompt,
        };
        Ok(RenderedImage {
            location: format!("https://images.test/{n}.png"),
            prompt,
            model: MOCK_IMAGE_MODEL.to_string(),
        })
    }
}

impl Default for MockImage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockImage {
    fn name(&self) -> &str {
        "mock-image"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Image
    }

    async fn health_check(&self) -> Result<HealthStatus, RavynError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RavynError> {
        Ok(())
    }
}

#[async_trait]
impl ImageAdapter for MockImage {
    async fn generate(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<RenderedImage, RavynError> {
        self.render(RenderKind::Generate, prompt.to_string(), options.style.clone())
            .await
    }

    async fn upscale(&self, source: &Artifact) -> Result<RenderedImage, RavynError> {
        self.render(RenderKind::Upscale, source.prompt.clone(), source.style.clone())
            .await
    }

    async fn variation(
        &self,
        source: &Artifact,
        changes: &str,
        options: &ImageOptions,
    ) -> Result<RenderedImage, RavynError> {
        self.render(
            RenderKind::Variation,
            format!("{}, {changes}", source.prompt),
            options.style.clone(),
        )
        .await
    }

    fn styles(&self) -> Vec<String> {
        self.styles.clone()
    }
}
