// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation backends.

use async_trait::async_trait;

use crate::error::RavynError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Artifact, ImageOptions, RenderedImage};

#[async_trait]
pub trait ImageAdapter: PluginAdapter {
    /// Renders a new image from a prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<RenderedImage, RavynError>;

    /// Produces a higher-quality rendition of an existing artifact.
    async fn upscale(&self, source: &Artifact) -> Result<RenderedImage, RavynError>;

    /// Produces a new image based on an existing artifact and a change request.
    async fn variation(
        &self,
        source: &Artifact,
        changes: &str,
        options: &ImageOptions,
    ) -> Result<RenderedImage, RavynError>;

    /// Style names accepted in [`ImageOptions::style`].
    fn styles(&self) -> Vec<String>;
}
