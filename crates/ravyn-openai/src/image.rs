// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! DALL-E image adapter.
//!
//! Styles are applied as prompt prefixes. Upscale and variation are
//! re-renders: the images endpoint cannot edit pixels of a prior result,
//! so an upscale repeats the source prompt at `hd` quality and a variation
//! asks for a derivative of the source concept.

use std::time::Duration;

use async_trait::async_trait;
use ravyn_config::model::{ImageConfig, ProvidersConfig};
use ravyn_core::types::{ImageOptions, RenderedImage};
use ravyn_core::{AdapterType, Artifact, HealthStatus, ImageAdapter, PluginAdapter, RavynError};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::resolve_api_key;
use crate::types::ImageRequest;

/// Style name and the prefix prepended to the prompt.
const STYLES: [(&str, &str); 4] = [
    (
        "realistic",
        "Create a photorealistic image with natural lighting and details: ",
    ),
    (
        "anime",
        "Create an anime-style illustration with vibrant colors and distinctive anime aesthetics: ",
    ),
    (
        "pixel-art",
        "Create a pixel art image with visible pixels and limited color palette: ",
    ),
    (
        "sketch",
        "Create a hand-drawn sketch with pencil/pen lines and minimal shading: ",
    ),
];

const UPSCALE_QUALITY: &str = "hd";

pub struct DalleImageAdapter {
    client: OpenAiClient,
    model: String,
    default_size: String,
}

impl DalleImageAdapter {
    /// Uses the OpenAI provider's key and base URL.
    pub fn new(image: &ImageConfig, providers: &ProvidersConfig) -> Result<Self, RavynError> {
        let api_key = resolve_api_key(&providers.openai.api_key, "OPENAI_API_KEY")?;
        let client = OpenAiClient::new(
            &api_key,
            &providers.openai.base_url,
            Duration::from_secs(providers.timeout_secs),
        )?;
        info!(model = %image.model, "image adapter initialized");
        Ok(Self {
            client,
            model: image.model.clone(),
            default_size: image.size.clone(),
        })
    }

    fn styled(prompt: &str, style: Option<&str>) -> String {
        match style.and_then(|s| STYLES.iter().find(|(name, _)| *name == s)) {
            Some((_, prefix)) => format!("{prefix}{prompt}"),
            None => prompt.to_string(),
        }
    }

    async fn render(&self, prompt: String, size: &str, quality: &str) -> Result<RenderedImage, RavynError> {
        let request = ImageRequest {
            model: self.model.clone(),
            prompt: prompt.clone(),
            size: size.to_string(),
            quality: quality.to_string(),
            n: 1,
        };
        let response = self.client.generate_image(&request).await?;
        let location = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| RavynError::Provider {
                message: "image response contained no URL".into(),
                source: None,
            })?;
        debug!(model = %self.model, quality, "image rendered");
        Ok(RenderedImage {
            location,
            prompt,
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for DalleImageAdapter {
    fn name(&self) -> &str {
        "dalle"
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
impl ImageAdapter for DalleImageAdapter {
    async fn generate(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<RenderedImage, RavynError> {
        let prompt = Self::styled(prompt, options.style.as_deref());
        self.render(prompt, &options.size, &options.quality).await
    }

    async fn upscale(&self, source: &Artifact) -> Result<RenderedImage, RavynError> {
        let prompt = Self::styled(&source.prompt, source.style.as_deref());
        self.render(prompt, &self.default_size, UPSCALE_QUALITY).await
    }

    async fn variation(
        &self,
        source: &Artifact,
        changes: &str,
        options: &ImageOptions,
    ) -> Result<RenderedImage, RavynError> {
        let prompt = format!(
            "Create a variation of this concept, but with these changes: {changes}. \
             Original concept: {}",
            source.prompt
        );
        let style = options.style.as_deref().or(source.style.as_deref());
        let prompt = Self::styled(&prompt, style);
        self.render(prompt, &options.size, &options.quality).await
    }

    fn styles(&self) -> Vec<String> {
        STYLES.iter().map(|(name, _)| name.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravyn_core::UserId;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base_url: &str) -> DalleImageAdapter {
        let mut providers = ProvidersConfig::default();
        providers.openai.api_key = Some("sk-test".into());
        providers.openai.base_url = base_url.to_string();
        DalleImageAdapter::new(&ImageConfig::default(), &providers).unwrap()
    }

    fn url_body() -> serde_json::Value {
        serde_json::json!({"created": 1, "data": [{"url": "https://img.example/1.png"}]})
    }

    fn source() -> Artifact {
        Artifact {
            id: "a1".into(),
            user_id: UserId(1),
            prompt: "a lighthouse".into(),
            style: Some("sketch".into()),
            location: "https://img.example/0.png".into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn style_prefix_is_applied_only_for_known_styles() {
        assert!(DalleImageAdapter::styled("cat", Some("anime")).starts_with("Create an anime-style"));
        assert_eq!(DalleImageAdapter::styled("cat", Some("vaporwave")), "cat");
        assert_eq!(DalleImageAdapter::styled("cat", None), "cat");
    }

    #[tokio::test]
    async fn generate_posts_styled_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(body_partial_json(serde_json::json!({
                "model": "dall-e-3",
                "prompt": "Create a pixel art image with visible pixels and limited color palette: a castle",
                "quality": "standard",
                "n": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(url_body()))
            .mount(&server)
            .await;

        let image = adapter(&server.uri())
            .generate(
                "a castle",
                &ImageOptions {
                    style: Some("pixel-art".into()),
                    size: "1024x1024".into(),
                    quality: "standard".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(image.location, "https://img.example/1.png");
        assert_eq!(image.model, "dall-e-3");
    }

    #[tokio::test]
    async fn upscale_rerenders_at_hd() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(body_partial_json(serde_json::json!({"quality": "hd"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(url_body()))
            .expect(1)
            .mount(&server)
            .await;

        let image = adapter(&server.uri()).upscale(&source()).await.unwrap();
        assert!(image.prompt.ends_with("a lighthouse"));
        assert!(image.prompt.starts_with("Create a hand-drawn sketch"));
    }

    #[tokio::test]
    async fn variation_mentions_changes_and_concept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(url_body()))
            .mount(&server)
            .await;

        let image = adapter(&server.uri())
            .variation(
                &source(),
                "at night",
                &ImageOptions {
                    style: None,
                    size: "1024x1024".into(),
                    quality: "standard".into(),
                },
            )
            .await
            .unwrap();
        assert!(image.prompt.contains("with these changes: at night"));
        assert!(image.prompt.contains("a lighthouse"));
    }

    #[tokio::test]
    async fn missing_url_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": [{}]})),
            )
            .mount(&server)
            .await;

        let err = adapter(&server.uri()).upscale(&source()).await.unwrap_err();
        assert!(err.to_string().contains("no URL"));
    }
}
