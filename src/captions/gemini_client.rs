// src/captions/gemini_client.rs
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use super::{GeneratedImage, ImageGenerator, TextGenerator};
use crate::core::config_manager::{LlmConfig, RetryConfig};
use crate::fetchers::HttpFetcher;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;
use tracing::{error, info};

pub struct GeminiClient {
    http: HttpFetcher,
    api_key: String,
    base_url: String,
    config: LlmConfig,
    image_model: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        Self::with_retry(config, api_key, RetryConfig::default())
    }

    pub fn with_retry(config: &LlmConfig, api_key: String, retry: RetryConfig) -> Result<Self> {
        let http = HttpFetcher::with_timeout(retry, Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            image_model: None,
        })
    }

    /// Model used by `generate_image`; without one image requests fail
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        generation_config: GenerationConfig,
    ) -> Result<GenerateContentResponse> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config,
        };
        let body = serde_json::to_value(&request).context("Failed to encode Gemini request")?;

        info!("Sending request to Gemini model {}", model);

        let value = self
            .http
            .post_json(
                &self.endpoint(model),
                &body,
                &[("x-goog-api-key", self.api_key.as_str())],
            )
            .await
            .map_err(|e| {
                error!("Gemini API error: {:#}", e);
                e
            })?;

        serde_json::from_value(value).context("Failed to parse Gemini response")
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let generation_config = GenerationConfig {
            max_output_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            top_p: Some(self.config.top_p),
            top_k: Some(self.config.top_k),
            ..Default::default()
        };
        let response = self
            .generate_content(&self.config.model, prompt, generation_config)
            .await?;

        let text: String = response
            .candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            anyhow::bail!("Gemini returned no text");
        }

        info!("Successfully received response from Gemini");
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<Option<GeneratedImage>> {
        let model = self
            .image_model
            .as_deref()
            .context("No image model configured")?;
        let generation_config = GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            ..Default::default()
        };
        let response = self.generate_content(model, prompt, generation_config).await?;

        let Some(inline) = response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|p| p.inline_data)
        else {
            return Ok(None);
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .context("Gemini returned invalid base64 image data")?;

        Ok(Some(GeneratedImage {
            mime_type: inline.mime_type,
            bytes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        let config = LlmConfig {
            base_url: server.uri(),
            model: "gemini-test".to_string(),
            ..Default::default()
        };
        GeminiClient::with_retry(
            &config,
            "g-key".to_string(),
            RetryConfig {
                attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 1,
            },
        )
        .unwrap()
        .with_image_model("gemini-image")
    }

    #[tokio::test]
    async fn test_generate_text_concatenates_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "Write a post"}]}],
                "generationConfig": {"maxOutputTokens": 500, "topK": 40}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world\n"}]}}]
            })))
            .mount(&server)
            .await;

        let text = client(&server).generate_text("Write a post").await.unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        assert!(client(&server).generate_text("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_generate_image_decodes_inline_data() {
        let server = MockServer::start().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nrest");
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-image:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [
                    {"text": "Here is your image"},
                    {"inlineData": {"mimeType": "image/png", "data": encoded}}
                ]}}]
            })))
            .mount(&server)
            .await;

        let image = client(&server)
            .generate_image("poster")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert!(image.bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_text_only_image_response_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "sorry"}]}}]
            })))
            .mount(&server)
            .await;

        assert!(client(&server).generate_image("poster").await.unwrap().is_none());
    }
}
