//! Gemini caption client implementation
//!
//! Sends the image inline together with the style/language system
//! instruction and normalizes whatever text the model returns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, error, info};

use crate::caption::{self, build_system_instruction, sanitize_extra_prompt};
use crate::config::{AI_API_KEY_VAR, AiConfig};
use crate::error::{Error, Result};
use crate::media::ImageUpload;

use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use super::{CaptionGenerator, CaptionOptions};

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini caption client
#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    config: AiConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for creating a GeminiClient
#[derive(Default)]
pub struct GeminiClientBuilder {
    config: Option<AiConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl GeminiClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AI configuration
    pub fn config(mut self, config: AiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL (defaults to the config's base URL)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the GeminiClient
    pub fn build(self) -> Result<GeminiClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self.api_key.ok_or(Error::ApiKeyMissing(AI_API_KEY_VAR))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiClient {
            http_client,
            config,
            api_key,
            base_url,
        })
    }
}

impl GeminiClient {
    /// Create a new client with the given configuration and API key
    pub fn new(config: AiConfig, api_key: impl Into<String>) -> Result<Self> {
        GeminiClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    /// Build a client from config, reading the key from the environment
    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let key = config
            .resolved_api_key()
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .ok_or(Error::ApiKeyMissing(AI_API_KEY_VAR))?;

        Self::new(config.clone(), key)
    }

    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.config.model)
    }

    /// Build the request body for one image
    pub fn build_request(&self, image: &ImageUpload, opts: &CaptionOptions) -> GenerateContentRequest {
        let context = opts
            .extra_prompt
            .as_deref()
            .map(sanitize_extra_prompt)
            .unwrap_or_default();

        let context_text = if context.is_empty() {
            "No extra context provided.".to_string()
        } else {
            format!("Extra context: {}", context)
        };

        let mime_type = match image.mime_type.as_str() {
            "image/jpg" => "image/jpeg",
            other => other,
        };

        GenerateContentRequest::new(
            build_system_instruction(opts.vibe, opts.language),
            vec![Content::user(vec![
                Part::inline_data(mime_type, image.to_base64()),
                Part::text(context_text),
            ])],
        )
        .with_generation_config(GenerationConfig {
            temperature: self.config.temperature,
            top_k: self.config.top_k,
            top_p: self.config.top_p,
        })
    }

    async fn send_request(&self, request: &GenerateContentRequest) -> Result<String> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();

        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::CaptionFailed(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Caption token usage"
            );
        }

        Ok(body.text())
    }

    /// Handle error responses from the API
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(Error::CaptionFailed(format!(
                "Unauthorized: invalid API key. Set the {} environment variable",
                AI_API_KEY_VAR
            ))),
            429 => Err(Error::CaptionFailed(format!("Rate limited: {}", body))),
            400 => Err(Error::CaptionFailed(format!("Bad request: {}", body))),
            404 => Err(Error::CaptionFailed(format!(
                "Model not found or endpoint unavailable: {}",
                body
            ))),
            500..=599 => Err(Error::CaptionFailed(format!(
                "Server error ({}): {}",
                status, body
            ))),
            _ => Err(Error::CaptionFailed(format!(
                "HTTP error {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl CaptionGenerator for GeminiClient {
    async fn generate_caption(
        &self,
        image: &ImageUpload,
        opts: &CaptionOptions,
    ) -> Result<String> {
        let request = self.build_request(image, opts);

        debug!(
            model = %self.config.model,
            vibe = %opts.vibe,
            language = %opts.language,
            image_bytes = image.size(),
            "Requesting caption"
        );

        let raw = self.send_request(&request).await.inspect_err(|e| {
            error!(error = %e, "AI caption generation failed");
        })?;

        let caption = caption::normalize(&raw, opts.vibe);
        info!(chars = caption.chars().count(), "Caption generated");
        Ok(caption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::{Language, Vibe};

    fn test_config() -> AiConfig {
        AiConfig {
            model: "test-model".to_string(),
            ..AiConfig::default()
        }
    }

    #[test]
    fn test_client_builder() {
        let client = GeminiClient::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("https://example.com/v1beta/")
            .timeout_secs(10)
            .build()
            .unwrap();

        assert_eq!(client.model(), "test-model");
        assert_eq!(
            client.endpoint(),
            "https://example.com/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn test_client_builder_requires_api_key() {
        let result = GeminiClient::builder().config(test_config()).build();
        assert!(matches!(result, Err(Error::ApiKeyMissing(_))));
    }

    #[test]
    fn test_default_endpoint() {
        let client = GeminiClient::new(AiConfig::default(), "k").unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_build_request_without_context() {
        let client = GeminiClient::new(test_config(), "k").unwrap();
        let image = ImageUpload::new(vec![1, 2, 3], "image/jpg");
        let request = client.build_request(&image, &CaptionOptions::new(Vibe::Minimal));

        let part = &request.contents[0].parts;
        let inline = part[0].inline_data.as_ref().unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
        assert_eq!(inline.data, "AQID");
        assert_eq!(part[1].text.as_deref(), Some("No extra context provided."));

        let system = request.system_instruction.parts[0].text.as_deref().unwrap();
        assert!(system.contains(Vibe::Minimal.descriptor()));
    }

    #[test]
    fn test_build_request_with_context() {
        let client = GeminiClient::new(test_config(), "k").unwrap();
        let image = ImageUpload::new(vec![0], "image/png");
        let opts = CaptionOptions::new(Vibe::Fun)
            .with_language(Language::Fr)
            .with_extra_prompt("  birthday   party ");
        let request = client.build_request(&image, &opts);

        assert_eq!(
            request.contents[0].parts[1].text.as_deref(),
            Some("Extra context: birthday party")
        );
        let system = request.system_instruction.parts[0].text.as_deref().unwrap();
        assert!(system.contains("French (Français)"));

        let config = request.generation_config.unwrap();
        assert_eq!(config.top_k, 32);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = GeminiClient::new(test_config(), "secret-key").unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }
}
