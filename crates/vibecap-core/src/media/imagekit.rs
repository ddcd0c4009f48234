//! ImageKit upload/delete client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::config::{IMAGE_STORE_KEY_VAR, ImagesConfig};
use crate::error::{Error, Result};

use super::{ImageStore, StoredImage};

/// ImageKit client authenticated with the account's private key
#[derive(Clone)]
pub struct ImageKitClient {
    http_client: HttpClient,
    private_key: String,
    upload_url: String,
    api_url: String,
    folder: String,
}

impl std::fmt::Debug for ImageKitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageKitClient")
            .field("upload_url", &self.upload_url)
            .field("api_url", &self.api_url)
            .field("folder", &self.folder)
            .finish()
    }
}

/// Builder for ImageKitClient
#[derive(Default)]
pub struct ImageKitClientBuilder {
    config: Option<ImagesConfig>,
    private_key: Option<String>,
}

impl ImageKitClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoints, folder and timeout
    pub fn config(mut self, config: ImagesConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the private key
    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Build the ImageKitClient
    pub fn build(self) -> Result<ImageKitClient> {
        let config = self.config.unwrap_or_default();
        let private_key = self
            .private_key
            .ok_or(Error::ApiKeyMissing(IMAGE_STORE_KEY_VAR))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(ImageKitClient {
            http_client,
            private_key,
            upload_url: config.upload_url,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            folder: config.folder,
        })
    }
}

impl ImageKitClient {
    pub fn builder() -> ImageKitClientBuilder {
        ImageKitClientBuilder::new()
    }

    /// Build a client from config, reading the key from the environment
    pub fn from_config(config: &ImagesConfig) -> Result<Self> {
        let key = config
            .resolved_private_key()
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .ok_or(Error::ApiKeyMissing(IMAGE_STORE_KEY_VAR))?;

        Self::builder().config(config.clone()).private_key(key).build()
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    fn delete_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, file_id)
    }

    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 | 403 => Err(Error::ImageStoreFailed(format!(
                "Unauthorized: check the {} environment variable",
                IMAGE_STORE_KEY_VAR
            ))),
            404 => Err(Error::ImageStoreFailed(format!("File not found: {}", body))),
            400 => Err(Error::ImageStoreFailed(format!("Bad request: {}", body))),
            500..=599 => Err(Error::ImageStoreFailed(format!(
                "Server error ({}): {}",
                status, body
            ))),
            _ => Err(Error::ImageStoreFailed(format!(
                "HTTP error {}: {}",
                status, body
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    url: String,
}

#[async_trait]
impl ImageStore for ImageKitClient {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<StoredImage> {
        debug!(file_name, size = bytes.len(), folder = %self.folder, "Uploading image");

        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes.to_vec()).file_name(file_name.to_string()),
            )
            .text("fileName", file_name.to_string())
            .text("folder", self.folder.clone());

        let response = self
            .http_client
            .post(&self.upload_url)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::ImageStoreFailed(format!("Failed to parse response: {}", e)))?;

        debug!(file_id = %uploaded.file_id, "Image uploaded");

        Ok(StoredImage {
            url: uploaded.url,
            file_id: uploaded.file_id,
        })
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        debug!(file_id, "Deleting image");

        let response = self
            .http_client
            .delete(self.delete_url(file_id))
            .basic_auth(&self.private_key, Some(""))
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_private_key() {
        let result = ImageKitClient::builder().build();
        assert!(matches!(result, Err(Error::ApiKeyMissing(IMAGE_STORE_KEY_VAR))));
    }

    #[test]
    fn test_builder_uses_config() {
        let config = ImagesConfig {
            folder: "captions".to_string(),
            api_url: "https://api.example.com/v1/".to_string(),
            ..ImagesConfig::default()
        };
        let client = ImageKitClient::builder()
            .config(config)
            .private_key("private_test")
            .build()
            .unwrap();

        assert_eq!(client.folder(), "captions");
        assert_eq!(
            client.delete_url("abc123"),
            "https://api.example.com/v1/files/abc123"
        );
    }

    #[test]
    fn test_debug_hides_private_key() {
        let client = ImageKitClient::builder()
            .private_key("private_secret")
            .build()
            .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("private_secret"));
    }

    #[test]
    fn test_upload_response_parsing() {
        let json = r#"{"fileId":"f_1","name":"x","url":"https://ik.imagekit.io/demo/x.jpg","size":10}"#;
        let parsed: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.file_id, "f_1");
        assert_eq!(parsed.url, "https://ik.imagekit.io/demo/x.jpg");
    }
}
