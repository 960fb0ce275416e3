//! OpenAI image generation adapter.
//!
//! # Request Format
//!
//! - **URL**: `{base_url}/v1/images/generations`
//! - **Method**: POST
//! - **Authentication**: `Authorization: Bearer {api_key}`
//! - **Body**: JSON with model, prompt, and the correlation id as `user`
//!
//! The response carries either an inline `b64_json` payload or a short-lived
//! `url` requiring a follow-up fetch; both shapes normalize to raw bytes.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use tracing::debug;

use super::base::{
    classify_http_failure, classify_send_error, ensure_non_empty, ImageRequest, Provider,
    ProviderError, ProviderResult,
};

const NAME: &str = "openai-image";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Adapter over the OpenAI image generation REST API.
pub struct OpenAiImageProvider {
    api_key: String,
    model: String,
    base_url: String,
    /// This backend takes no image-conditioning inputs; recorded once at
    /// construction so callers never probe per call.
    supports_reference_images: bool,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

impl OpenAiImageProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            supports_reference_images: false,
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the API origin, used to point the adapter at a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, request: &ImageRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/images/generations", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "n": 1,
            "size": "1024x1024",
            "user": request.correlation_id,
        });
        self.client.post(url).bearer_auth(&self.api_key).json(&body)
    }

    async fn fetch_url(&self, url: &str) -> ProviderResult<Vec<u8>> {
        // The returned URL is short-lived; a fetch failure is worth a retry
        // elsewhere in the chain, not a permanent rejection.
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_send_error(NAME, e))?;
        if !response.status().is_success() {
            return Err(ProviderError::transient(
                NAME,
                format!("image url fetch returned {}", response.status()),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(NAME, e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Provider<ImageRequest> for OpenAiImageProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &ImageRequest) -> ProviderResult<Vec<u8>> {
        if !request.reference_images.is_empty() && !self.supports_reference_images {
            debug!(
                correlation_id = %request.correlation_id,
                count = request.reference_images.len(),
                "reference images ignored, backend does not take image inputs"
            );
        }

        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| classify_send_error(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(NAME, status, &body));
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::permanent(NAME, format!("malformed response: {e}")))?;
        let datum = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::permanent(NAME, "response carried no image data"))?;

        let bytes = if let Some(b64) = datum.b64_json {
            BASE64
                .decode(b64.as_bytes())
                .map_err(|e| ProviderError::permanent(NAME, format!("invalid base64: {e}")))?
        } else if let Some(url) = datum.url {
            self.fetch_url(&url).await?
        } else {
            return Err(ProviderError::permanent(
                NAME,
                "response carried neither b64_json nor url",
            ));
        };

        ensure_non_empty(NAME, bytes)
    }
}
