//! Gemini image generation adapter.
//!
//! # Request Format
//!
//! - **URL**: `{base_url}/v1beta/models/{model}:generateImages`
//! - **Method**: POST
//! - **Authentication**: `key` query parameter
//! - **Body**: JSON prompt plus generation config; reference images are
//!   embedded as inline base64 blocks when present
//!
//! The response payload is base64 under `generatedImages[0].image`, reported
//! as `imageBytes` or `bytesBase64Encoded` depending on API surface.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;

use super::base::{
    classify_http_failure, classify_send_error, ensure_non_empty, ImageRequest, Provider,
    ProviderError, ProviderResult,
};

const NAME: &str = "gemini-image";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_SIZE: &str = "1024x1024";

/// Adapter over the Gemini image generation REST API.
pub struct GeminiImageProvider {
    api_key: String,
    model: String,
    base_url: String,
    aspect_ratio: String,
    /// This backend accepts image-conditioned generation; recorded once at
    /// construction so callers never probe per call.
    supports_reference_images: bool,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct GenerateImagesResponse {
    #[serde(rename = "generatedImages", default)]
    generated_images: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    image: Option<InlineImage>,
}

#[derive(Deserialize)]
struct InlineImage {
    #[serde(rename = "imageBytes", alias = "bytesBase64Encoded")]
    image_bytes: Option<String>,
}

/// Reduces a `WxH` size string to the `W:H` ratio the API expects.
fn aspect_ratio(size: &str) -> String {
    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 { a } else { gcd(b, a % b) }
    }
    let parsed = size
        .split_once('x')
        .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
    match parsed {
        Some((w, h)) if w > 0 && h > 0 => {
            let d = gcd(w, h);
            format!("{}:{}", w / d, h / d)
        }
        _ => "1:1".to_string(),
    }
}

impl GeminiImageProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            aspect_ratio: aspect_ratio(DEFAULT_SIZE),
            supports_reference_images: true,
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the API origin, used to point the adapter at a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, request: &ImageRequest) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/v1beta/models/{}:generateImages",
            self.base_url, self.model
        );

        let mut body = serde_json::json!({
            "prompt": { "text": request.prompt },
            "config": {
                "numberOfImages": 1,
                "aspectRatio": self.aspect_ratio,
            },
        });
        if self.supports_reference_images && !request.reference_images.is_empty() {
            let references: Vec<serde_json::Value> = request
                .reference_images
                .iter()
                .map(|bytes| {
                    serde_json::json!({
                        "image": { "bytesBase64Encoded": BASE64.encode(bytes) }
                    })
                })
                .collect();
            body["referenceImages"] = serde_json::Value::Array(references);
        }

        self.client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
    }
}

#[async_trait]
impl Provider<ImageRequest> for GeminiImageProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &ImageRequest) -> ProviderResult<Vec<u8>> {
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

        let parsed: GenerateImagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::permanent(NAME, format!("malformed response: {e}")))?;
        let b64 = parsed
            .generated_images
            .into_iter()
            .next()
            .and_then(|g| g.image)
            .and_then(|i| i.image_bytes)
            .ok_or_else(|| ProviderError::permanent(NAME, "response carried no image payload"))?;

        let bytes = BASE64
            .decode(b64.as_bytes())
            .map_err(|e| ProviderError::permanent(NAME, format!("invalid base64: {e}")))?;
        ensure_non_empty(NAME, bytes)
    }
}
