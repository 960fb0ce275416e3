//! Google Cloud Text-to-Speech adapter.
//!
//! # Request Format
//!
//! - **URL**: `{base_url}/v1/text:synthesize`
//! - **Method**: POST
//! - **Authentication**: `key` query parameter
//! - **Body**: JSON input/voice/audioConfig, `LINEAR16` encoding
//!
//! The response wraps the WAV payload as base64 `audioContent`. Preset
//! voices from other backends' namespaces are substituted with this
//! backend's default voice; the known-voice set is fixed at construction.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use tracing::warn;

use super::base::{
    classify_http_failure, classify_send_error, ensure_non_empty, Provider, ProviderError,
    ProviderResult, SpeechRequest,
};

const NAME: &str = "google-speech";
const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";
const DEFAULT_VOICE: &str = "Charon";

/// Voice names this backend accepts.
const KNOWN_VOICES: &[&str] = &[
    "Puck", "Charon", "Kore", "Fenrir", "Aoede", "Leda", "Orus", "Zephyr",
];

/// Adapter over the Google Cloud TTS REST API.
pub struct GoogleSpeechProvider {
    api_key: String,
    model: Option<String>,
    base_url: String,
    known_voices: &'static [&'static str],
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

impl GoogleSpeechProvider {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            known_voices: KNOWN_VOICES,
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the API origin, used to point the adapter at a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn effective_voice<'a>(&self, requested: &'a str) -> &'a str {
        if self.known_voices.contains(&requested) {
            requested
        } else {
            warn!(
                requested,
                fallback = DEFAULT_VOICE,
                "voice outside backend namespace, substituting default"
            );
            DEFAULT_VOICE
        }
    }

    fn build_request(&self, request: &SpeechRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/text:synthesize", self.base_url);
        let mut voice = serde_json::json!({
            "languageCode": request.locale,
            "name": self.effective_voice(&request.voice),
        });
        if let Some(model) = &self.model {
            voice["modelName"] = serde_json::Value::String(model.clone());
        }
        let body = serde_json::json!({
            "input": { "text": request.text },
            "voice": voice,
            "audioConfig": { "audioEncoding": "LINEAR16" },
        });
        self.client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
    }
}

#[async_trait]
impl Provider<SpeechRequest> for GoogleSpeechProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
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

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::permanent(NAME, format!("malformed response: {e}")))?;
        let b64 = parsed
            .audio_content
            .ok_or_else(|| ProviderError::permanent(NAME, "response carried no audioContent"))?;
        let bytes = BASE64
            .decode(b64.as_bytes())
            .map_err(|e| ProviderError::permanent(NAME, format!("invalid base64: {e}")))?;
        ensure_non_empty(NAME, bytes)
    }
}
