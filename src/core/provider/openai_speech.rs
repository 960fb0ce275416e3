//! OpenAI speech synthesis adapter.
//!
//! # Request Format
//!
//! - **URL**: `{base_url}/v1/audio/speech`
//! - **Method**: POST
//! - **Authentication**: `Authorization: Bearer {api_key}`
//! - **Body**: JSON with model, voice, input text, and `wav` output format
//!
//! The response body is the raw WAV container. Preset voices outside the
//! backend's fixed voice set are substituted with the default voice rather
//! than rejected; the supported set is recorded at construction.

use async_trait::async_trait;
use tracing::warn;

use super::base::{
    classify_http_failure, classify_send_error, ensure_non_empty, Provider, ProviderResult,
    SpeechRequest,
};
use crate::core::voice::DEFAULT_PRESET;

const NAME: &str = "openai-speech";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Voice ids the speech endpoint accepts.
const SUPPORTED_VOICES: &[&str] = &[
    "alloy", "ash", "coral", "fable", "onyx", "sage", "echo", "nova", "shimmer",
];

/// Adapter over the OpenAI speech REST API.
pub struct OpenAiSpeechProvider {
    api_key: String,
    model: String,
    base_url: String,
    supported_voices: &'static [&'static str],
    client: reqwest::Client,
}

impl OpenAiSpeechProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            supported_voices: SUPPORTED_VOICES,
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the API origin, used to point the adapter at a test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Gates the requested voice against the backend's fixed set,
    /// substituting the default voice for anything unknown.
    fn effective_voice<'a>(&self, requested: &'a str) -> &'a str {
        if self.supported_voices.contains(&requested) {
            requested
        } else {
            warn!(
                requested,
                fallback = DEFAULT_PRESET.voice,
                "voice not supported by backend, substituting default"
            );
            DEFAULT_PRESET.voice
        }
    }

    fn build_request(&self, request: &SpeechRequest) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "voice": self.effective_voice(&request.voice),
            "input": request.text,
            "response_format": "wav",
        });
        self.client.post(url).bearer_auth(&self.api_key).json(&body)
    }
}

#[async_trait]
impl Provider<SpeechRequest> for OpenAiSpeechProvider {
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

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_send_error(NAME, e))?;
        ensure_non_empty(NAME, bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiSpeechProvider {
        OpenAiSpeechProvider::new("test-key", "tts-1")
    }

    fn speech_request(voice: &str) -> SpeechRequest {
        SpeechRequest {
            text: "Once upon a time.".to_string(),
            correlation_id: "req-1".to_string(),
            locale: "ko-KR".to_string(),
            voice: voice.to_string(),
            markup_voice: "ko-KR-SunHiNeural".to_string(),
            style: None,
            style_degree: None,
            rate: None,
        }
    }

    #[test]
    fn test_build_request_shape() {
        let built = provider()
            .build_request(&speech_request("coral"))
            .build()
            .unwrap();

        assert_eq!(built.url().as_str(), "https://api.openai.com/v1/audio/speech");
        assert_eq!(
            built.headers().get("authorization").unwrap(),
            "Bearer test-key"
        );
        let body: serde_json::Value =
            serde_json::from_slice(built.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["model"], "tts-1");
        assert_eq!(body["voice"], "coral");
        assert_eq!(body["input"], "Once upon a time.");
        assert_eq!(body["response_format"], "wav");
    }

    #[test]
    fn test_unsupported_voice_substitutes_default() {
        let built = provider()
            .build_request(&speech_request("ko-KR-SunHiNeural"))
            .build()
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(built.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["voice"], DEFAULT_PRESET.voice);
    }

    #[test]
    fn test_every_preset_voice_is_supported() {
        use crate::core::voice::{resolve, SegmentType, NARRATION_PRESET};

        let p = provider();
        assert_eq!(p.effective_voice(NARRATION_PRESET.voice), NARRATION_PRESET.voice);
        for slug in ["lulu-rabbit", "robo-roro", "mimi-fairy", "nova-space"] {
            let preset = resolve(SegmentType::Dialogue, slug);
            assert_eq!(p.effective_voice(preset.voice), preset.voice);
        }
    }
}
