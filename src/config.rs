//! Media pipeline configuration.
//!
//! Loaded once at process start from environment variables (with `.env`
//! support) and handed to [`crate::core::media::MediaService`]; nothing is
//! re-read per request. Validation catches unusable combinations before any
//! adapter is built.

use std::env;
use std::time::Duration;

use crate::core::dispatch::RetryPolicy;
use crate::core::provider::ProviderError;
use crate::errors::{MediaError, MediaResult};

const DEFAULT_OPENAI_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_OPENAI_SPEECH_MODEL: &str = "tts-1";
const DEFAULT_AZURE_OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 2;
const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

/// Static configuration for the media pipeline.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    // Credentials
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub google_tts_api_key: Option<String>,
    pub azure_speech_key: Option<String>,
    pub azure_speech_region: Option<String>,

    // Backend selection
    pub prefer_gemini_image: bool,
    pub use_azure_markup: bool,

    // Models and formats
    pub openai_image_model: String,
    pub gemini_image_model: String,
    pub openai_speech_model: String,
    pub google_tts_model: Option<String>,
    pub azure_output_format: String,

    // Retry and payload knobs
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub max_payload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            google_tts_api_key: None,
            azure_speech_key: None,
            azure_speech_region: None,
            prefer_gemini_image: false,
            use_azure_markup: false,
            openai_image_model: DEFAULT_OPENAI_IMAGE_MODEL.to_string(),
            gemini_image_model: DEFAULT_GEMINI_IMAGE_MODEL.to_string(),
            openai_speech_model: DEFAULT_OPENAI_SPEECH_MODEL.to_string(),
            google_tts_model: None,
            azure_output_format: DEFAULT_AZURE_OUTPUT_FORMAT.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag(name: &str) -> bool {
    var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl MediaConfig {
    /// Loads configuration from environment variables, honoring a `.env`
    /// file when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            openai_api_key: var("OPENAI_API_KEY"),
            gemini_api_key: var("GEMINI_API_KEY"),
            google_tts_api_key: var("GOOGLE_TTS_API_KEY").or_else(|| var("GEMINI_API_KEY")),
            azure_speech_key: var("AZURE_SPEECH_KEY"),
            azure_speech_region: var("AZURE_SPEECH_REGION"),
            prefer_gemini_image: flag("USE_GEMINI_IMAGE"),
            use_azure_markup: flag("USE_AZURE_TTS"),
            openai_image_model: var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.openai_image_model),
            gemini_image_model: var("GEMINI_IMAGE_MODEL").unwrap_or(defaults.gemini_image_model),
            openai_speech_model: var("OPENAI_SPEECH_MODEL")
                .unwrap_or(defaults.openai_speech_model),
            google_tts_model: var("GOOGLE_TTS_MODEL"),
            azure_output_format: var("AZURE_TTS_OUTPUT_FORMAT")
                .unwrap_or(defaults.azure_output_format),
            max_attempts: var("MEDIA_MAX_ATTEMPTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            backoff_base: Duration::from_secs(
                var("MEDIA_BACKOFF_BASE_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_BACKOFF_BASE_SECS),
            ),
            max_payload_bytes: var("TTS_MAX_PAYLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES),
        }
    }

    /// Retry policy derived from the configured knobs.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.backoff_base,
        }
    }

    /// Rejects configurations no adapter set can be built from.
    pub fn validate(&self) -> MediaResult<()> {
        let fail = |message: &str| {
            Err(MediaError::Configuration(ProviderError::configuration(
                "config", message,
            )))
        };

        if self.openai_api_key.is_none() && self.gemini_api_key.is_none() {
            return fail("no image backend configured: set OPENAI_API_KEY or GEMINI_API_KEY");
        }
        if self.openai_api_key.is_none() && self.google_tts_api_key.is_none() {
            return fail(
                "no speech backend configured: set OPENAI_API_KEY or GOOGLE_TTS_API_KEY",
            );
        }
        if self.use_azure_markup
            && (self.azure_speech_key.is_none() || self.azure_speech_region.is_none())
        {
            return fail(
                "USE_AZURE_TTS requires AZURE_SPEECH_KEY and AZURE_SPEECH_REGION",
            );
        }
        if self.max_attempts == 0 {
            return fail("MEDIA_MAX_ATTEMPTS must be at least 1");
        }
        if self.max_payload_bytes == 0 {
            return fail("TTS_MAX_PAYLOAD_BYTES must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> MediaConfig {
        MediaConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..MediaConfig::default()
        }
    }

    #[test]
    fn test_minimal_config_validates() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_missing_backends_rejected() {
        let config = MediaConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_azure_markup_requires_key_and_region() {
        let mut config = minimal();
        config.use_azure_markup = true;
        assert!(config.validate().is_err());

        config.azure_speech_key = Some("az".to_string());
        config.azure_speech_region = Some("koreacentral".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = minimal();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_carries_knobs() {
        let mut config = minimal();
        config.max_attempts = 5;
        config.backoff_base = Duration::from_secs(1);
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }
}
