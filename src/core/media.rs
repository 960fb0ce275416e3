//! # Media Service
//!
//! Caller-facing facade over the image chain and the reading-plan
//! synthesizer. Adapter chains are built once from configuration at startup
//! in an explicit order and shared read-only across requests; image and
//! audio for one page run as two concurrent tasks joined before returning,
//! with no partial-success delivery.

use std::sync::Arc;

use tracing::info;

use crate::config::MediaConfig;
use crate::core::dispatch::ProviderChain;
use crate::core::narration::{determine_locale, ReadingPlanSynthesizer};
use crate::core::provider::{
    AzureOutputFormat, AzureSpeechProvider, GeminiImageProvider, GoogleSpeechProvider,
    ImageRequest, MarkupSynthesizer, OpenAiImageProvider, OpenAiSpeechProvider, Provider,
    SpeechRequest,
};
use crate::core::voice::{CharacterRef, NarrationSegment};
use crate::errors::MediaResult;

/// Combined output of one page generation.
#[derive(Debug, Clone)]
pub struct PageMedia {
    pub image: Vec<u8>,
    pub image_provider: String,
    pub audio: Vec<u8>,
}

/// Process-lifetime media pipeline: one image chain, one speech chain.
pub struct MediaService {
    images: ProviderChain<ImageRequest>,
    synthesizer: ReadingPlanSynthesizer,
}

impl MediaService {
    pub fn new(images: ProviderChain<ImageRequest>, synthesizer: ReadingPlanSynthesizer) -> Self {
        Self {
            images,
            synthesizer,
        }
    }

    /// Builds the full service from static configuration.
    ///
    /// Image order: Gemini first when `prefer_gemini_image` is set and a key
    /// exists, otherwise OpenAI first. Speech order: OpenAI, then Google.
    /// The markup-capable Azure backend joins only when explicitly enabled
    /// and fully configured.
    pub fn from_config(config: &MediaConfig) -> MediaResult<Self> {
        config.validate()?;

        let mut image_providers: Vec<Arc<dyn Provider<ImageRequest>>> = Vec::new();
        let gemini = config
            .gemini_api_key
            .as_ref()
            .map(|key| Arc::new(GeminiImageProvider::new(key, &config.gemini_image_model)));
        let openai_image = config
            .openai_api_key
            .as_ref()
            .map(|key| Arc::new(OpenAiImageProvider::new(key, &config.openai_image_model)));
        if config.prefer_gemini_image {
            if let Some(p) = gemini {
                image_providers.push(p);
            }
            if let Some(p) = openai_image {
                image_providers.push(p);
            }
        } else {
            if let Some(p) = openai_image {
                image_providers.push(p);
            }
            if let Some(p) = gemini {
                image_providers.push(p);
            }
        }

        let mut speech_providers: Vec<Arc<dyn Provider<SpeechRequest>>> = Vec::new();
        if let Some(key) = &config.openai_api_key {
            speech_providers.push(Arc::new(OpenAiSpeechProvider::new(
                key,
                &config.openai_speech_model,
            )));
        }
        if let Some(key) = &config.google_tts_api_key {
            speech_providers.push(Arc::new(GoogleSpeechProvider::new(
                key,
                config.google_tts_model.clone(),
            )));
        }

        let markup: Option<Arc<dyn MarkupSynthesizer>> = match (
            config.use_azure_markup,
            &config.azure_speech_key,
            &config.azure_speech_region,
        ) {
            (true, Some(key), Some(region)) => Some(Arc::new(AzureSpeechProvider::new(
                key,
                region,
                AzureOutputFormat::from_label(&config.azure_output_format),
            ))),
            _ => None,
        };

        let policy = config.retry_policy();
        let images = ProviderChain::new(image_providers, policy);
        let speech = ProviderChain::new(speech_providers, policy);
        info!(
            image_providers = ?images.provider_names(),
            speech_providers = ?speech.provider_names(),
            markup = markup.is_some(),
            "media service configured"
        );

        Ok(Self::new(
            images,
            ReadingPlanSynthesizer::new(speech, markup, config.max_payload_bytes),
        ))
    }

    /// Names of the configured image adapters, in dispatch order.
    pub fn image_provider_names(&self) -> Vec<String> {
        self.images.provider_names()
    }

    /// Generates one illustration, returning the bytes and the name of the
    /// adapter that produced them.
    pub async fn generate_image(
        &self,
        prompt: &str,
        correlation_id: &str,
        reference_images: Vec<Vec<u8>>,
    ) -> MediaResult<(Vec<u8>, String)> {
        let request = ImageRequest::new(prompt, correlation_id, reference_images);
        self.images.dispatch(&request).await
    }

    /// Synthesizes an ordered reading plan into one audio buffer.
    pub async fn synthesize_reading_plan(
        &self,
        segments: &[NarrationSegment],
        roster: &[CharacterRef],
        locale: &str,
        correlation_id: &str,
    ) -> MediaResult<Vec<u8>> {
        self.synthesizer
            .synthesize_reading_plan(segments, roster, locale, correlation_id)
            .await
    }

    /// Synthesizes one standalone paragraph in the given language.
    pub async fn synthesize_paragraph(
        &self,
        text: &str,
        language: &str,
        correlation_id: &str,
    ) -> MediaResult<Vec<u8>> {
        self.synthesizer
            .synthesize_paragraph(text, determine_locale(language), correlation_id)
            .await
    }

    /// Generates the illustration and the narration for one page as two
    /// concurrent tasks. Either failure fails the whole operation; there is
    /// no partial delivery.
    pub async fn generate_page_media(
        &self,
        prompt: &str,
        segments: &[NarrationSegment],
        roster: &[CharacterRef],
        language: &str,
        correlation_id: &str,
    ) -> MediaResult<PageMedia> {
        let locale = determine_locale(language);

        let ((image, image_provider), audio) = tokio::try_join!(
            self.generate_image(prompt, correlation_id, Vec::new()),
            self.synthesize_reading_plan(segments, roster, locale, correlation_id),
        )?;

        Ok(PageMedia {
            image,
            image_provider,
            audio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::{parse_wav, write_wav, WavParams};
    use crate::core::dispatch::RetryPolicy;
    use crate::core::provider::ProviderResult;
    use async_trait::async_trait;

    fn base_config() -> MediaConfig {
        MediaConfig {
            openai_api_key: Some("sk-test".to_string()),
            gemini_api_key: Some("gm-test".to_string()),
            google_tts_api_key: Some("gt-test".to_string()),
            ..MediaConfig::default()
        }
    }

    #[test]
    fn test_default_image_order_is_openai_first() {
        let service = MediaService::from_config(&base_config()).unwrap();
        assert_eq!(
            service.image_provider_names(),
            vec!["openai-image", "gemini-image"]
        );
    }

    #[test]
    fn test_prefer_gemini_reorders_image_chain() {
        let mut config = base_config();
        config.prefer_gemini_image = true;
        let service = MediaService::from_config(&config).unwrap();
        assert_eq!(
            service.image_provider_names(),
            vec!["gemini-image", "openai-image"]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(MediaService::from_config(&MediaConfig::default()).is_err());
    }

    struct StaticImage;

    #[async_trait]
    impl Provider<ImageRequest> for StaticImage {
        fn name(&self) -> &str {
            "static-image"
        }

        async fn generate(&self, _request: &ImageRequest) -> ProviderResult<Vec<u8>> {
            Ok(b"png-bytes".to_vec())
        }
    }

    struct StaticSpeech;

    #[async_trait]
    impl Provider<SpeechRequest> for StaticSpeech {
        fn name(&self) -> &str {
            "static-speech"
        }

        async fn generate(&self, _request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
            let params = WavParams {
                channels: 1,
                bits_per_sample: 16,
                sample_rate: 24_000,
            };
            Ok(write_wav(params, &[5, 5]))
        }
    }

    fn mock_service() -> MediaService {
        let images: Vec<Arc<dyn Provider<ImageRequest>>> = vec![Arc::new(StaticImage)];
        let speech: Vec<Arc<dyn Provider<SpeechRequest>>> = vec![Arc::new(StaticSpeech)];
        MediaService::new(
            ProviderChain::new(images, RetryPolicy::default()),
            ReadingPlanSynthesizer::new(
                ProviderChain::new(speech, RetryPolicy::default()),
                None,
                4096,
            ),
        )
    }

    #[tokio::test]
    async fn test_generate_page_media_joins_image_and_audio() {
        let service = mock_service();
        let segments = vec![NarrationSegment::narration("옛날 옛적에.")];

        let page = service
            .generate_page_media("a meadow", &segments, &[], "ko", "req-1")
            .await
            .unwrap();

        assert_eq!(page.image, b"png-bytes");
        assert_eq!(page.image_provider, "static-image");
        let (_, data) = parse_wav(&page.audio).unwrap();
        assert_eq!(data, &[5, 5]);
    }

    #[tokio::test]
    async fn test_paragraph_synthesis_routes_through_speech_chain() {
        let service = mock_service();
        service
            .synthesize_paragraph("안녕하세요.", "ko", "req-2")
            .await
            .unwrap();
    }
}
