//! Generation backend adapters and their shared abstractions.

pub mod azure_speech;
pub mod base;
pub mod gemini_image;
pub mod google_speech;
pub mod openai_image;
pub mod openai_speech;

pub use azure_speech::{AzureOutputFormat, AzureSpeechProvider};
pub use base::{
    ImageRequest, MarkupSynthesizer, Provider, ProviderError, ProviderResult, SpeechRequest,
};
pub use gemini_image::GeminiImageProvider;
pub use google_speech::GoogleSpeechProvider;
pub use openai_image::OpenAiImageProvider;
pub use openai_speech::OpenAiSpeechProvider;
