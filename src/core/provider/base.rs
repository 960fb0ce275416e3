//! # Provider Base Abstractions
//!
//! This module defines the uniform interface every generation backend is
//! wrapped behind, along with the typed error each adapter normalizes vendor
//! failures into. Adapters are built once at startup, hold a lazily-built
//! HTTP client, and are otherwise stateless; the dispatcher treats them as
//! interchangeable `generate(request) -> bytes` collaborators.

use async_trait::async_trait;

/// A request for one generated illustration.
///
/// Created at the boundary for a single call and discarded once bytes return.
/// Reference images are opaque byte buffers already loaded by the caller,
/// forwarded to adapters that support image-conditioned generation.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Fully assembled prompt text.
    pub prompt: String,
    /// Correlation id threaded through logs and vendor `user` fields.
    pub correlation_id: String,
    /// Zero or more reference image byte buffers.
    pub reference_images: Vec<Vec<u8>>,
}

impl ImageRequest {
    pub fn new(
        prompt: impl Into<String>,
        correlation_id: impl Into<String>,
        reference_images: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            correlation_id: correlation_id.into(),
            reference_images,
        }
    }
}

/// A request for one synthesized speech unit.
///
/// Carries the resolved voice preset in full: adapters pick the fields that
/// exist in their own namespace (`voice` for plain engine voice ids,
/// `markup_voice`/`style`/`rate` for markup-capable backends) and ignore the
/// rest.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Cleaned text to synthesize.
    pub text: String,
    /// Correlation id threaded through logs.
    pub correlation_id: String,
    /// BCP-47 locale for the synthesis, e.g. `ko-KR`.
    pub locale: String,
    /// Plain engine voice id (e.g. `alloy`).
    pub voice: String,
    /// Markup-engine voice name (e.g. `ko-KR-SunHiNeural`).
    pub markup_voice: String,
    /// Expressive style tag, already emotion-overridden where applicable.
    pub style: Option<String>,
    /// Style intensity modifier.
    pub style_degree: Option<String>,
    /// Speaking rate modifier (e.g. `+10%`).
    pub rate: Option<String>,
}

/// Typed error every adapter normalizes vendor failures into.
///
/// The tag decides dispatcher behavior: `RateLimited` is the only class
/// eligible for list-level backoff retry; `Configuration` and `Permanent`
/// fall through to the next adapter without consuming backoff budget;
/// `Transient` likewise falls through and is not backed off individually.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider '{provider}' is not usable: {message}")]
    Configuration { provider: String, message: String },

    #[error("provider '{provider}' rate limited: {message}")]
    RateLimited { provider: String, message: String },

    #[error("provider '{provider}' transient failure: {message}")]
    Transient { provider: String, message: String },

    #[error("provider '{provider}' permanent failure: {message}")]
    Permanent { provider: String, message: String },
}

impl ProviderError {
    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Name of the provider that produced this error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Configuration { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Transient { provider, .. }
            | Self::Permanent { provider, .. } => provider,
        }
    }

    /// True when the error is eligible for list-level backoff retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Uniform interface over one external generation backend.
///
/// `R` is the request shape the backend consumes (`ImageRequest` or
/// `SpeechRequest`); the chain dispatcher is generic over it, so image and
/// speech chains share the same fallback/backoff logic.
#[async_trait]
pub trait Provider<R: Send + Sync>: Send + Sync {
    /// Stable adapter name used in logs and aggregate errors.
    fn name(&self) -> &str;

    /// Generate bytes for the request, or fail with a classified error.
    ///
    /// An empty result is a `Permanent` error, never a success.
    async fn generate(&self, request: &R) -> ProviderResult<Vec<u8>>;
}

/// A backend capable of synthesizing one structured multi-voice document in
/// a single call (e.g. an SSML document with one voice block per segment).
#[async_trait]
pub trait MarkupSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize the whole document as one request.
    async fn synthesize_markup(
        &self,
        document: &str,
        correlation_id: &str,
    ) -> ProviderResult<Vec<u8>>;
}

/// Maps an HTTP failure response to a `ProviderError` subtype.
///
/// This is the single place vendor-specific heuristics live: capacity errors
/// are frequently reported with non-429 statuses but recognizable body
/// signatures, so the body text participates in classification.
pub(crate) fn classify_http_failure(
    provider: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> ProviderError {
    let lowered = body.to_lowercase();
    let looks_rate_limited = lowered.contains("rate limit")
        || lowered.contains("rate_limit")
        || lowered.contains("resource_exhausted")
        || lowered.contains("quota")
        || lowered.contains("capacity")
        || lowered.contains("overloaded");

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || looks_rate_limited {
        return ProviderError::rate_limited(provider, format!("{status}: {body}"));
    }

    match status.as_u16() {
        401 | 403 => ProviderError::configuration(provider, format!("{status}: {body}")),
        400 | 404 | 413 | 422 => ProviderError::permanent(provider, format!("{status}: {body}")),
        _ => ProviderError::transient(provider, format!("{status}: {body}")),
    }
}

/// Maps a failed `reqwest` send (connect error, timeout, ...) to a
/// `ProviderError`. These never reached the vendor, so they are transient.
pub(crate) fn classify_send_error(provider: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::transient(provider, format!("request failed: {err}"))
}

/// Rejects empty payloads: a zero-length result is a malformed response,
/// never a success.
pub(crate) fn ensure_non_empty(provider: &str, bytes: Vec<u8>) -> ProviderResult<Vec<u8>> {
    if bytes.is_empty() {
        Err(ProviderError::permanent(provider, "empty response payload"))
    } else {
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_classify_429_is_rate_limited() {
        let err = classify_http_failure("openai", StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_rate_limited());
        assert_eq!(err.provider(), "openai");
    }

    #[test]
    fn test_classify_body_signature_is_rate_limited() {
        // Gemini reports capacity problems as 503 with RESOURCE_EXHAUSTED text
        let err = classify_http_failure(
            "gemini",
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_classify_auth_failures_are_configuration() {
        let err = classify_http_failure("openai", StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, ProviderError::Configuration { .. }));

        let err = classify_http_failure("openai", StatusCode::FORBIDDEN, "no access");
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[test]
    fn test_classify_client_errors_are_permanent() {
        let err = classify_http_failure("gemini", StatusCode::BAD_REQUEST, "bad prompt");
        assert!(matches!(err, ProviderError::Permanent { .. }));
    }

    #[test]
    fn test_classify_server_errors_are_transient() {
        let err = classify_http_failure("openai", StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, ProviderError::Transient { .. }));
    }

    #[test]
    fn test_empty_payload_is_permanent() {
        let err = ensure_non_empty("openai", Vec::new()).unwrap_err();
        assert!(matches!(err, ProviderError::Permanent { .. }));

        let ok = ensure_non_empty("openai", vec![1, 2, 3]).unwrap();
        assert_eq!(ok, vec![1, 2, 3]);
    }
}
