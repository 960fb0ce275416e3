//! Microsoft Azure Text-to-Speech adapter.
//!
//! # Request Format
//!
//! - **URL**: `https://{region}.tts.speech.microsoft.com/cognitiveservices/v1`
//! - **Method**: POST
//! - **Authentication**: `Ocp-Apim-Subscription-Key` header
//! - **Content-Type**: `application/ssml+xml`
//! - **Output format**: `X-Microsoft-OutputFormat` header
//! - **Body**: SSML document with voice, expressive style, and prosody
//!
//! This is the markup-capable backend: besides per-segment synthesis it can
//! take one multi-voice SSML document and render a whole reading plan in a
//! single call. The SSML builders live here so the markup dialect stays
//! localized to the one adapter that speaks it.

use async_trait::async_trait;

use super::base::{
    classify_http_failure, classify_send_error, ensure_non_empty, MarkupSynthesizer, Provider,
    ProviderResult, SpeechRequest,
};

const NAME: &str = "azure-speech";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const USER_AGENT: &str = "fabula-media";

/// Audio output formats the synthesis endpoint supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AzureOutputFormat {
    Riff24Khz16BitMonoPcm,
    Riff16Khz16BitMonoPcm,
    Riff8Khz16BitMonoPcm,
    Audio24Khz48KBitRateMonoMp3,
}

impl AzureOutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Riff24Khz16BitMonoPcm => "riff-24khz-16bit-mono-pcm",
            Self::Riff16Khz16BitMonoPcm => "riff-16khz-16bit-mono-pcm",
            Self::Riff8Khz16BitMonoPcm => "riff-8khz-16bit-mono-pcm",
            Self::Audio24Khz48KBitRateMonoMp3 => "audio-24khz-48kbitrate-mono-mp3",
        }
    }

    /// Parses a configured label, defaulting to 24 kHz RIFF so the merge
    /// path downstream always sees a parseable container.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "riff-16khz-16bit-mono-pcm" => Self::Riff16Khz16BitMonoPcm,
            "riff-8khz-16bit-mono-pcm" => Self::Riff8Khz16BitMonoPcm,
            "audio-24khz-48kbitrate-mono-mp3" => Self::Audio24Khz48KBitRateMonoMp3,
            _ => Self::Riff24Khz16BitMonoPcm,
        }
    }
}

/// Escapes text for embedding in SSML character data and attributes.
pub(crate) fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Builds one `<voice>` block with expressive style and prosody wrappers.
///
/// `text` must already be escaped. Style and rate wrappers are emitted only
/// when present, so a bare preset produces a bare voice block.
pub(crate) fn voice_element(
    voice: &str,
    style: Option<&str>,
    style_degree: Option<&str>,
    rate: Option<&str>,
    escaped_text: &str,
) -> String {
    let mut inner = escaped_text.to_string();
    if let Some(rate) = rate {
        inner = format!(r#"<prosody rate="{}">{}</prosody>"#, xml_escape(rate), inner);
    }
    if let Some(style) = style {
        let degree = style_degree.unwrap_or("1.0");
        inner = format!(
            r#"<mstts:express-as style="{}" styledegree="{}">{}</mstts:express-as>"#,
            xml_escape(style),
            xml_escape(degree),
            inner
        );
    }
    format!(r#"<voice name="{}">{}</voice>"#, xml_escape(voice), inner)
}

/// Wraps voice blocks in the `<speak>` envelope for the given locale.
pub(crate) fn speak_document(locale: &str, voice_blocks: &str) -> String {
    format!(
        concat!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" "#,
            r#"xmlns:mstts="https://www.w3.org/2001/mstts" xml:lang="{}">{}</speak>"#
        ),
        xml_escape(locale),
        voice_blocks
    )
}

/// Adapter over the Azure TTS REST API.
pub struct AzureSpeechProvider {
    api_key: String,
    output_format: AzureOutputFormat,
    endpoint: String,
    client: reqwest::Client,
}

impl AzureSpeechProvider {
    pub fn new(api_key: impl Into<String>, region: &str, output_format: AzureOutputFormat) -> Self {
        Self {
            api_key: api_key.into(),
            output_format,
            endpoint: format!(
                "https://{region}.tts.speech.microsoft.com/cognitiveservices/v1"
            ),
            client: reqwest::Client::new(),
        }
    }

    /// Overrides the regional endpoint, used to point the adapter at a test
    /// server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(&self, ssml: String) -> reqwest::RequestBuilder {
        self.client
            .post(&self.endpoint)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, self.output_format.as_str())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .body(ssml)
    }

    async fn send_ssml(&self, ssml: String) -> ProviderResult<Vec<u8>> {
        let response = self
            .build_request(ssml)
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

#[async_trait]
impl Provider<SpeechRequest> for AzureSpeechProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn generate(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
        let block = voice_element(
            &request.markup_voice,
            request.style.as_deref(),
            request.style_degree.as_deref(),
            request.rate.as_deref(),
            &xml_escape(&request.text),
        );
        self.send_ssml(speak_document(&request.locale, &block)).await
    }
}

#[async_trait]
impl MarkupSynthesizer for AzureSpeechProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn synthesize_markup(
        &self,
        document: &str,
        _correlation_id: &str,
    ) -> ProviderResult<Vec<u8>> {
        self.send_ssml(document.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AzureSpeechProvider {
        AzureSpeechProvider::new("az-key", "koreacentral", AzureOutputFormat::Riff24Khz16BitMonoPcm)
    }

    #[test]
    fn test_output_format_labels_roundtrip() {
        for format in [
            AzureOutputFormat::Riff24Khz16BitMonoPcm,
            AzureOutputFormat::Riff16Khz16BitMonoPcm,
            AzureOutputFormat::Riff8Khz16BitMonoPcm,
            AzureOutputFormat::Audio24Khz48KBitRateMonoMp3,
        ] {
            assert_eq!(AzureOutputFormat::from_label(format.as_str()), format);
        }
        // unknown labels fall back to the parseable RIFF default
        assert_eq!(
            AzureOutputFormat::from_label("something-else"),
            AzureOutputFormat::Riff24Khz16BitMonoPcm
        );
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"<a & "b's">"#),
            "&lt;a &amp; &quot;b&apos;s&quot;&gt;"
        );
        assert_eq!(xml_escape("안녕"), "안녕");
    }

    #[test]
    fn test_voice_element_full_wrappers() {
        let block = voice_element(
            "ko-KR-SunHiNeural",
            Some("cheerful"),
            Some("1.2"),
            Some("+10%"),
            "Hello!",
        );
        assert_eq!(
            block,
            concat!(
                r#"<voice name="ko-KR-SunHiNeural">"#,
                r#"<mstts:express-as style="cheerful" styledegree="1.2">"#,
                r#"<prosody rate="+10%">Hello!</prosody>"#,
                r#"</mstts:express-as></voice>"#
            )
        );
    }

    #[test]
    fn test_voice_element_without_style_omits_wrappers() {
        let block = voice_element("ko-KR-SunHiNeural", None, None, None, "plain");
        assert_eq!(block, r#"<voice name="ko-KR-SunHiNeural">plain</voice>"#);
    }

    #[test]
    fn test_speak_document_envelope() {
        let doc = speak_document("ko-KR", "<voice>x</voice>");
        assert!(doc.starts_with(r#"<speak version="1.0""#));
        assert!(doc.contains(r#"xml:lang="ko-KR""#));
        assert!(doc.contains("xmlns:mstts"));
        assert!(doc.ends_with("</speak>"));
    }

    #[test]
    fn test_build_request_headers() {
        let built = provider().build_request("<speak/>".to_string()).build().unwrap();

        assert_eq!(
            built.url().as_str(),
            "https://koreacentral.tts.speech.microsoft.com/cognitiveservices/v1"
        );
        assert_eq!(built.headers().get(SUBSCRIPTION_KEY_HEADER).unwrap(), "az-key");
        assert_eq!(
            built.headers().get("content-type").unwrap(),
            "application/ssml+xml"
        );
        assert_eq!(
            built.headers().get(OUTPUT_FORMAT_HEADER).unwrap(),
            "riff-24khz-16bit-mono-pcm"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let built = provider()
            .with_endpoint("http://127.0.0.1:8080/cognitiveservices/v1")
            .build_request(String::new())
            .build()
            .unwrap();
        assert_eq!(
            built.url().as_str(),
            "http://127.0.0.1:8080/cognitiveservices/v1"
        );
    }
}
