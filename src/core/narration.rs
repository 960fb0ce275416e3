//! # Reading-Plan Synthesis
//!
//! Orchestrates the voice resolver, speech provider chain, chunker, and
//! audio assembler to turn an ordered segment list into one continuous
//! audio artifact. Two strategies run in priority order: a single-shot
//! markup document against the markup-capable backend when one is
//! configured, then per-segment synthesis through the fallback chain. A
//! markup failure is logged and falls through rather than failing the
//! request; per-segment synthesis fails atomically, so callers never see
//! partial audio.

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::audio::merge_chunks;
use crate::core::chunker::chunk_lines;
use crate::core::dispatch::ProviderChain;
use crate::core::provider::azure_speech::{speak_document, voice_element, xml_escape};
use crate::core::provider::{MarkupSynthesizer, SpeechRequest};
use crate::core::voice::{infer_style_from_emotion, resolve, CharacterRef, NarrationSegment};
use crate::errors::{MediaError, MediaResult};

/// Lifecycle of one synthesis request, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Planned,
    Synthesizing,
    Assembled,
    Failed,
}

/// Quote characters stripped before synthesis; engines tend to read them
/// aloud or pause oddly around them.
const STRIPPED_QUOTES: &[char] = &['"', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Removes quote characters and collapses surrounding whitespace.
pub fn clean_text_for_speech(text: &str) -> String {
    text.replace(STRIPPED_QUOTES, "").trim().to_string()
}

/// Normalizes a language label to a synthesis locale. Unrecognized labels
/// fall back to Korean, the primary audience.
pub fn determine_locale(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "en" | "en-us" | "english" => "en-US",
        _ => "ko-KR",
    }
}

/// Normalizes an upstream speaker label to a preset slug using the roster:
/// exact slug match first, then case-insensitive display-name match, then a
/// lowercased hyphenation of the label itself.
pub fn normalize_speaker(speaker: &str, roster: &[CharacterRef]) -> String {
    let trimmed = speaker.trim();
    if let Some(entry) = roster.iter().find(|c| c.slug == trimmed) {
        return entry.slug.clone();
    }
    if let Some(entry) = roster
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(trimmed))
    {
        return entry.slug.clone();
    }
    trimmed.to_lowercase().replace(' ', "-")
}

/// Reading-plan synthesizer over a speech provider chain and an optional
/// markup-capable backend.
pub struct ReadingPlanSynthesizer {
    chain: ProviderChain<SpeechRequest>,
    markup: Option<Arc<dyn MarkupSynthesizer>>,
    max_payload_bytes: usize,
}

impl ReadingPlanSynthesizer {
    pub fn new(
        chain: ProviderChain<SpeechRequest>,
        markup: Option<Arc<dyn MarkupSynthesizer>>,
        max_payload_bytes: usize,
    ) -> Self {
        Self {
            chain,
            markup,
            max_payload_bytes,
        }
    }

    /// Builds the multi-voice markup document for the whole plan: one voice
    /// block per non-empty segment, carrying the resolved preset's voice,
    /// style, intensity, and rate, with emotion inference overriding the
    /// style per block.
    fn build_markup_document(
        segments: &[NarrationSegment],
        roster: &[CharacterRef],
        locale: &str,
    ) -> String {
        let mut blocks = String::new();
        for segment in segments {
            let text = clean_text_for_speech(&segment.text);
            if text.is_empty() {
                continue;
            }
            let slug = normalize_speaker(&segment.speaker, roster);
            let preset = resolve(segment.segment_type, &slug);
            let style =
                infer_style_from_emotion(&segment.emotion).unwrap_or(preset.markup_style);
            blocks.push_str(&voice_element(
                preset.markup_voice,
                Some(style),
                Some(preset.markup_style_degree),
                Some(preset.markup_rate),
                &xml_escape(&text),
            ));
        }
        speak_document(locale, &blocks)
    }

    /// Synthesizes an ordered segment list into one audio buffer.
    ///
    /// Tries the single-shot markup path first when a markup backend is
    /// configured; any failure there falls through to per-segment synthesis
    /// via the provider chain, followed by an ordered merge. Fails with
    /// `EmptyPlan` when no segment carries text after cleaning.
    pub async fn synthesize_reading_plan(
        &self,
        segments: &[NarrationSegment],
        roster: &[CharacterRef],
        locale: &str,
        correlation_id: &str,
    ) -> MediaResult<Vec<u8>> {
        info!(
            correlation_id,
            state = ?PlanState::Planned,
            segments = segments.len(),
            "reading plan accepted"
        );

        let non_empty: Vec<&NarrationSegment> = segments
            .iter()
            .filter(|s| !clean_text_for_speech(&s.text).is_empty())
            .collect();
        if non_empty.is_empty() {
            info!(correlation_id, state = ?PlanState::Failed, "no synthesizable segments");
            return Err(MediaError::EmptyPlan);
        }

        if let Some(markup) = &self.markup {
            let document = Self::build_markup_document(segments, roster, locale);
            info!(
                correlation_id,
                state = ?PlanState::Synthesizing,
                backend = markup.name(),
                "trying single-shot markup synthesis"
            );
            match markup.synthesize_markup(&document, correlation_id).await {
                Ok(bytes) if !bytes.is_empty() => {
                    info!(
                        correlation_id,
                        state = ?PlanState::Assembled,
                        bytes = bytes.len(),
                        "markup synthesis succeeded"
                    );
                    return Ok(bytes);
                }
                Ok(_) => {
                    warn!(
                        correlation_id,
                        backend = markup.name(),
                        "markup synthesis returned empty payload, falling back to per-segment"
                    );
                }
                Err(err) => {
                    warn!(
                        correlation_id,
                        backend = markup.name(),
                        error = %err,
                        "markup synthesis failed, falling back to per-segment"
                    );
                }
            }
        }

        info!(
            correlation_id,
            state = ?PlanState::Synthesizing,
            segments = non_empty.len(),
            "per-segment synthesis"
        );
        let result = self
            .synthesize_segments(&non_empty, roster, locale, correlation_id)
            .await;
        match &result {
            Ok(bytes) => info!(
                correlation_id,
                state = ?PlanState::Assembled,
                bytes = bytes.len(),
                "reading plan assembled"
            ),
            Err(err) => info!(correlation_id, state = ?PlanState::Failed, error = %err, "reading plan failed"),
        }
        result
    }

    async fn synthesize_segments(
        &self,
        segments: &[&NarrationSegment],
        roster: &[CharacterRef],
        locale: &str,
        correlation_id: &str,
    ) -> MediaResult<Vec<u8>> {
        let mut collected: Vec<Vec<u8>> = Vec::with_capacity(segments.len());
        for segment in segments {
            let slug = normalize_speaker(&segment.speaker, roster);
            let preset = resolve(segment.segment_type, &slug);
            let style = infer_style_from_emotion(&segment.emotion)
                .unwrap_or(preset.markup_style);
            let text = clean_text_for_speech(&segment.text);

            let lines: Vec<&str> = text.lines().collect();
            for chunk in chunk_lines(&lines, self.max_payload_bytes) {
                let request = SpeechRequest {
                    text: chunk,
                    correlation_id: correlation_id.to_string(),
                    locale: locale.to_string(),
                    voice: preset.voice.to_string(),
                    markup_voice: preset.markup_voice.to_string(),
                    style: Some(style.to_string()),
                    style_degree: Some(preset.markup_style_degree.to_string()),
                    rate: Some(preset.markup_rate.to_string()),
                };
                // any chain exhaustion aborts the whole plan; partial audio
                // is discarded
                let (bytes, provider) = self.chain.dispatch(&request).await?;
                info!(
                    correlation_id,
                    provider,
                    speaker = %slug,
                    bytes = bytes.len(),
                    "segment chunk synthesized"
                );
                collected.push(bytes);
            }
        }
        merge_chunks(&collected)
    }

    /// Synthesizes one paragraph outside a full plan: a single synthetic
    /// narration segment, chunked when oversized, merged identically to
    /// multi-segment output.
    pub async fn synthesize_paragraph(
        &self,
        text: &str,
        locale: &str,
        correlation_id: &str,
    ) -> MediaResult<Vec<u8>> {
        let cleaned = clean_text_for_speech(text);
        if cleaned.is_empty() {
            return Err(MediaError::InvalidInput(
                "paragraph text is empty".to_string(),
            ));
        }
        let segment = NarrationSegment::narration(cleaned);
        self.synthesize_segments(&[&segment], &[], locale, correlation_id)
            .await
    }
}
