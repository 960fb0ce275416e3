//! # Voice & Style Resolution
//!
//! Maps a narration segment (speaker + emotion) to a concrete voice preset.
//! Presets are a static table keyed by speaker slug with dedicated
//! `narration` and `default` entries; unknown slugs resolve to `default`
//! rather than failing, because an unrecognized speaker must never block
//! synthesis. Emotion keywords can override the preset's style attribute for
//! one segment, never its base voice identity, which avoids a combinatorial
//! voice-by-emotion table.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Whether a segment is spoken by the narrator or by a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentType {
    Narration,
    Dialogue,
}

impl SegmentType {
    /// Parses an upstream label, defaulting to narration for anything that
    /// is not explicitly dialogue.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("dialogue") {
            Self::Dialogue
        } else {
            Self::Narration
        }
    }
}

/// One unit of narration attributed to a single speaker and emotional
/// coloring. Produced upstream, consumed read-only.
#[derive(Debug, Clone)]
pub struct NarrationSegment {
    pub segment_type: SegmentType,
    /// Speaker slug, or `narrator` for narration segments.
    pub speaker: String,
    /// Free-text emotion label, e.g. `cheerful` or `따뜻하고 차분하게`.
    pub emotion: String,
    pub text: String,
}

impl NarrationSegment {
    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            segment_type: SegmentType::Narration,
            speaker: "narrator".to_string(),
            emotion: String::new(),
            text: text.into(),
        }
    }

    pub fn dialogue(
        speaker: impl Into<String>,
        emotion: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            segment_type: SegmentType::Dialogue,
            speaker: speaker.into(),
            emotion: emotion.into(),
            text: text.into(),
        }
    }
}

/// Roster entry used to normalize upstream speaker labels to preset slugs.
#[derive(Debug, Clone)]
pub struct CharacterRef {
    pub name: String,
    pub slug: String,
}

impl CharacterRef {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// Static record mapping a speaker role to concrete synthesis parameters.
///
/// `voice` is the plain engine voice id; the `markup_*` fields are the
/// markup-engine voice name and its style/intensity/rate modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePreset {
    pub voice: &'static str,
    pub style: &'static str,
    pub markup_voice: &'static str,
    pub markup_style: &'static str,
    pub markup_style_degree: &'static str,
    pub markup_rate: &'static str,
}

/// Preset used for every narration segment, regardless of speaker value.
pub const NARRATION_PRESET: VoicePreset = VoicePreset {
    voice: "alloy",
    style: "Warm and calm mother's voice",
    markup_voice: "ko-KR-SunHiNeural",
    markup_style: "friendly",
    markup_style_degree: "1.0",
    markup_rate: "0%",
};

/// Preset used for dialogue by speakers missing from the character table.
pub const DEFAULT_PRESET: VoicePreset = VoicePreset {
    voice: "alloy",
    style: "Natural and comfortable",
    markup_voice: "ko-KR-SunHiNeural",
    markup_style: "calm",
    markup_style_degree: "1.0",
    markup_rate: "0%",
};

/// Character presets keyed by speaker slug.
static CHARACTER_PRESETS: Lazy<HashMap<&'static str, VoicePreset>> = Lazy::new(|| {
    HashMap::from([
        (
            "lulu-rabbit",
            VoicePreset {
                voice: "coral",
                style: "Lively and cute",
                markup_voice: "ko-KR-SunHiNeural",
                markup_style: "cheerful",
                markup_style_degree: "1.2",
                markup_rate: "+10%",
            },
        ),
        (
            "mungchi-puppy",
            VoicePreset {
                voice: "nova",
                style: "Friendly and joyful",
                markup_voice: "ko-KR-SoonBokNeural",
                markup_style: "friendly",
                markup_style_degree: "1.1",
                markup_rate: "+6%",
            },
        ),
        (
            "coco-squirrel",
            VoicePreset {
                voice: "echo",
                style: "Fast and exciting",
                markup_voice: "ko-KR-SeoHyeonNeural",
                markup_style: "excited",
                markup_style_degree: "1.2",
                markup_rate: "+12%",
            },
        ),
        (
            "ria-princess",
            VoicePreset {
                voice: "shimmer",
                style: "Elegant and sweet",
                markup_voice: "ko-KR-SeoHyeonNeural",
                markup_style: "gentle",
                markup_style_degree: "1.1",
                markup_rate: "0%",
            },
        ),
        (
            "lucas-prince",
            VoicePreset {
                voice: "fable",
                style: "Playful and brave",
                markup_voice: "ko-KR-SunHiNeural",
                markup_style: "cheerful",
                markup_style_degree: "1.1",
                markup_rate: "+8%",
            },
        ),
        (
            "geo-explorer",
            VoicePreset {
                voice: "ash",
                style: "Calm but brave",
                markup_voice: "ko-KR-SoonBokNeural",
                markup_style: "calm",
                markup_style_degree: "1.0",
                markup_rate: "0%",
            },
        ),
        (
            "robo-roro",
            VoicePreset {
                voice: "onyx",
                style: "Mechanical yet warm",
                markup_voice: "ko-KR-SoonBokNeural",
                markup_style: "calm",
                markup_style_degree: "1.0",
                markup_rate: "-4%",
            },
        ),
        (
            "mimi-fairy",
            VoicePreset {
                voice: "sage",
                style: "Whispering and affectionate",
                markup_voice: "ko-KR-SeoHyeonNeural",
                markup_style: "whispering",
                markup_style_degree: "1.0",
                markup_rate: "-6%",
            },
        ),
        (
            "pipi-math-monster",
            VoicePreset {
                voice: "coral",
                style: "Upbeat and lively",
                markup_voice: "ko-KR-SunHiNeural",
                markup_style: "cheerful",
                markup_style_degree: "1.1",
                markup_rate: "+10%",
            },
        ),
        (
            "nova-space",
            VoicePreset {
                voice: "nova",
                style: "Dreamy and mysterious",
                markup_voice: "ko-KR-SunHiNeural",
                markup_style: "hopeful",
                markup_style_degree: "1.1",
                markup_rate: "+4%",
            },
        ),
    ])
});

/// Resolves a segment to its voice preset.
///
/// Narration segments always resolve to the narration preset, irrespective
/// of the speaker value; dialogue looks the slug up in the character table
/// and falls back to the default preset for unknown speakers.
pub fn resolve(segment_type: SegmentType, speaker_slug: &str) -> &'static VoicePreset {
    if segment_type == SegmentType::Narration {
        return &NARRATION_PRESET;
    }
    CHARACTER_PRESETS
        .get(speaker_slug)
        .unwrap_or(&DEFAULT_PRESET)
}

/// Emotion keyword families mapped to markup style tags.
///
/// Matching is case-insensitive substring search so that free-form labels
/// ("so happy and excited!") and the original Korean stems both hit.
static EMOTION_STYLES: &[(&[&str], &str)] = &[
    (
        &["happy", "joy", "excit", "cheer", "기쁘", "신나", "즐겁", "흥분"],
        "cheerful",
    ),
    (
        &["calm", "seren", "peace", "따뜻", "차분", "잔잔", "평온"],
        "calm",
    ),
    (&["whisper", "hush", "속삭", "조용", "은은"], "whispering"),
    (
        &["brave", "bold", "adventur", "용감", "힘차", "모험"],
        "energetic",
    ),
    (
        &["gentle", "tender", "kind", "soft", "상냥", "부드럽", "다정"],
        "friendly",
    ),
    (
        &["myster", "dream", "starry", "신비", "꿈", "별"],
        "hopeful",
    ),
];

/// Keyword-matches an emotion hint to a style tag.
///
/// A match overrides only the style attribute for that segment, never the
/// preset's base voice identity. Returns `None` when no family matches.
pub fn infer_style_from_emotion(emotion: &str) -> Option<&'static str> {
    let lowered = emotion.to_lowercase();
    if lowered.trim().is_empty() {
        return None;
    }
    for &(keywords, style) in EMOTION_STYLES {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return Some(style);
        }
    }
    None
}
