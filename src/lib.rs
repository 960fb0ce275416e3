//! # Fabula Media Pipeline
//!
//! Resilient multi-provider media generation: turns a generation request
//! into synthesized bytes (illustration or narration audio) while tolerating
//! flaky, rate-limited, or unavailable external backends.
//!
//! The pipeline is built from small layers:
//! - [`crate::core::provider`] — one adapter per backend behind a uniform
//!   `generate(request) -> bytes` interface, with vendor failures normalized
//!   into a typed error
//! - [`crate::core::dispatch`] — ordered fallback across adapters with
//!   bounded exponential backoff for rate-limited exhaustion
//! - [`crate::core::voice`] / [`crate::core::chunker`] /
//!   [`crate::core::audio`] — voice preset resolution, byte-bounded text
//!   splitting, and WAV assembly
//! - [`crate::core::narration`] — reading-plan orchestration with a
//!   single-shot markup path and per-segment fallback
//! - [`crate::core::media`] — the caller-facing service joining concurrent
//!   image and audio generation
//!
//! Configuration is loaded once at startup via [`config::MediaConfig`];
//! adapters live for the process lifetime and are shared read-only.

pub mod config;
pub mod core;
pub mod errors;

pub use crate::config::MediaConfig;
pub use crate::core::media::{MediaService, PageMedia};
pub use crate::core::voice::{CharacterRef, NarrationSegment, SegmentType};
pub use crate::errors::{MediaError, MediaResult};
