//! Core media pipeline: provider adapters, chain dispatch, voice
//! resolution, text chunking, audio assembly, and plan orchestration.

pub mod audio;
pub mod chunker;
pub mod dispatch;
pub mod media;
pub mod narration;
pub mod provider;
pub mod voice;
