//! Speech recognition boundary.
//!
//! The core never implements recognition itself; it hands normalized f32
//! samples to a [`SpeechRecognizer`] and reconciles the returned hypotheses
//! through the [`TranscriptStabilizer`]. The default adapter talks to an
//! OpenAI-compatible transcription endpoint over HTTP.

mod http;
mod stabilizer;

pub use http::{HttpRecognizer, HttpRecognizerConfig};
pub use stabilizer::TranscriptStabilizer;

use async_trait::async_trait;

use crate::errors::EngineError;

/// One text segment from a recognition pass.
///
/// Engines may split a chunk's transcript into several segments; the core
/// concatenates them into a single hypothesis before stabilization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub text: String,
}

/// External speech-recognition engine.
///
/// Input samples are always mono f32 in [-1, 1] at the engine's required
/// sample rate; the ingestion path normalizes and resamples before calling.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe one chunk of audio, returning zero or more text segments.
    async fn transcribe(
        &self,
        samples: &[f32],
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, EngineError>;
}

/// Concatenate segment texts into a single whitespace-trimmed hypothesis.
pub fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}
