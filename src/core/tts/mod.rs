//! Speech synthesis boundary.
//!
//! Synthesis is streamed: a [`SpeechSynthesizer`] returns a chunked byte
//! stream of 16-bit PCM, and the [`SynthesisStreamer`] relays those chunks to
//! the client as they arrive, cancelling mid-stream whenever a newer reply
//! supersedes the one being spoken.

mod http;
mod streamer;

pub use http::{HttpSynthesizer, HttpSynthesizerConfig};
pub use streamer::{SynthesisRequest, SynthesisStreamer};

use std::pin::Pin;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Chunked 16-bit PCM audio from a synthesis engine.
pub type AudioChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, EngineError>> + Send>>;

/// External speech-synthesis engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`, streaming raw 16-bit mono PCM chunks.
    ///
    /// `length_scale` controls playback pacing: the reciprocal of the
    /// requested speed, so 0.5 speaks twice as fast.
    async fn synthesize(
        &self,
        text: &str,
        speaker_id: Option<u32>,
        length_scale: f32,
    ) -> Result<AudioChunkStream, EngineError>;

    /// Sample rate of the PCM produced by [`synthesize`](Self::synthesize).
    fn sample_rate(&self) -> u32;
}

/// One synthesized audio chunk, ready for the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioChunkMessage {
    /// Base64-encoded 16-bit mono PCM.
    pub audio: String,
    pub sample_rate: u32,
    pub voice: String,
    pub speed: f32,
    /// Playback duration of this chunk in seconds.
    pub duration: f32,
}

impl AudioChunkMessage {
    pub fn new(pcm: &[u8], sample_rate: u32, voice: &str, speed: f32) -> Self {
        Self {
            audio: BASE64.encode(pcm),
            sample_rate,
            voice: voice.to_string(),
            speed,
            duration: chunk_duration(pcm.len(), sample_rate),
        }
    }
}

/// Playback duration in seconds of `byte_len` bytes of 16-bit mono PCM.
pub fn chunk_duration(byte_len: usize, sample_rate: u32) -> f32 {
    if sample_rate == 0 {
        return 0.0;
    }
    byte_len as f32 / (2.0 * sample_rate as f32)
}

/// Convert a playback speed multiplier into an engine length scale.
///
/// Rounded to 3 decimal places so identical speeds always produce identical
/// engine requests. Non-positive speeds fall back to 1.0.
pub fn length_scale_for_speed(speed: f32) -> f32 {
    if speed <= 0.0 {
        return 1.0;
    }
    (1000.0 / speed).round() / 1000.0
}

/// Prepare reply text for synthesis.
///
/// Lines are flattened into one utterance: blank lines become a pause marker
/// ("..."), and each non-empty line gets a terminating period unless it
/// already ends in punctuation, so the engine places sentence boundaries at
/// line breaks.
pub fn format_text_for_synthesis(text: &str) -> String {
    let mut parts = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            parts.push("...".to_string());
        } else if line.ends_with(['.', '!', '?', ',', ';', ':']) {
            parts.push(line.to_string());
        } else {
            parts.push(format!("{line}."));
        }
    }
    parts.join(" ")
}
