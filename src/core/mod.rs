pub mod audio;
pub mod llm;
pub mod stt;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio::{AudioIngestBuffer, f32_to_pcm16, pcm16_to_f32, resample, resample_ratio};
pub use llm::{HttpGenerator, HttpGeneratorConfig, ResponseGenerator};
pub use stt::{
    HttpRecognizer, HttpRecognizerConfig, SpeechRecognizer, TranscriptSegment,
    TranscriptStabilizer, join_segments,
};
pub use tts::{
    AudioChunkMessage, AudioChunkStream, HttpSynthesizer, HttpSynthesizerConfig,
    SpeechSynthesizer, SynthesisRequest, SynthesisStreamer, chunk_duration,
    format_text_for_synthesis, length_scale_for_speed,
};
