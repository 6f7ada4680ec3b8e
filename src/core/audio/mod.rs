//! Audio ingestion and sample-rate conversion.

pub mod ingest;
pub mod resample;

pub use ingest::AudioIngestBuffer;
pub use resample::{f32_to_pcm16, pcm16_to_f32, resample, resample_ratio};
