//! HTTP adapter for OpenAI-compatible transcription endpoints.

use std::io::Cursor;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{SpeechRecognizer, TranscriptSegment};
use crate::errors::EngineError;

/// Connection settings for a transcription endpoint speaking the
/// `/v1/audio/transcriptions` multipart protocol.
#[derive(Debug, Clone)]
pub struct HttpRecognizerConfig {
    /// Full URL of the transcription endpoint.
    pub endpoint: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Model identifier passed through to the endpoint.
    pub model: String,
    /// Sample rate of the audio handed to [`SpeechRecognizer::transcribe`].
    pub sample_rate: u32,
}

pub struct HttpRecognizer {
    config: HttpRecognizerConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpRecognizer {
    pub fn new(config: HttpRecognizerConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Encode mono f32 samples as a 16-bit PCM WAV payload.
    fn encode_wav(&self, samples: &[f32]) -> Result<Vec<u8>, EngineError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| EngineError::Recognition(format!("wav encode failed: {e}")))?;
            for &sample in samples {
                let pcm = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer
                    .write_sample(pcm)
                    .map_err(|e| EngineError::Recognition(format!("wav encode failed: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| EngineError::Recognition(format!("wav encode failed: {e}")))?;
        }
        Ok(cursor.into_inner())
    }
}

#[async_trait]
impl SpeechRecognizer for HttpRecognizer {
    async fn transcribe(
        &self,
        samples: &[f32],
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, EngineError> {
        let wav_data = self.encode_wav(samples)?;
        debug!(
            bytes = wav_data.len(),
            sample_rate = self.config.sample_rate,
            "sending audio chunk for transcription"
        );

        let file_part = Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| EngineError::Recognition(format!("invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("response_format", "json");
        if !language.is_empty() {
            form = form.text("language", language.to_string());
        }

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Recognition(format!(
                "transcription endpoint returned {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Recognition(format!("malformed response: {e}")))?;

        if parsed.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TranscriptSegment { text: parsed.text }])
    }
}
