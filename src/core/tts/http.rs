//! HTTP adapter for streaming synthesis endpoints.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{AudioChunkStream, SpeechSynthesizer};
use crate::errors::EngineError;

/// Connection settings for a synthesis endpoint that accepts a JSON request
/// and streams back raw 16-bit PCM.
#[derive(Debug, Clone)]
pub struct HttpSynthesizerConfig {
    /// Full URL of the synthesis endpoint.
    pub endpoint: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Sample rate of the PCM the endpoint produces.
    pub sample_rate: u32,
}

pub struct HttpSynthesizer {
    config: HttpSynthesizerConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker_id: Option<u32>,
    length_scale: f32,
}

impl HttpSynthesizer {
    pub fn new(config: HttpSynthesizerConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        speaker_id: Option<u32>,
        length_scale: f32,
    ) -> Result<AudioChunkStream, EngineError> {
        debug!(chars = text.len(), length_scale, "requesting synthesis");

        let mut request = self.client.post(&self.config.endpoint).json(&SynthesisBody {
            text,
            speaker_id,
            length_scale,
        });
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Synthesis(format!(
                "synthesis endpoint returned {status}: {body}"
            )));
        }

        Ok(Box::pin(
            response.bytes_stream().map_err(EngineError::Http),
        ))
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}
