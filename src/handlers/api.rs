//! Health check and voice catalog endpoints

use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET / - liveness probe
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceEntry>,
    pub default_voice: String,
}

#[derive(Debug, Serialize)]
pub struct VoiceEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<u32>,
}

/// GET /voices - list the configured voice catalog
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<VoicesResponse> {
    let voices = state
        .config
        .voice_names()
        .into_iter()
        .map(|name| {
            let speaker_id = state.config.voice_profile(&name).speaker_id;
            VoiceEntry { name, speaker_id }
        })
        .collect();
    Json(VoicesResponse {
        voices,
        default_voice: state.config.synthesis.default_voice.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, VoiceProfile};
    use crate::core::llm::{HttpGenerator, HttpGeneratorConfig};
    use crate::core::stt::{HttpRecognizer, HttpRecognizerConfig};
    use crate::core::tts::{HttpSynthesizer, HttpSynthesizerConfig};

    fn test_state(config: ServerConfig) -> Arc<AppState> {
        AppState::with_engines(
            config.clone(),
            Arc::new(HttpRecognizer::new(HttpRecognizerConfig {
                endpoint: config.engines.stt_url.clone(),
                api_key: None,
                model: config.engines.stt_model.clone(),
                sample_rate: config.audio.target_sample_rate,
            })),
            Arc::new(HttpSynthesizer::new(HttpSynthesizerConfig {
                endpoint: config.engines.tts_url.clone(),
                api_key: None,
                sample_rate: config.engines.tts_sample_rate,
            })),
            Arc::new(HttpGenerator::new(HttpGeneratorConfig {
                endpoint: config.engines.llm_url.clone(),
                api_key: None,
                model: config.engines.llm_model.clone(),
                system_prompt: String::new(),
            })),
        )
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.0.status, "ok");
    }

    #[tokio::test]
    async fn test_list_voices_sorted_with_default() {
        let mut config = ServerConfig::default();
        config.synthesis.default_voice = "ryan".to_string();
        config
            .synthesis
            .voices
            .insert("ryan".to_string(), VoiceProfile { speaker_id: Some(3) });
        config
            .synthesis
            .voices
            .insert("amy".to_string(), VoiceProfile { speaker_id: None });

        let response = list_voices(State(test_state(config))).await;
        assert_eq!(response.0.default_voice, "ryan");
        let names: Vec<_> = response.0.voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["amy", "ryan"]);
        assert_eq!(response.0.voices[1].speaker_id, Some(3));
    }
}
