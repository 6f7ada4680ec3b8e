//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::llm::{HttpGenerator, HttpGeneratorConfig, ResponseGenerator};
use crate::core::stt::{HttpRecognizer, HttpRecognizerConfig, SpeechRecognizer};
use crate::core::tts::{HttpSynthesizer, HttpSynthesizerConfig, SpeechSynthesizer};

/// State shared across all sessions: the configuration and the three engine
/// boundaries. Engines are trait objects so tests can swap in fakes.
pub struct AppState {
    pub config: ServerConfig,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub generator: Arc<dyn ResponseGenerator>,
}

impl AppState {
    /// Build state with HTTP engine adapters from the configured endpoints.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let recognizer = Arc::new(HttpRecognizer::new(HttpRecognizerConfig {
            endpoint: config.engines.stt_url.clone(),
            api_key: config.engines.stt_api_key.clone(),
            model: config.engines.stt_model.clone(),
            sample_rate: config.audio.target_sample_rate,
        }));
        let synthesizer = Arc::new(HttpSynthesizer::new(HttpSynthesizerConfig {
            endpoint: config.engines.tts_url.clone(),
            api_key: config.engines.tts_api_key.clone(),
            sample_rate: config.engines.tts_sample_rate,
        }));
        let generator = Arc::new(HttpGenerator::new(HttpGeneratorConfig {
            endpoint: config.engines.llm_url.clone(),
            api_key: config.engines.llm_api_key.clone(),
            model: config.engines.llm_model.clone(),
            system_prompt: config.engines.llm_system_prompt.clone(),
        }));
        Self::with_engines(config, recognizer, synthesizer, generator)
    }

    /// Build state around caller-supplied engines.
    pub fn with_engines(
        config: ServerConfig,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            recognizer,
            synthesizer,
            generator,
        })
    }
}
