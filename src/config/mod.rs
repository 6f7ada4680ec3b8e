//! Server configuration
//!
//! Configuration is assembled from three layers, highest priority first:
//! YAML file values, environment variables (including values loaded from a
//! `.env` file at startup), and built-in defaults. After merging, the final
//! configuration is validated as a whole.

mod yaml;

pub use yaml::YamlConfig;

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// CORS allowed origins (comma-separated list or "*" for all).
    /// `None` disables CORS, same-origin only.
    pub cors_allowed_origins: Option<String>,
    /// Sessions receiving no frames for this long are closed.
    pub session_idle_timeout_seconds: u64,
    pub audio: AudioSettings,
    pub synthesis: SynthesisSettings,
    pub engines: EngineSettings,
}

/// Audio ingestion and chunking settings.
#[derive(Debug, Clone)]
pub struct AudioSettings {
    /// Sample rate of the 16-bit PCM the client streams in.
    pub input_sample_rate: u32,
    /// Sample rate the recognition engine expects.
    pub target_sample_rate: u32,
    /// Length of each recognition chunk in seconds.
    pub chunk_seconds: f32,
    /// Trailing audio carried into the next chunk, in seconds.
    pub overlap_seconds: f32,
    /// Recognition language code.
    pub language: String,
}

impl AudioSettings {
    /// Recognition chunk size in bytes of input-rate 16-bit PCM.
    ///
    /// Always even, so chunks never split a sample.
    pub fn chunk_size_bytes(&self) -> usize {
        (self.chunk_seconds * self.input_sample_rate as f32) as usize * 2
    }

    /// Overlap size in bytes of input-rate 16-bit PCM.
    pub fn overlap_size_bytes(&self) -> usize {
        (self.overlap_seconds * self.input_sample_rate as f32) as usize * 2
    }
}

/// Synthesis defaults and the voice catalog.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub default_voice: String,
    pub default_speed: f32,
    /// Drop incoming audio while a reply is being spoken, to keep the
    /// assistant from transcribing its own voice on open-mic clients.
    pub suppress_while_speaking: bool,
    pub voices: HashMap<String, VoiceProfile>,
}

/// One selectable voice.
#[derive(Debug, Clone, Default)]
pub struct VoiceProfile {
    /// Engine speaker index for multi-speaker models.
    pub speaker_id: Option<u32>,
}

/// Endpoints and credentials of the three external engines.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub stt_url: String,
    pub stt_model: String,
    pub stt_api_key: Option<String>,
    pub tts_url: String,
    pub tts_sample_rate: u32,
    pub tts_api_key: Option<String>,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_system_prompt: String,
}

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful voice assistant. Keep replies short and natural to speak aloud.";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: None,
            session_idle_timeout_seconds: 300,
            audio: AudioSettings {
                input_sample_rate: 48_000,
                target_sample_rate: 16_000,
                chunk_seconds: 3.0,
                overlap_seconds: 1.0,
                language: "en".to_string(),
            },
            synthesis: SynthesisSettings {
                default_voice: "default".to_string(),
                default_speed: 1.0,
                suppress_while_speaking: false,
                voices: HashMap::new(),
            },
            engines: EngineSettings {
                stt_url: "http://localhost:9000/v1/audio/transcriptions".to_string(),
                stt_model: "whisper-small".to_string(),
                stt_api_key: None,
                tts_url: "http://localhost:9100/synthesize".to_string(),
                tts_sample_rate: 22_050,
                tts_api_key: None,
                llm_url: "http://localhost:9200/v1/chat/completions".to_string(),
                llm_model: "mistral-7b-instruct".to_string(),
                llm_api_key: None,
                llm_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file over environment variables.
    ///
    /// Priority order (highest to lowest): YAML file values, environment
    /// variables, defaults. The `.env` file, if any, is loaded at startup
    /// before this is called.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = YamlConfig::from_file(path)?;
        let mut config = Self::default();
        config.apply_env()?;
        config.apply_yaml(yaml);
        config.validate()?;
        Ok(config)
    }

    /// Socket address string to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Look up a voice by name, falling back to an empty profile for names
    /// outside the catalog.
    pub fn voice_profile(&self, voice: &str) -> VoiceProfile {
        self.synthesis.voices.get(voice).cloned().unwrap_or_default()
    }

    /// All configured voice names, sorted.
    pub fn voice_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.synthesis.voices.keys().cloned().collect();
        names.sort();
        names
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_string("HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            self.port = port;
        }
        if let Some(origins) = env_string("CORS_ALLOWED_ORIGINS") {
            self.cors_allowed_origins = Some(origins);
        }
        if let Some(timeout) = env_parse("SESSION_IDLE_TIMEOUT_SECONDS")? {
            self.session_idle_timeout_seconds = timeout;
        }

        if let Some(rate) = env_parse("INPUT_SAMPLE_RATE")? {
            self.audio.input_sample_rate = rate;
        }
        if let Some(rate) = env_parse("TARGET_SAMPLE_RATE")? {
            self.audio.target_sample_rate = rate;
        }
        if let Some(secs) = env_parse("CHUNK_SECONDS")? {
            self.audio.chunk_seconds = secs;
        }
        if let Some(secs) = env_parse("OVERLAP_SECONDS")? {
            self.audio.overlap_seconds = secs;
        }
        if let Some(language) = env_string("LANGUAGE") {
            self.audio.language = language;
        }

        if let Some(voice) = env_string("DEFAULT_VOICE") {
            self.synthesis.default_voice = voice;
        }
        if let Some(speed) = env_parse("DEFAULT_SPEED")? {
            self.synthesis.default_speed = speed;
        }
        if let Some(suppress) = env_parse("SUPPRESS_WHILE_SPEAKING")? {
            self.synthesis.suppress_while_speaking = suppress;
        }

        if let Some(url) = env_string("STT_URL") {
            self.engines.stt_url = url;
        }
        if let Some(model) = env_string("STT_MODEL") {
            self.engines.stt_model = model;
        }
        if let Some(key) = env_string("STT_API_KEY") {
            self.engines.stt_api_key = Some(key);
        }
        if let Some(url) = env_string("TTS_URL") {
            self.engines.tts_url = url;
        }
        if let Some(rate) = env_parse("TTS_SAMPLE_RATE")? {
            self.engines.tts_sample_rate = rate;
        }
        if let Some(key) = env_string("TTS_API_KEY") {
            self.engines.tts_api_key = Some(key);
        }
        if let Some(url) = env_string("LLM_URL") {
            self.engines.llm_url = url;
        }
        if let Some(model) = env_string("LLM_MODEL") {
            self.engines.llm_model = model;
        }
        if let Some(key) = env_string("LLM_API_KEY") {
            self.engines.llm_api_key = Some(key);
        }
        if let Some(prompt) = env_string("LLM_SYSTEM_PROMPT") {
            self.engines.llm_system_prompt = prompt;
        }
        Ok(())
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
            if let Some(origins) = server.cors_allowed_origins {
                self.cors_allowed_origins = Some(origins);
            }
            if let Some(timeout) = server.session_idle_timeout_seconds {
                self.session_idle_timeout_seconds = timeout;
            }
        }
        if let Some(audio) = yaml.audio {
            if let Some(rate) = audio.input_sample_rate {
                self.audio.input_sample_rate = rate;
            }
            if let Some(rate) = audio.target_sample_rate {
                self.audio.target_sample_rate = rate;
            }
            if let Some(secs) = audio.chunk_seconds {
                self.audio.chunk_seconds = secs;
            }
            if let Some(secs) = audio.overlap_seconds {
                self.audio.overlap_seconds = secs;
            }
            if let Some(language) = audio.language {
                self.audio.language = language;
            }
        }
        if let Some(synthesis) = yaml.synthesis {
            if let Some(voice) = synthesis.default_voice {
                self.synthesis.default_voice = voice;
            }
            if let Some(speed) = synthesis.default_speed {
                self.synthesis.default_speed = speed;
            }
            if let Some(suppress) = synthesis.suppress_while_speaking {
                self.synthesis.suppress_while_speaking = suppress;
            }
            if let Some(voices) = synthesis.voices {
                self.synthesis.voices = voices
                    .into_iter()
                    .map(|(name, v)| {
                        (
                            name,
                            VoiceProfile {
                                speaker_id: v.speaker_id,
                            },
                        )
                    })
                    .collect();
            }
        }
        if let Some(engines) = yaml.engines {
            if let Some(url) = engines.stt_url {
                self.engines.stt_url = url;
            }
            if let Some(model) = engines.stt_model {
                self.engines.stt_model = model;
            }
            if let Some(key) = engines.stt_api_key {
                self.engines.stt_api_key = Some(key);
            }
            if let Some(url) = engines.tts_url {
                self.engines.tts_url = url;
            }
            if let Some(rate) = engines.tts_sample_rate {
                self.engines.tts_sample_rate = rate;
            }
            if let Some(key) = engines.tts_api_key {
                self.engines.tts_api_key = Some(key);
            }
            if let Some(url) = engines.llm_url {
                self.engines.llm_url = url;
            }
            if let Some(model) = engines.llm_model {
                self.engines.llm_model = model;
            }
            if let Some(key) = engines.llm_api_key {
                self.engines.llm_api_key = Some(key);
            }
            if let Some(prompt) = engines.llm_system_prompt {
                self.engines.llm_system_prompt = prompt;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.input_sample_rate == 0 || self.audio.target_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "sample rates must be non-zero".to_string(),
            ));
        }
        if self.audio.chunk_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "chunk_seconds must be positive".to_string(),
            ));
        }
        if self.audio.overlap_seconds < 0.0 || self.audio.overlap_seconds >= self.audio.chunk_seconds
        {
            return Err(ConfigError::Invalid(format!(
                "overlap_seconds ({}) must be in [0, chunk_seconds)",
                self.audio.overlap_seconds
            )));
        }
        if self.synthesis.default_speed <= 0.0 {
            return Err(ConfigError::Invalid(
                "default_speed must be positive".to_string(),
            ));
        }
        if self.engines.tts_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "tts_sample_rate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: Display,
{
    match env_string(name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("invalid {name}: {e}"))),
        None => Ok(None),
    }
}
