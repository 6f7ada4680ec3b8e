use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::errors::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything left out
/// falls back to environment variables and then to built-in defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   cors_allowed_origins: "*"
///   session_idle_timeout_seconds: 300
///
/// audio:
///   input_sample_rate: 48000
///   target_sample_rate: 16000
///   chunk_seconds: 3.0
///   overlap_seconds: 1.0
///   language: "en"
///
/// synthesis:
///   default_voice: "amy"
///   default_speed: 1.0
///   suppress_while_speaking: false
///   voices:
///     amy:
///       speaker_id: 0
///     ryan:
///       speaker_id: 3
///
/// engines:
///   stt_url: "http://localhost:9000/v1/audio/transcriptions"
///   stt_model: "whisper-small"
///   tts_url: "http://localhost:9100/synthesize"
///   tts_sample_rate: 22050
///   llm_url: "http://localhost:9200/v1/chat/completions"
///   llm_model: "mistral-7b-instruct"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub audio: Option<AudioYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub engines: Option<EnginesYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    pub session_idle_timeout_seconds: Option<u64>,
}

/// Audio ingestion configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    /// Sample rate of the PCM the client streams in (Hz)
    pub input_sample_rate: Option<u32>,
    /// Sample rate the recognition engine expects (Hz)
    pub target_sample_rate: Option<u32>,
    /// Length of each recognition chunk (seconds)
    pub chunk_seconds: Option<f32>,
    /// Audio carried over between consecutive chunks (seconds)
    pub overlap_seconds: Option<f32>,
    /// Recognition language code (e.g., "en")
    pub language: Option<String>,
}

/// Synthesis configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub default_voice: Option<String>,
    pub default_speed: Option<f32>,
    /// Drop incoming audio while a reply is being spoken
    pub suppress_while_speaking: Option<bool>,
    pub voices: Option<HashMap<String, VoiceYaml>>,
}

/// One named voice in YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoiceYaml {
    pub speaker_id: Option<u32>,
}

/// Engine endpoint configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EnginesYaml {
    pub stt_url: Option<String>,
    pub stt_model: Option<String>,
    pub stt_api_key: Option<String>,
    pub tts_url: Option<String>,
    pub tts_sample_rate: Option<u32>,
    pub tts_api_key: Option<String>,
    pub llm_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_system_prompt: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  cors_allowed_origins: "*"
  session_idle_timeout_seconds: 120

audio:
  input_sample_rate: 44100
  target_sample_rate: 16000
  chunk_seconds: 2.5
  overlap_seconds: 0.5
  language: "de"

synthesis:
  default_voice: "ryan"
  default_speed: 1.25
  suppress_while_speaking: true
  voices:
    ryan:
      speaker_id: 3

engines:
  stt_url: "http://stt.local/v1/audio/transcriptions"
  stt_model: "whisper-small"
  tts_url: "http://tts.local/synthesize"
  tts_sample_rate: 22050
  llm_url: "http://llm.local/v1/chat/completions"
  llm_model: "mistral-7b-instruct"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host, Some("127.0.0.1".to_string()));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.session_idle_timeout_seconds, Some(120));

        let audio = config.audio.as_ref().unwrap();
        assert_eq!(audio.input_sample_rate, Some(44100));
        assert_eq!(audio.overlap_seconds, Some(0.5));
        assert_eq!(audio.language, Some("de".to_string()));

        let synthesis = config.synthesis.as_ref().unwrap();
        assert_eq!(synthesis.default_speed, Some(1.25));
        assert_eq!(synthesis.suppress_while_speaking, Some(true));
        assert_eq!(
            synthesis.voices.as_ref().unwrap()["ryan"].speaker_id,
            Some(3)
        );

        let engines = config.engines.as_ref().unwrap();
        assert_eq!(engines.tts_sample_rate, Some(22050));
        assert_eq!(engines.llm_model, Some("mistral-7b-instruct".to_string()));
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert!(config.server.as_ref().unwrap().host.is_none());
        assert!(config.audio.is_none());
        assert!(config.synthesis.is_none());
        assert!(config.engines.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
    }

    #[test]
    fn test_yaml_config_malformed() {
        assert!(serde_yaml::from_str::<YamlConfig>("server: [not, a, map]").is_err());
    }
}
