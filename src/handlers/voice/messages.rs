//! Voice session WebSocket message types
//!
//! The protocol is a duplex stream over one socket: the client sends JSON
//! envelopes tagged by `status` (and may send raw binary PCM frames while
//! listening), the server replies with JSON envelopes tagged the same way.

use serde::{Deserialize, Serialize};

use crate::core::tts::AudioChunkMessage;

/// Maximum allowed decoded size for one audio frame (1 MiB)
pub const MAX_AUDIO_FRAME_SIZE: usize = 1024 * 1024;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket envelopes from the client
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "status")]
pub enum IncomingMessage {
    /// Begin or continue an utterance; may carry a base64 PCM payload
    #[serde(rename = "LISTENING")]
    Listening {
        /// Base64-encoded 16-bit mono PCM at the configured input rate
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        /// Voice for replies to this session, set on first use
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
        /// Playback speed multiplier for replies
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f32>,
    },

    /// Audio captured while a reply is audibly playing on the client.
    /// Ingested like LISTENING audio unless the suppression policy is on.
    #[serde(rename = "SPEAKING")]
    Speaking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
    },

    /// End the current utterance and flush pending audio
    #[serde(rename = "STOPPED")]
    Stopped,
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket envelopes to the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum OutgoingMessage {
    /// Newly committed transcript text
    #[serde(rename = "TRANSCRIPT")]
    Transcript {
        /// Text committed since the previous envelope; the final envelope
        /// carries the whole sealed utterance instead
        text: String,
        /// True when this seals the utterance
        is_final: bool,
    },

    /// One chunk of synthesized reply audio
    #[serde(rename = "SPEAKING")]
    Speaking {
        #[serde(flatten)]
        chunk: AudioChunkMessage,
    },

    /// The utterance was flushed and the session is idle again
    #[serde(rename = "IDLE")]
    Idle,

    /// Error envelope
    #[serde(rename = "ERROR")]
    Error { message: String },
}

// =============================================================================
// Message Routing
// =============================================================================

/// Message routing between session tasks and the socket sender task
#[derive(Debug)]
pub enum MessageRoute {
    /// JSON envelope
    Outgoing(OutgoingMessage),
    /// Close connection
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_listening_with_audio() {
        let msg: IncomingMessage =
            serde_json::from_str(r#"{"status": "LISTENING", "audio": "AAAA"}"#).unwrap();
        match msg {
            IncomingMessage::Listening { audio, voice, speed } => {
                assert_eq!(audio.as_deref(), Some("AAAA"));
                assert!(voice.is_none());
                assert!(speed.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_incoming_speaking_with_audio() {
        let msg: IncomingMessage =
            serde_json::from_str(r#"{"status": "SPEAKING", "audio": "AAAA"}"#).unwrap();
        match msg {
            IncomingMessage::Speaking { audio } => assert_eq!(audio.as_deref(), Some("AAAA")),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_incoming_stopped() {
        let msg: IncomingMessage = serde_json::from_str(r#"{"status": "STOPPED"}"#).unwrap();
        assert!(matches!(msg, IncomingMessage::Stopped));
    }

    #[test]
    fn test_incoming_unknown_status_rejected() {
        assert!(serde_json::from_str::<IncomingMessage>(r#"{"status": "PAUSED"}"#).is_err());
    }

    #[test]
    fn test_outgoing_speaking_flattens_chunk() {
        let msg = OutgoingMessage::Speaking {
            chunk: AudioChunkMessage::new(&[0, 0, 0, 0], 22050, "amy", 1.0),
        };
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&msg).unwrap())
            .unwrap();
        assert_eq!(json["status"], "SPEAKING");
        assert_eq!(json["sample_rate"], 22050);
        assert_eq!(json["voice"], "amy");
        assert!(json["audio"].is_string());
    }

    #[test]
    fn test_outgoing_transcript_shape() {
        let msg = OutgoingMessage::Transcript {
            text: "hello".to_string(),
            is_final: false,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"status":"TRANSCRIPT","text":"hello","is_final":false}"#);
    }
}
