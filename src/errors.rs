//! Error taxonomy for the voice pipeline.
//!
//! Errors are contained at component boundaries: protocol and engine errors
//! never unwind past the session step that triggered them, transport errors
//! tear the session down, and configuration errors are surfaced once at
//! startup.

use thiserror::Error;

/// Errors from external engine calls (recognition, synthesis, generation).
///
/// Engine failures are recoverable: the failing chunk or request is dropped
/// and the session continues with an intact buffer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The recognition engine rejected or failed a transcription pass.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// The synthesis engine rejected or failed a synthesis request.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The response generator failed to produce a reply.
    #[error("response generation failed: {0}")]
    Generation(String),

    /// Transport-level failure talking to an engine endpoint.
    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Startup-time configuration errors.
///
/// A session cannot start without valid audio and voice configuration, so
/// these are reported once to the caller and never retried per-message.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required setting: {0}")]
    Missing(String),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Session-level errors, classified by how the session reacts to them.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed inbound envelope. The message is dropped and logged; the
    /// session state is unchanged.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An engine call failed. That unit of work is dropped; the session
    /// continues.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The duplex connection broke. The session is torn down: buffers are
    /// discarded and in-flight synthesis is cancelled.
    #[error("transport error: {0}")]
    Transport(String),

    /// Required configuration was missing at session start.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias used throughout the session path.
pub type SessionResult<T> = Result<T, SessionError>;
