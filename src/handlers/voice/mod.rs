//! Voice session WebSocket handling
//!
//! - `messages` - wire protocol envelopes and routing
//! - `session` - per-session state machine and recognition pipeline
//! - `handler` - socket upgrade, sender task, and receive loop

pub mod handler;
pub mod messages;
pub mod session;

pub use handler::voice_session_handler;
