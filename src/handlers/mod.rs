//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check and voice catalog endpoints
//! - `voice` - WebSocket real-time voice sessions

pub mod api;
pub mod voice;

// Re-export commonly used handlers for convenient access
pub use voice::voice_session_handler;
