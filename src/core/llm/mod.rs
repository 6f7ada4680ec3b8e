//! Reply generation boundary.
//!
//! Given the sealed text of an utterance, a [`ResponseGenerator`] decides
//! whether to answer at all, and with what. Returning `None` means the
//! utterance was not addressed to the assistant and no reply is spoken.

mod http;

pub use http::{HttpGenerator, HttpGeneratorConfig};

use async_trait::async_trait;

use crate::errors::EngineError;

#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Produce a reply to a completed utterance, or `None` to stay silent.
    async fn generate(&self, utterance: &str) -> Result<Option<String>, EngineError>;
}
