//! Chat completion client.
//!
//! The engine only sees the [`ChatClient`] trait. [`OpenAiClient`] talks to an
//! OpenAI-compatible `/chat/completions` endpoint.

#[cfg(test)]
mod mock;
mod openai;

use async_trait::async_trait;
#[cfg(test)]
pub use mock::MockChatClient;
pub use openai::ChatRequest;
pub use openai::OpenAiClient;

/// Ways a chat completion can fail.
///
/// The `Display` text of each variant doubles as the reply text handed on
/// when a call fails.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Failed to create request body")]
    RequestBody(#[source] serde_json::Error),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error parsing response: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Failed to parse response: Unexpected structure")]
    UnexpectedStructure,
}

/// Trait for chat completion calls
///
/// This trait allows for mocking the model for testing purposes
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `prompt` as a single user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, ChatError>;
}

/// Reply text for a completion result, substituting the error description
/// when the call failed.
pub fn reply_text(result: Result<String, ChatError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Chat completion failed: {}", e);
            e.to_string()
        }
    }
}
