use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::ChatClient;
use super::ChatError;

/// Mock chat client for testing
///
/// Hands out scripted replies in order and records every prompt it was sent.
/// Once the script runs out every call fails with `UnexpectedStructure`.
#[derive(Debug, Default)]
pub struct MockChatClient {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::default(),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ChatError::UnexpectedStructure)
    }
}
