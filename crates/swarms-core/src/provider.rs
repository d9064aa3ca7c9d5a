//! The seam between the agent loop and a chat-completion backend

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CompletionError;

/// A single stateless completion attempt.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Model identifier requests are sent with
    fn model(&self) -> &str;

    /// Send `prompt` as the user message and return the first choice's text
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: ChatCompletion + ?Sized> ChatCompletion for Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        (**self).complete(prompt).await
    }
}
