//! Errors raised by a single chat-completion attempt

use thiserror::Error;

/// Why a completion attempt failed.
///
/// Every variant is recoverable: callers are expected to log it and decide
/// whether to try again.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The provider could not be reached (connect, IO or timeout)
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The body did not match the chat-completion schema
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The body decoded but carried no choices
    #[error("no choices returned")]
    EmptyChoices,

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// One model of a fan-out call failed
    #[error("model {model} failed: {source}")]
    Model {
        model: String,
        #[source]
        source: Box<CompletionError>,
    },
}

impl CompletionError {
    /// Attach the model name to an error coming out of a fan-out call
    pub fn for_model(self, model: impl Into<String>) -> Self {
        Self::Model {
            model: model.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_carries_body() {
        let err = CompletionError::Provider {
            status: 429,
            body: r#"{"error":"rate limited"}"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn test_for_model_wraps_source() {
        let err = CompletionError::EmptyChoices.for_model("gpt-4o");
        assert_eq!(err.to_string(), "model gpt-4o failed: no choices returned");
        match err {
            CompletionError::Model { model, source } => {
                assert_eq!(model, "gpt-4o");
                assert!(matches!(*source, CompletionError::EmptyChoices));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
