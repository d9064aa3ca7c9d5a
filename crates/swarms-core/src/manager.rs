//! Fan a single prompt out to several models

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::error::CompletionError;
use crate::provider::ChatCompletion;

/// One model's answer from a fan-out call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOutput {
    pub model: String,
    pub content: String,
}

/// Sends the same prompt to every model it holds
pub struct MultiModelManager {
    models: Vec<Arc<dyn ChatCompletion>>,
}

impl MultiModelManager {
    pub fn new(models: Vec<Arc<dyn ChatCompletion>>) -> Self {
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Query every model concurrently.
    ///
    /// Results come back in the order the models were given. The first
    /// failure aborts the whole call; siblings still in flight are dropped.
    pub async fn complete_all(&self, prompt: &str) -> Result<Vec<ModelOutput>, CompletionError> {
        debug!(models = self.models.len(), "Fanning out prompt");

        let calls = self.models.iter().map(|model| async move {
            match model.complete(prompt).await {
                Ok(content) => Ok(ModelOutput {
                    model: model.model().to_string(),
                    content,
                }),
                Err(e) => {
                    warn!(model = %model.model(), error = %e, "Model failed during fan-out");
                    Err(e.for_model(model.model()))
                }
            }
        });

        try_join_all(calls).await
    }
}
