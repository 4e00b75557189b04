use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::completion::ModelClient;
use crate::compression::{SummarizeError, Summarizer};
use crate::routing::{ModelTable, ModelTier};
use crate::types::Message;

pub const DEFAULT_SUMMARY_PROMPT: &str = "Summarize the following conversation excerpt. \
Keep file paths, decisions, errors and open tasks. Be concise.";

/// [`Summarizer`] backed by the fast-tier model.
pub struct ModelSummarizer {
    client: Arc<dyn ModelClient>,
    model_id: String,
    prompt: String,
}

impl ModelSummarizer {
    /// Summarize with the fast tier of `table`.
    pub fn new(client: Arc<dyn ModelClient>, table: &ModelTable) -> Self {
        let model_id = table
            .model_id_for(ModelTier::Fast)
            .unwrap_or_default()
            .to_string();
        Self::with_model(client, model_id)
    }

    pub fn with_model(client: Arc<dyn ModelClient>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl std::fmt::Debug for ModelSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSummarizer")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Summarizer for ModelSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let messages = [Message::system(self.prompt.as_str()), Message::user(text)];
        let completion = self
            .client
            .complete(&messages, &[], &self.model_id)
            .await
            .map_err(|e| match e {
                crate::Error::Timeout(_) => SummarizeError::Timeout,
                other => SummarizeError::Unavailable(other.to_string()),
            })?;

        let summary = completion.content.trim();
        if summary.is_empty() {
            return Err(SummarizeError::Empty);
        }
        debug!(
            model = %self.model_id,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Summarized transcript chunk"
        );
        Ok(summary.to_string())
    }
}
