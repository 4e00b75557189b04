use std::future::Future;

use async_trait::async_trait;

/// Failure of the external summarization call. Always recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummarizeError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summarizer returned an empty summary")]
    Empty,

    #[error("summarizer timed out")]
    Timeout,
}

/// Turns a block of transcript text into a shorter summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Adapts an async closure into a [`Summarizer`].
pub struct FnSummarizer<F> {
    f: F,
}

impl<F> FnSummarizer<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Summarizer for FnSummarizer<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, SummarizeError>> + Send,
{
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        (self.f)(text.to_string()).await
    }
}
