//! Context compression: keeps the transcript under a token budget.

mod compressor;
mod importance;
mod options;
mod summarizer;

pub use compressor::{CompressionReport, ContextCompressor};
pub use importance::{
    CRITICAL_THRESHOLD, condense, estimate_message_tokens, estimate_tokens,
    SUMMARY_PREFIX, identify_critical_messages, importance_score, is_critical, is_summary,
};
pub use options::CompressionOptions;
pub use summarizer::{FnSummarizer, SummarizeError, Summarizer};
