//! Model client collaborator.
//!
//! The core never speaks a wire protocol. It calls a [`ModelClient`] supplied
//! by the embedding application, currently only to summarize transcript chunks.

mod completion;
mod summarizer;

pub use completion::{Completion, ModelClient, Usage};
pub use summarizer::{DEFAULT_SUMMARY_PROMPT, ModelSummarizer};
