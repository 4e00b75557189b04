use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::importance::{SUMMARY_PREFIX, condense, estimate_tokens, importance_score, is_critical};
use super::options::CompressionOptions;
use super::summarizer::{SummarizeError, Summarizer};
use crate::types::Message;

const MIN_RETAINED_MESSAGES: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionReport {
    pub original_messages: usize,
    pub compressed_messages: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub summarized_chunks: usize,
    pub fallback_chunks: usize,
}

impl CompressionReport {
    pub fn changed(&self) -> bool {
        self.summarized_chunks + self.fallback_chunks > 0
    }

    pub fn saved_tokens(&self) -> usize {
        self.tokens_before.saturating_sub(self.tokens_after)
    }
}

/// Shrinks a transcript toward a token budget.
///
/// The head (`keep_first_n`) and tail (`keep_last_n`) are never touched. The
/// middle is summarized chunk by chunk; a chunk whose summary fails is
/// condensed locally instead. Compression never fails.
#[derive(Clone, Debug, Default)]
pub struct ContextCompressor {
    options: CompressionOptions,
}

impl ContextCompressor {
    pub fn new(options: CompressionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompressionOptions {
        &self.options
    }

    pub fn needs_compression(&self, messages: &[Message]) -> bool {
        messages.len() > self.options.keep_first_n + self.options.keep_last_n
            && estimate_tokens(messages) > self.options.target_tokens
    }

    pub async fn compress(&self, messages: &[Message], summarizer: &dyn Summarizer) -> Vec<Message> {
        self.compress_with_report(messages, summarizer).await.0
    }

    pub async fn compress_with_report(
        &self,
        messages: &[Message],
        summarizer: &dyn Summarizer,
    ) -> (Vec<Message>, CompressionReport) {
        let tokens_before = estimate_tokens(messages);
        let mut report = CompressionReport {
            original_messages: messages.len(),
            compressed_messages: messages.len(),
            tokens_before,
            tokens_after: tokens_before,
            ..Default::default()
        };

        if !self.needs_compression(messages) {
            return (messages.to_vec(), report);
        }

        let head_end = self.options.keep_first_n;
        let tail_start = messages.len() - self.options.keep_last_n;
        let chunk_size = self.options.chunk_size.max(1);

        let mut result = Vec::with_capacity(messages.len());
        result.extend_from_slice(&messages[..head_end]);

        for chunk in messages[head_end..tail_start].chunks(chunk_size) {
            match summarize_chunk(chunk, summarizer).await {
                Ok(summary) => {
                    report.summarized_chunks += 1;
                    result.push(Message::assistant(format!("{SUMMARY_PREFIX} {summary}")));
                }
                Err(e) => {
                    warn!(error = %e, messages = chunk.len(), "summarizer failed, condensing locally");
                    report.fallback_chunks += 1;
                    result.extend(chunk.iter().map(condense));
                }
            }
        }

        result.extend_from_slice(&messages[tail_start..]);

        report.compressed_messages = result.len();
        report.tokens_after = estimate_tokens(&result);
        info!(
            messages_before = report.original_messages,
            messages_after = report.compressed_messages,
            tokens_before = report.tokens_before,
            tokens_after = report.tokens_after,
            summarized = report.summarized_chunks,
            fallback = report.fallback_chunks,
            "compressed context"
        );
        (result, report)
    }

    /// Evict the least important non-critical messages until the transcript
    /// fits `target_tokens` or only a handful of messages remain.
    pub fn progressive_compress(messages: &[Message], target_tokens: usize) -> Vec<Message> {
        evict_low_importance(messages, target_tokens, |_| false)
    }

    /// Progressive eviction restricted to the compressible middle: the head
    /// (`keep_first_n`) and tail (`keep_last_n`) always survive.
    pub fn evict_middle(&self, messages: &[Message]) -> Vec<Message> {
        let head_end = self.options.keep_first_n.min(messages.len());
        let tail_start = messages
            .len()
            .saturating_sub(self.options.keep_last_n)
            .max(head_end);
        evict_low_importance(messages, self.options.target_tokens, |i| {
            i < head_end || i >= tail_start
        })
    }
}

/// Repeatedly drop the lowest-scoring quarter of the evictable messages.
/// Pinned indices refer to positions in `messages`.
fn evict_low_importance(
    messages: &[Message],
    target_tokens: usize,
    pinned: impl Fn(usize) -> bool,
) -> Vec<Message> {
    let mut kept: Vec<(Message, u32, bool)> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| (m.clone(), importance_score(m), pinned(i) || is_critical(m)))
        .collect();

    loop {
        let current: Vec<Message> = kept.iter().map(|(m, _, _)| m.clone()).collect();
        if estimate_tokens(&current) <= target_tokens || kept.len() <= MIN_RETAINED_MESSAGES {
            break;
        }

        let mut candidates: Vec<usize> = (0..kept.len()).filter(|&i| !kept[i].2).collect();
        if candidates.is_empty() {
            break;
        }
        candidates.sort_by_key(|&i| kept[i].1);

        let budget = kept.len() - MIN_RETAINED_MESSAGES;
        let remove_count = (candidates.len() / 4).max(1).min(budget);
        let evicted: HashSet<usize> = candidates.into_iter().take(remove_count).collect();

        debug!(evicted = evicted.len(), remaining = kept.len() - evicted.len(), "progressive compression pass");
        kept = kept
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !evicted.contains(i))
            .map(|(_, entry)| entry)
            .collect();
    }

    kept.into_iter().map(|(m, _, _)| m).collect()
}

async fn summarize_chunk(
    chunk: &[Message],
    summarizer: &dyn Summarizer,
) -> Result<String, SummarizeError> {
    let text = chunk
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content.serialized()))
        .collect::<Vec<_>>()
        .join("\n");
    let summary = summarizer.summarize(&text).await?;
    if summary.trim().is_empty() {
        return Err(SummarizeError::Empty);
    }
    Ok(summary)
}
