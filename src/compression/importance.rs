//! Local heuristics: token estimates and message importance.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Regex, RegexSet};

use crate::types::{Message, MessageContent, Role};

/// Messages scoring at least this much are never condensed or evicted.
pub const CRITICAL_THRESHOLD: u32 = 20;

/// Marks a chunk summary produced by compression.
pub const SUMMARY_PREFIX: &str = "[Previous Context Summary]";

const CHARS_PER_TOKEN: usize = 4;
const MESSAGE_OVERHEAD_TOKENS: usize = 10;
const CONDENSED_PREVIEW_CHARS: usize = 500;

const KEYWORD_SCORE: u32 = 10;
const CODE_BLOCK_SCORE: u32 = 5;
const SYSTEM_SCORE: u32 = 100;
const TOOL_SCORE: u32 = 15;
const PATH_SCORE: u32 = 5;

static CRITICAL_KEYWORDS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\berror",
        r"(?i)\bfailed\b",
        r"(?i)\bexception",
        r"(?i)\bimportant\b",
        r"(?i)\bcritical\b",
        r"(?i)\btodo\b",
        r"(?i)\bfixme\b",
        r"(?i)\bdecision",
        r"(?i)\bconfirmed\b",
        r"(?i)\bcompleted\b",
    ])
    .unwrap()
});

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());

static PATH_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[\w.~-]*/[\w.-]+)|\b[\w-]+\.(?:rs|ts|tsx|js|jsx|py|go|java|c|h|cpp|hpp|json|toml|ya?ml|md|txt|sh|css|html)\b",
    )
    .unwrap()
});

/// `ceil(chars / 4) + 10` for one message.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let chars = message.content.serialized().chars().count();
    chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD_TOKENS
}

pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

pub fn importance_score(message: &Message) -> u32 {
    let content = message.content.serialized();
    let mut score = CRITICAL_KEYWORDS.matches(&content).iter().count() as u32 * KEYWORD_SCORE;
    score += CODE_BLOCK.find_iter(&content).count() as u32 * CODE_BLOCK_SCORE;
    score += match message.role {
        Role::System => SYSTEM_SCORE,
        Role::Tool => TOOL_SCORE,
        Role::User | Role::Assistant => 0,
    };
    if PATH_REFERENCE.is_match(&content) {
        score += PATH_SCORE;
    }
    score
}

pub fn is_summary(message: &Message) -> bool {
    message.role == Role::Assistant && message.text().starts_with(SUMMARY_PREFIX)
}

/// System prompts, chunk summaries and anything scoring at least
/// [`CRITICAL_THRESHOLD`].
pub fn is_critical(message: &Message) -> bool {
    message.is_system() || is_summary(message) || importance_score(message) >= CRITICAL_THRESHOLD
}

/// Indices of messages that compression must preserve.
pub fn identify_critical_messages(messages: &[Message]) -> BTreeSet<usize> {
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| is_critical(m))
        .map(|(i, _)| i)
        .collect()
}

/// Keep a critical message verbatim; otherwise shorten it to a preview.
pub fn condense(message: &Message) -> Message {
    if importance_score(message) >= CRITICAL_THRESHOLD {
        return message.clone();
    }

    let content = message.content.serialized();
    let condensed = if content.chars().count() > CONDENSED_PREVIEW_CHARS {
        let preview: String = content.chars().take(CONDENSED_PREVIEW_CHARS).collect();
        format!("[Condensed] {preview}...[truncated]")
    } else {
        format!("[Condensed] {content}")
    };
    Message::new(message.role, MessageContent::Text(condensed))
}
