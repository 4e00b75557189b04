use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::tier::ModelTier;
use crate::tools::ToolClass;
use crate::types::{Message, ToolInvocation};

const COMPLEXITY_KEYWORDS: &[&str] = &[
    "plan",
    "architect",
    "design",
    "refactor",
    "analyze",
    "investigate",
    "troubleshoot",
    "debug",
    "optimize",
    "improve",
    "explain",
    "comprehensive",
    "thorough",
    "detailed",
    "complex",
];

const SIMPLICITY_KEYWORDS: &[&str] = &[
    "read", "show", "list", "display", "print", "get", "fetch", "check", "what", "where", "which",
];

const LONG_MESSAGE_CHARS: usize = 500;
const LONG_MESSAGE_SENTENCES: usize = 5;
const LONG_TRANSCRIPT_MESSAGES: usize = 20;

fn keyword_patterns(words: &[&str]) -> Vec<Regex> {
    words
        .iter()
        .map(|w| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(w))).expect("valid keyword regex"))
        .collect()
}

static COMPLEXITY: LazyLock<Vec<Regex>> = LazyLock::new(|| keyword_patterns(COMPLEXITY_KEYWORDS));
static SIMPLICITY: LazyLock<Vec<Regex>> = LazyLock::new(|| keyword_patterns(SIMPLICITY_KEYWORDS));

/// Routing verdict for one turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskClassification {
    pub tier: ModelTier,
    pub reason: String,
    pub confidence: f32,
}

impl TaskClassification {
    fn new(tier: ModelTier, confidence: f32, reason: impl Into<String>) -> Self {
        Self {
            tier,
            reason: reason.into(),
            confidence,
        }
    }
}

fn count_matches(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

/// Classify the next unit of work. Never fails: ambiguous input lands on the
/// `balanced` default.
pub fn classify(
    user_message: &str,
    transcript: &[Message],
    pending_tools: &[ToolInvocation],
) -> TaskClassification {
    if !pending_tools.is_empty() {
        let classes: Vec<ToolClass> = pending_tools
            .iter()
            .map(|inv| ToolClass::of_tool(&inv.tool))
            .collect();

        if classes.iter().all(|c| *c == ToolClass::ReadOnly) {
            return TaskClassification::new(
                ModelTier::Fast,
                0.9,
                "All pending tools are read-only",
            );
        }

        let writes = classes.iter().filter(|c| **c == ToolClass::Write).count();
        if writes > 0 {
            return if pending_tools.len() == 1 {
                TaskClassification::new(ModelTier::Balanced, 0.8, "Single write operation")
            } else {
                TaskClassification::new(
                    ModelTier::Deep,
                    0.7,
                    format!(
                        "{} write operations among {} pending tools",
                        writes,
                        pending_tools.len()
                    ),
                )
            };
        }
    }

    let complexity = count_matches(&COMPLEXITY, user_message);
    let simplicity = count_matches(&SIMPLICITY, user_message);

    if complexity >= 2 {
        return TaskClassification::new(
            ModelTier::Deep,
            0.85,
            format!("{} complexity keywords", complexity),
        );
    }
    if simplicity >= 2 && complexity == 0 {
        return TaskClassification::new(
            ModelTier::Fast,
            0.8,
            format!("{} simplicity keywords", simplicity),
        );
    }
    if complexity == 1 {
        return TaskClassification::new(ModelTier::Deep, 0.6, "One complexity keyword");
    }

    let sentences = user_message
        .chars()
        .filter(|c| matches!(c, '.' | '!' | '?'))
        .count();
    if user_message.chars().count() > LONG_MESSAGE_CHARS || sentences > LONG_MESSAGE_SENTENCES {
        return TaskClassification::new(ModelTier::Deep, 0.7, "Long or multi-part request");
    }

    if transcript.len() > LONG_TRANSCRIPT_MESSAGES {
        return TaskClassification::new(
            ModelTier::Balanced,
            0.6,
            format!("Long conversation ({} messages)", transcript.len()),
        );
    }

    TaskClassification::new(ModelTier::Balanced, 0.5, "Default classification")
}
