//! Conversational context carrying for follow-up questions.
//!
//! Users phrase follow-ups with anaphora: "break those down by gender",
//! "show the same thing for managers". The model only sees one question at a
//! time through the session surface, so the carrier keeps a one-line label of
//! the previous turn's topic and splices it into the next question whenever
//! the wording suggests a back-reference. One step of memory, overwritten
//! every turn; this is a heuristic, not a semantic memory system.

/// Words whose presence suggests the question references prior conversation.
pub const FOLLOW_UP_INDICATORS: [&str; 7] =
    ["those", "that", "these", "same", "previous", "earlier", "them"];

/// Ordered topic rules evaluated against the lowercased question.
///
/// Each rule maps the question to at most one label; matched labels join with
/// ". " in rule order to form the next context string.
const TOPIC_RULES: &[fn(&str) -> Option<&'static str>] = &[department_topic, employee_topic];

fn department_topic(question: &str) -> Option<&'static str> {
    if !question.contains("department") {
        return None;
    }
    if question.contains("distribution") || question.contains("count") {
        Some("Previously analyzed department distribution")
    } else if question.contains("satisfaction") {
        Some("Previously analyzed job satisfaction by department")
    } else {
        None
    }
}

fn employee_topic(question: &str) -> Option<&'static str> {
    if question.contains("employee") {
        Some("Previously discussed employee data")
    } else {
        None
    }
}

/// Carries a one-line summary of the previous turn's topic across questions.
///
/// At most one context string is live at a time; it represents only the most
/// recent turn and is replaced unconditionally after every question.
#[derive(Debug, Clone, Default)]
pub struct ContextCarrier {
    last_query_context: String,
}

impl ContextCarrier {
    /// Create a carrier with no stored context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently stored context string, empty when the previous turn
    /// matched no topic rule.
    pub fn last_query_context(&self) -> &str {
        &self.last_query_context
    }

    /// Whether the question looks like a follow-up to prior conversation.
    ///
    /// Case-insensitive substring match against the fixed indicator set.
    pub fn is_follow_up(question: &str) -> bool {
        let lowered = question.to_lowercase();
        FOLLOW_UP_INDICATORS.iter().any(|indicator| lowered.contains(indicator))
    }

    /// Produce the question to forward to the model.
    ///
    /// When the question carries a follow-up indicator and a context string is
    /// stored, the stored context is prepended verbatim ahead of the literal
    /// question. Otherwise the question passes through unchanged.
    pub fn enhance_question(&self, question: &str) -> String {
        if Self::is_follow_up(question) && !self.last_query_context.is_empty() {
            format!(
                "[CONTEXT: {}]\n\nUser question: {}",
                self.last_query_context, question
            )
        } else {
            question.to_string()
        }
    }

    /// Recompute the stored context from the question just answered.
    ///
    /// Only the question is consulted, never the response. The old context is
    /// replaced unconditionally; a question matching no rule clears it.
    pub fn observe_turn(&mut self, question: &str) {
        let lowered = question.to_lowercase();
        let labels: Vec<&str> =
            TOPIC_RULES.iter().filter_map(|rule| rule(&lowered)).collect();

        self.last_query_context = labels.join(". ");
    }
}
