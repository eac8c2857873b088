//! Token-budgeted prompt assembly.
//!
//! Token counts are estimated as characters / 4. Retrieved documents are
//! packed in order as `--- {title} ---\n{body}\n\n` blocks; the first block
//! that does not fit is truncated (if enough room is left) and everything
//! after it is dropped.

use crate::generation::{ChatMessage, question_message};
use crate::text::estimate_tokens;
use crate::types::{ContextDocument, Role, Turn};

/// Below this many remaining tokens a truncated block is not worth adding.
const MIN_TRUNCATED_TOKENS: usize = 30;

/// Appended to a truncated document body.
const CONTINUATION_MARKER: &str = "...";

/// Token accounting constants for the generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLimits {
    /// Context window reserved for the prompt
    pub ceiling: usize,
    /// Estimated framing cost of each history message
    pub per_message_overhead: usize,
    /// Slack kept free on top of every estimate
    pub safety_margin: usize,
}

impl Default for TokenLimits {
    fn default() -> Self {
        Self {
            ceiling: 14_000,
            per_message_overhead: 10,
            safety_margin: 200,
        }
    }
}

/// Everything sent to the completion collaborator for one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    /// History followed by the context-bearing question
    pub messages: Vec<ChatMessage>,
    /// The packed context block alone
    pub context: String,
}

/// Builds bounded prompts from documents, history and the user's question.
#[derive(Debug, Clone)]
pub struct ContextWindowBuilder {
    system_prompt: String,
    limits: TokenLimits,
}

impl ContextWindowBuilder {
    pub fn new(system_prompt: impl Into<String>, limits: TokenLimits) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            limits,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Tokens left for retrieved context once the system prompt, the query,
    /// the full history and the safety margin are accounted for.
    pub fn available_tokens(&self, history: &[Turn], query: &str) -> usize {
        let history_tokens: usize = history
            .iter()
            .map(|t| estimate_tokens(&t.text) + self.limits.per_message_overhead)
            .sum();
        self.limits
            .ceiling
            .saturating_sub(estimate_tokens(&self.system_prompt))
            .saturating_sub(estimate_tokens(query))
            .saturating_sub(history_tokens)
            .saturating_sub(self.limits.safety_margin)
    }

    /// Pack documents into a context block whose estimate stays within
    /// `token_budget`.
    pub fn format_context(documents: &[ContextDocument], token_budget: usize) -> String {
        // chars / 4 <= budget  <=>  chars <= budget * 4 + 3
        let allowed_chars = token_budget.saturating_mul(4).saturating_add(3);
        let mut out = String::new();
        let mut used_chars = 0usize;

        for (i, doc) in documents.iter().enumerate() {
            let title = doc
                .title
                .clone()
                .unwrap_or_else(|| format!("Document {}", i + 1));
            let header = format!("--- {title} ---\n");
            let block_chars = header.chars().count() + doc.body.chars().count() + 2;

            if used_chars + block_chars <= allowed_chars {
                out.push_str(&header);
                out.push_str(&doc.body);
                out.push_str("\n\n");
                used_chars += block_chars;
                continue;
            }

            let remaining_chars = allowed_chars - used_chars;
            if remaining_chars / 4 > MIN_TRUNCATED_TOKENS {
                let framing = header.chars().count() + CONTINUATION_MARKER.len() + 2;
                let body_chars = remaining_chars.saturating_sub(framing);
                if body_chars > 0 {
                    out.push_str(&header);
                    out.extend(doc.body.chars().take(body_chars));
                    out.push_str(CONTINUATION_MARKER);
                    out.push_str("\n\n");
                }
            }
            log::debug!(
                "Context budget of {} tokens reached at document {} of {}",
                token_budget,
                i + 1,
                documents.len()
            );
            break;
        }

        out
    }

    /// Assemble the prompt with an explicit context budget.
    ///
    /// `query` is the user's literal question; the retrieval-only rewrite of
    /// it never reaches this point.
    pub fn build(
        &self,
        documents: &[ContextDocument],
        history: &[Turn],
        query: &str,
        token_budget: usize,
    ) -> Prompt {
        let context = Self::format_context(documents, token_budget);
        let mut messages: Vec<ChatMessage> = history
            .iter()
            .filter(|t| t.role != Role::System)
            .map(ChatMessage::from)
            .collect();
        messages.push(ChatMessage::user(question_message(&context, query)));

        Prompt {
            system: self.system_prompt.clone(),
            messages,
            context,
        }
    }

    /// Assemble the prompt using the budget left by history and query.
    pub fn assemble(&self, documents: &[ContextDocument], history: &[Turn], query: &str) -> Prompt {
        let budget = self.available_tokens(history, query);
        self.build(documents, history, query, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(title: Option<&str>, body: &str) -> ContextDocument {
        ContextDocument {
            title: title.map(str::to_string),
            body: body.to_string(),
            url: None,
            score: None,
        }
    }

    fn turn(index: usize, role: Role, text: &str) -> Turn {
        Turn {
            index,
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_documents_yield_empty_context() {
        assert_eq!(ContextWindowBuilder::format_context(&[], 100), "");
        assert_eq!(ContextWindowBuilder::format_context(&[], 0), "");
    }

    #[test]
    fn test_documents_within_budget_kept_in_order() {
        let docs = vec![doc(Some("A"), "alpha"), doc(None, "beta")];
        let context = ContextWindowBuilder::format_context(&docs, 1000);
        assert_eq!(context, "--- A ---\nalpha\n\n--- Document 2 ---\nbeta\n\n");
    }

    #[test]
    fn test_overflowing_document_truncated_and_rest_dropped() {
        let docs = vec![
            doc(Some("A"), &"a".repeat(200)),
            doc(Some("B"), &"b".repeat(1000)),
            doc(Some("C"), "never shown"),
        ];
        let context = ContextWindowBuilder::format_context(&docs, 100);

        assert!(estimate_tokens(&context) <= 100);
        assert!(context.starts_with(&format!("--- A ---\n{}\n\n", "a".repeat(200))));
        assert!(context.contains("--- B ---\nbbb"));
        assert!(context.ends_with("...\n\n"));
        assert!(!context.contains("never shown"));
    }

    #[test]
    fn test_small_remainder_is_not_filled() {
        let docs = vec![doc(Some("A"), &"a".repeat(360)), doc(Some("B"), &"b".repeat(500))];
        let context = ContextWindowBuilder::format_context(&docs, 100);
        assert!(!context.contains("--- B ---"));
    }

    #[test]
    fn test_budget_never_exceeded() {
        let docs: Vec<_> = (0..20)
            .map(|i| doc(Some(&format!("Doc {i}")), &"x".repeat(37 * (i + 1))))
            .collect();
        for budget in [0, 1, 31, 50, 100, 333, 1000] {
            let context = ContextWindowBuilder::format_context(&docs, budget);
            assert!(estimate_tokens(&context) <= budget, "budget {budget}");
        }
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let docs = vec![doc(Some("Café"), &"é".repeat(2000))];
        let context = ContextWindowBuilder::format_context(&docs, 60);
        assert!(context.ends_with("...\n\n"));
        assert!(estimate_tokens(&context) <= 60);
    }

    #[test]
    fn test_available_tokens() {
        let builder = ContextWindowBuilder::new("s".repeat(400), TokenLimits::default());
        let history = vec![
            turn(0, Role::User, &"u".repeat(40)),
            turn(1, Role::Assistant, &"a".repeat(40)),
        ];
        // 14000 - 100 (system) - 10 (query) - 2 * (10 + 10) (history) - 200
        assert_eq!(builder.available_tokens(&history, &"q".repeat(40)), 13_650);
    }

    #[test]
    fn test_available_tokens_saturates() {
        let limits = TokenLimits {
            ceiling: 50,
            ..TokenLimits::default()
        };
        let builder = ContextWindowBuilder::new("system", limits);
        assert_eq!(builder.available_tokens(&[], "query"), 0);
    }

    #[test]
    fn test_assemble_sends_history_then_literal_question() {
        let builder = ContextWindowBuilder::new("be helpful", TokenLimits::default());
        let history = vec![
            turn(0, Role::User, "Tell me about KitKat"),
            turn(1, Role::Assistant, "KitKat is a wafer."),
        ];
        let docs = vec![doc(Some("KitKat"), "Contains wheat.")];
        let prompt = builder.assemble(&docs, &history, "Is it gluten free?");

        assert_eq!(prompt.system, "be helpful");
        assert_eq!(prompt.messages.len(), 3);
        assert_eq!(prompt.messages[1], ChatMessage::assistant("KitKat is a wafer."));
        let last = &prompt.messages[2].content;
        assert!(last.starts_with("Context:\n--- KitKat ---\nContains wheat."));
        assert!(last.ends_with("Question: Is it gluten free?"));
    }
}
