//! Conversation state: per-session ordered turn logs.
//!
//! Sessions live behind the [`ConversationStore`] trait so the orchestrator
//! can be handed a persistent or shared backend later. The in-process
//! implementation keeps one `Vec<Turn>` per session in a `DashMap`: a session
//! id maps to a single shard lock, so appends to one session are serialized
//! while different sessions proceed in parallel.

use std::sync::LazyLock;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use regex::Regex;
use uuid::Uuid;

use crate::error::RagError;
use crate::routing::has_reference_term;
use crate::text::first_paragraph;
use crate::types::{Role, Turn};

static SESSION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]{1,128}$").unwrap());

/// Prefix added to the retrieval query when a reference term is resolved.
const PREVIOUS_ANSWER_HINT: &str = "Context from previous answer:";

/// Minimum number of turns before reference terms are resolved.
const MIN_TURNS_FOR_REFERENCES: usize = 2;

/// Reject session ids that could not be safely used as keys or log fields.
pub fn validate_session_id(session_id: &str) -> Result<(), RagError> {
    if SESSION_ID_RE.is_match(session_id) {
        Ok(())
    } else {
        Err(RagError::InvalidInput(format!(
            "session id must be 1-128 characters of [A-Za-z0-9_.:-], got {:?}",
            session_id
        )))
    }
}

/// A fresh, random session id.
pub fn generate_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

/// Storage for conversation turns keyed by session id.
///
/// Errors from any method are fatal to the request that triggered them.
pub trait ConversationStore: Send + Sync {
    /// Append a turn, creating the session if it does not exist yet.
    fn append(&self, session_id: &str, role: Role, text: &str) -> Result<Turn, RagError>;

    /// All turns of a session in insertion order (empty for unknown sessions).
    fn history(&self, session_id: &str) -> Result<Vec<Turn>, RagError>;

    /// Append a user question and its answer as adjacent turns. No other
    /// append to the same session can land between the two.
    fn append_exchange(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), RagError>;

    /// Drop every turn of a session. Later appends restart at index 0.
    fn clear(&self, session_id: &str) -> Result<(), RagError>;

    /// Remove a session entirely. Returns whether it existed.
    fn delete(&self, session_id: &str) -> Result<bool, RagError>;

    /// Number of known sessions.
    fn session_count(&self) -> usize;
}

/// Process-local conversation store backed by `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: DashMap<String, Vec<Turn>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn session_entry(&self, session_id: &str) -> RefMut<'_, String, Vec<Turn>> {
        self.sessions.entry(session_id.to_string()).or_insert_with(|| {
            log::info!("Created session {}", session_id);
            Vec::new()
        })
    }
}

fn push_turn(turns: &mut Vec<Turn>, role: Role, text: &str) -> Turn {
    let turn = Turn {
        index: turns.len(),
        role,
        text: text.to_string(),
        timestamp: Utc::now(),
    };
    turns.push(turn.clone());
    turn
}

impl ConversationStore for InMemoryConversationStore {
    fn append(&self, session_id: &str, role: Role, text: &str) -> Result<Turn, RagError> {
        validate_session_id(session_id)?;
        let mut turns = self.session_entry(session_id);
        Ok(push_turn(&mut turns, role, text))
    }

    fn append_exchange(
        &self,
        session_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), RagError> {
        validate_session_id(session_id)?;
        let mut turns = self.session_entry(session_id);
        push_turn(&mut turns, Role::User, question);
        push_turn(&mut turns, Role::Assistant, answer);
        Ok(())
    }

    fn history(&self, session_id: &str) -> Result<Vec<Turn>, RagError> {
        validate_session_id(session_id)?;
        Ok(self
            .sessions
            .get(session_id)
            .map(|turns| turns.clone())
            .unwrap_or_default())
    }

    fn clear(&self, session_id: &str) -> Result<(), RagError> {
        validate_session_id(session_id)?;
        if let Some(mut turns) = self.sessions.get_mut(session_id) {
            turns.clear();
            log::info!("Cleared session {}", session_id);
        }
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<bool, RagError> {
        validate_session_id(session_id)?;
        let existed = self.sessions.remove(session_id).is_some();
        if existed {
            log::info!("Deleted session {}", session_id);
        }
        Ok(existed)
    }

    fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Rewrite a query for retrieval when it refers back to an earlier answer.
///
/// If the query contains a reference term and the session already has at
/// least two turns, the first paragraph of the most recent assistant turn is
/// appended as a hint. Otherwise the query is returned unchanged.
pub fn enhance_query(history: &[Turn], query: &str) -> String {
    if history.len() < MIN_TURNS_FOR_REFERENCES || !has_reference_term(query) {
        return query.to_string();
    }

    let Some(previous) = history.iter().rev().find(|t| t.role == Role::Assistant) else {
        return query.to_string();
    };

    let paragraph = first_paragraph(&previous.text);
    if paragraph.is_empty() {
        return query.to_string();
    }

    log::debug!("Resolved reference term using turn {}", previous.index);
    format!("{query}\n\n{PREVIOUS_ANSWER_HINT} {paragraph}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seeded(store: &InMemoryConversationStore, id: &str) {
        store.append(id, Role::User, "Tell me about KitKat").unwrap();
        store
            .append(
                id,
                Role::Assistant,
                "KitKat is a chocolate-covered wafer bar.\n\nIt comes in many flavours.",
            )
            .unwrap();
    }

    #[test]
    fn test_history_in_append_order() {
        let store = InMemoryConversationStore::new();
        for i in 0..5 {
            store.append("s1", Role::User, &format!("message {i}")).unwrap();
        }
        let history = store.history("s1").unwrap();
        assert_eq!(history.len(), 5);
        for (i, turn) in history.iter().enumerate() {
            assert_eq!(turn.index, i);
            assert_eq!(turn.text, format!("message {i}"));
        }
    }

    #[test]
    fn test_unknown_session_is_empty() {
        let store = InMemoryConversationStore::new();
        assert!(store.history("nobody").unwrap().is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_clear_restarts_numbering() {
        let store = InMemoryConversationStore::new();
        seeded(&store, "s1");
        store.clear("s1").unwrap();
        assert!(store.history("s1").unwrap().is_empty());

        let turn = store.append("s1", Role::User, "again").unwrap();
        assert_eq!(turn.index, 0);
        assert_eq!(store.history("s1").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_removes_session() {
        let store = InMemoryConversationStore::new();
        seeded(&store, "s1");
        assert!(store.delete("s1").unwrap());
        assert!(!store.delete("s1").unwrap());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = InMemoryConversationStore::new();
        seeded(&store, "a");
        store.append("b", Role::User, "hello").unwrap();
        assert_eq!(store.history("a").unwrap().len(), 2);
        assert_eq!(store.history("b").unwrap().len(), 1);
        assert_eq!(store.session_count(), 2);
    }

    #[test]
    fn test_invalid_session_id_rejected() {
        let store = InMemoryConversationStore::new();
        let err = store.append("bad id; DROP", Role::User, "x").unwrap_err();
        assert!(matches!(err, RagError::InvalidInput(_)));
        assert!(store.history("").is_err());
        assert!(validate_session_id(&"a".repeat(129)).is_err());
        assert!(validate_session_id("session_abc:1.2-3").is_ok());
    }

    #[test]
    fn test_generated_session_id_is_valid() {
        let id = generate_session_id();
        assert!(id.starts_with("session_"));
        assert!(validate_session_id(&id).is_ok());
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_concurrent_appends_do_not_lose_turns() {
        let store = Arc::new(InMemoryConversationStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store
                            .append("shared", Role::User, &format!("{t}-{i}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.history("shared").unwrap();
        assert_eq!(history.len(), 400);
        assert!(history.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn test_concurrent_exchanges_stay_paired() {
        let store = Arc::new(InMemoryConversationStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("{t}-{i}");
                        store.append_exchange("shared", &id, &id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.history("shared").unwrap();
        assert_eq!(history.len(), 800);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].text, pair[1].text);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
    }

    #[test]
    fn test_append_exchange_rejects_invalid_session() {
        let store = InMemoryConversationStore::new();
        assert!(store.append_exchange("bad id", "q", "a").is_err());
        assert_eq!(store.session_count(), 0);
    }

    // --- Reference resolution ---

    #[test]
    fn test_enhance_query_with_reference_term() {
        let store = InMemoryConversationStore::new();
        seeded(&store, "s1");
        let history = store.history("s1").unwrap();

        let enhanced = enhance_query(&history, "Is it gluten free?");
        assert!(enhanced.starts_with("Is it gluten free?"));
        assert!(enhanced.contains("KitKat is a chocolate-covered wafer bar."));
        assert!(!enhanced.contains("many flavours"));
    }

    #[test]
    fn test_enhance_query_fresh_session_unchanged() {
        assert_eq!(enhance_query(&[], "Is it gluten free?"), "Is it gluten free?");
    }

    #[test]
    fn test_enhance_query_without_reference_term_unchanged() {
        let store = InMemoryConversationStore::new();
        seeded(&store, "s1");
        let history = store.history("s1").unwrap();
        assert_eq!(enhance_query(&history, "Is KitKat vegan?"), "Is KitKat vegan?");
    }

    #[test]
    fn test_enhance_query_needs_assistant_turn() {
        let store = InMemoryConversationStore::new();
        store.append("s1", Role::User, "one").unwrap();
        store.append("s1", Role::User, "two").unwrap();
        let history = store.history("s1").unwrap();
        assert_eq!(enhance_query(&history, "What is that?"), "What is that?");
    }
}
