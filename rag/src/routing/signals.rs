//! Regex signals for query routing.
//!
//! All patterns run against lowercased, diacritic-folded text and are
//! compiled once.

use regex::Regex;
use std::sync::LazyLock;

use crate::text::tokens;

/// Intent of a structured (aggregate) question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredIntent {
    /// "how many ..."
    Count,
    /// "list all ...", "what are the ..."
    List,
}

/// Pronouns and demonstratives that point back at an earlier turn.
pub const REFERENCE_TERMS: &[&str] = &[
    "it", "its", "this", "that", "these", "those", "they", "them", "their",
];

// --- Regex patterns (compiled once) ---

static COUNT_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(how\s+many|number\s+of|total\s+number|count\s+of|amount\s+of|how\s+much|quantity\s+of)\b").unwrap()
});

static PRODUCT_TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(product|item|brand|categor(y|ies))").unwrap());

static HOW_MANY_THERE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"how\s+many\s+.+\s(are|is)\s+(there|listed|available|offered)").unwrap()
});

static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(list\s+(all|the)|what\s+(are|is)\s+(all|the)|show\s+(all|the|me)|tell\s+me\s+(all|the)|what\s.*(products|brands)|which\s.*(products|brands))").unwrap()
});

static TOTAL_PRODUCTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((all|total).*(products|items)|(products|items).*(site|listed|available|offered|total))").unwrap()
});

static ALL_PRODUCTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\ball\s+(the\s+)?products\b").unwrap());

static PURCHASE_INTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(buy|buying|purchase|purchasing|where|shop|shops|shopping|store|stores|order|ordering|online|amazon|sell|sells|sold|retailer|retailers|nearby|near\s+me)\b").unwrap()
});

/// Classify an already-lowercased query as count, list, or neither.
///
/// Count is checked before list.
pub fn structured_intent(query: &str) -> Option<StructuredIntent> {
    if is_count_query(query) {
        Some(StructuredIntent::Count)
    } else if is_list_query(query) {
        Some(StructuredIntent::List)
    } else {
        None
    }
}

fn is_count_query(query: &str) -> bool {
    if HOW_MANY_THERE_RE.is_match(query) {
        return true;
    }
    COUNT_PHRASE_RE.is_match(query) && PRODUCT_TERM_RE.is_match(query)
}

fn is_list_query(query: &str) -> bool {
    LIST_RE.is_match(query)
}

/// Whether a count question is about the whole catalog.
pub fn asks_for_total(query: &str) -> bool {
    TOTAL_PRODUCTS_RE.is_match(query)
}

/// Whether a list question asks for every product.
pub fn asks_for_all_products(query: &str) -> bool {
    ALL_PRODUCTS_RE.is_match(query)
}

/// Whether the query is about buying a product or finding where it is sold.
pub fn has_purchase_intent(query: &str) -> bool {
    PURCHASE_INTENT_RE.is_match(&query.to_lowercase())
}

/// Whether the query contains a reference term as a whole word.
pub fn has_reference_term(query: &str) -> bool {
    tokens(query)
        .iter()
        .any(|t| REFERENCE_TERMS.contains(&t.as_str()))
}
