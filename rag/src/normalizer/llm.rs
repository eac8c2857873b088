use std::sync::Arc;

use async_trait::async_trait;

use super::ProductNormalizer;
use crate::catalog::{Catalog, KeyLookup};
use crate::generation::{CompletionProvider, product_lookup_prompt};
use crate::text::normalize_key;

/// Asks the completion collaborator to pick a product from the catalog.
///
/// The answer is only trusted when it is a canonical name, or normalizes to
/// exactly one catalog entry. Anything else (including call failures) counts
/// as "no decision" so the next strategy runs.
pub struct LlmNormalizer {
    catalog: Arc<Catalog>,
    provider: Arc<dyn CompletionProvider>,
}

impl LlmNormalizer {
    pub fn new(catalog: Arc<Catalog>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { catalog, provider }
    }

    fn validate(&self, answer: &str) -> Option<String> {
        let cleaned = answer
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.'))
            .trim();
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
            return None;
        }

        if let Some(entry) = self.catalog.entry(cleaned) {
            return Some(entry.canonical_name.clone());
        }
        match self.catalog.lookup_key(&normalize_key(cleaned)) {
            KeyLookup::Unique(entry) => Some(entry.canonical_name.clone()),
            _ => {
                log::debug!("Ignoring product answer not in catalog: {:?}", cleaned);
                None
            }
        }
    }
}

#[async_trait]
impl ProductNormalizer for LlmNormalizer {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn normalize(&self, text: &str) -> Option<String> {
        let names = self.catalog.canonical_names();
        let prompt = product_lookup_prompt(self.catalog.owner(), text, &names);

        match self.provider.complete_prompt(&prompt).await {
            Ok(answer) => self.validate(&answer),
            Err(e) => {
                log::warn!("Product lookup via {} failed: {}", self.provider.name(), e);
                None
            }
        }
    }
}
