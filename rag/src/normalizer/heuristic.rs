use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProductNormalizer;
use crate::catalog::{Catalog, KeyLookup};
use crate::text::normalize_key;

/// Longest run of consecutive words tried as a single product name.
const MAX_WINDOW_WORDS: usize = 4;

/// Keys shorter than this never take part in substring matching.
const MIN_SUBSTRING_LEN: usize = 3;

/// Outcome of one matching rule.
enum Rule {
    Found(String),
    /// The text names more than one product; stop without guessing
    Ambiguous,
    NoMatch,
}

impl Rule {
    fn from_lookup(lookup: KeyLookup<'_>) -> Self {
        match lookup {
            KeyLookup::Unique(entry) => Rule::Found(entry.canonical_name.clone()),
            KeyLookup::Ambiguous => Rule::Ambiguous,
            KeyLookup::Missing => Rule::NoMatch,
        }
    }
}

/// Deterministic catalog matching.
///
/// Rules, first match wins:
/// 1. the whole text's normalized key is a catalog key;
/// 2. runs of consecutive words (longest runs first, down to single
///    tokens) normalize to catalog keys, and all of them name the same
///    product;
/// 3. the text's key contains a catalog key (the longest one), or is
///    contained in exactly one product's key.
#[derive(Debug, Clone)]
pub struct HeuristicNormalizer {
    catalog: Arc<Catalog>,
}

impl HeuristicNormalizer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Synchronous resolution, used directly when scanning history.
    pub fn resolve(&self, text: &str) -> Option<String> {
        let key = normalize_key(text);
        if key.is_empty() {
            return None;
        }

        let mut outcome = Rule::from_lookup(self.catalog.lookup_key(&key));
        if matches!(outcome, Rule::NoMatch) {
            outcome = self.match_word_runs(text);
        }
        if matches!(outcome, Rule::NoMatch) {
            outcome = self.match_substring(&key);
        }

        match outcome {
            Rule::Found(name) => Some(name),
            Rule::Ambiguous => {
                log::debug!("Product mention {:?} is ambiguous, not resolving", text);
                None
            }
            Rule::NoMatch => None,
        }
    }

    fn match_word_runs(&self, text: &str) -> Rule {
        let words: Vec<String> = text
            .split_whitespace()
            .map(normalize_key)
            .filter(|w| !w.is_empty())
            .collect();

        // Word positions already claimed by a longer matching run.
        let mut claimed = vec![false; words.len()];
        let mut names: BTreeSet<String> = BTreeSet::new();
        for size in (1..=words.len().min(MAX_WINDOW_WORDS)).rev() {
            for start in 0..=words.len() - size {
                let span = start..start + size;
                if claimed[span.clone()].iter().any(|&c| c) {
                    continue;
                }
                match Rule::from_lookup(self.catalog.lookup_key(&words[span.clone()].concat())) {
                    Rule::NoMatch => continue,
                    Rule::Ambiguous => return Rule::Ambiguous,
                    Rule::Found(name) => {
                        claimed[span].iter_mut().for_each(|c| *c = true);
                        names.insert(name);
                    }
                }
            }
        }
        if names.is_empty() {
            Rule::NoMatch
        } else {
            single(names.iter().map(String::as_str).collect())
        }
    }

    fn match_substring(&self, key: &str) -> Rule {
        let mut best: Option<(usize, BTreeSet<&str>)> = None;
        for (candidate, entry) in self.catalog.keys() {
            if candidate.len() < MIN_SUBSTRING_LEN || !key.contains(candidate) {
                continue;
            }
            let name = entry.canonical_name.as_str();
            let longest = best.as_ref().map_or(0, |(len, _)| *len);
            if candidate.len() > longest {
                best = Some((candidate.len(), BTreeSet::from([name])));
            } else if candidate.len() == longest {
                if let Some((_, names)) = best.as_mut() {
                    names.insert(name);
                }
            }
        }
        if let Some((_, names)) = best {
            return single(names);
        }

        if key.len() < MIN_SUBSTRING_LEN {
            return Rule::NoMatch;
        }
        let containing: BTreeSet<&str> = self
            .catalog
            .keys()
            .filter(|(candidate, _)| candidate.contains(key))
            .map(|(_, entry)| entry.canonical_name.as_str())
            .collect();
        if containing.is_empty() {
            Rule::NoMatch
        } else {
            single(containing)
        }
    }
}

fn single(names: BTreeSet<&str>) -> Rule {
    let mut iter = names.into_iter();
    match (iter.next(), iter.next()) {
        (Some(name), None) => Rule::Found(name.to_string()),
        _ => Rule::Ambiguous,
    }
}

#[async_trait]
impl ProductNormalizer for HeuristicNormalizer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn normalize(&self, text: &str) -> Option<String> {
        self.resolve(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;

    fn normalizer() -> HeuristicNormalizer {
        HeuristicNormalizer::new(Arc::new(sample_catalog()))
    }

    #[test]
    fn test_whole_text_match() {
        let n = normalizer();
        assert_eq!(n.resolve("KitKat").as_deref(), Some("KitKat"));
        assert_eq!(n.resolve("kit kat").as_deref(), Some("KitKat"));
        assert_eq!(n.resolve("HAAGEN-DAZS").as_deref(), Some("Häagen-Dazs"));
    }

    #[test]
    fn test_token_match_in_sentence() {
        let n = normalizer();
        assert_eq!(n.resolve("Where can I buy Kit-Kat?").as_deref(), Some("KitKat"));
        assert_eq!(n.resolve("Do you sell haagendazs?").as_deref(), Some("Häagen-Dazs"));
    }

    #[test]
    fn test_longer_word_runs_win() {
        let n = normalizer();
        assert_eq!(
            n.resolve("Where can I buy Nescafé Gold?").as_deref(),
            Some("Nescafé Gold")
        );
        assert_eq!(n.resolve("Tell me about after 8").as_deref(), Some("After Eight"));
        assert_eq!(
            n.resolve("Is Starbucks by Nescafé strong?").as_deref(),
            Some("Starbucks by Nescafé")
        );
    }

    #[test]
    fn test_two_products_in_one_sentence_do_not_resolve() {
        let n = normalizer();
        assert_eq!(n.resolve("Where can I buy KitKat or Aero?"), None);
        assert_eq!(n.resolve("Is Nescafé Gold better than Nespresso?"), None);
    }

    #[test]
    fn test_repeated_mention_of_one_product_resolves() {
        let n = normalizer();
        assert_eq!(
            n.resolve("KitKat, I mean kit kat, where is it sold?").as_deref(),
            Some("KitKat")
        );
    }

    #[test]
    fn test_substring_prefers_longest_key() {
        let n = normalizer();
        assert_eq!(n.resolve("nescafegoldblend").as_deref(), Some("Nescafé Gold"));
    }

    #[test]
    fn test_contained_in_single_key() {
        let n = normalizer();
        assert_eq!(n.resolve("smart").as_deref(), Some("Smarties"));
        // Prefix of several coffee products: ambiguous, never guessed.
        assert_eq!(n.resolve("nesc"), None);
    }

    #[test]
    fn test_no_match() {
        let n = normalizer();
        assert_eq!(n.resolve("Milo"), None);
        assert_eq!(n.resolve(""), None);
        assert_eq!(n.resolve("?!"), None);
        assert_eq!(n.resolve("Is it gluten free?"), None);
    }

    #[test]
    fn test_colliding_keys_do_not_resolve() {
        let products = r#"{"products": [
            {"name": "Coffee-Mate", "amazon_link": "a"},
            {"name": "Coffee Mate", "amazon_link": "b"}
        ]}"#;
        let catalog = Catalog::from_json(products, r#"{"stores": []}"#).unwrap();
        let n = HeuristicNormalizer::new(Arc::new(catalog));
        assert_eq!(n.resolve("coffeemate"), None);
        assert_eq!(n.resolve("I like coffee mate"), None);
    }
}
