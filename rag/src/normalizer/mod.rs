//! Product name normalization.
//!
//! Free-text product mentions are mapped to a catalog canonical name by a
//! fixed chain of strategies. The LLM-assisted strategy (when configured) runs
//! first; the deterministic heuristic runs after it. A strategy that cannot
//! decide returns `None` and the next one is tried. Ambiguous text never
//! resolves to a guess.

mod heuristic;
mod llm;

pub use heuristic::HeuristicNormalizer;
pub use llm::LlmNormalizer;

use std::sync::Arc;

use async_trait::async_trait;

/// A strategy mapping free text to a canonical product name.
#[async_trait]
pub trait ProductNormalizer: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Canonical name of the product mentioned in `text`, if any.
    async fn normalize(&self, text: &str) -> Option<String>;
}

/// Strategies tried in priority order; the first answer wins.
#[derive(Clone, Default)]
pub struct NormalizerChain {
    strategies: Vec<Arc<dyn ProductNormalizer>>,
}

impl NormalizerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy with lower priority than those already added.
    pub fn then(mut self, strategy: Arc<dyn ProductNormalizer>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl ProductNormalizer for NormalizerChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn normalize(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        for strategy in &self.strategies {
            if let Some(name) = strategy.normalize(text).await {
                log::debug!("{} normalized {:?} to {}", strategy.name(), text, name);
                return Some(name);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl ProductNormalizer for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn normalize(&self, _text: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[tokio::test]
    async fn test_chain_first_answer_wins() {
        let chain = NormalizerChain::new()
            .then(Arc::new(Fixed(None)))
            .then(Arc::new(Fixed(Some("Aero"))))
            .then(Arc::new(Fixed(Some("KitKat"))));
        assert_eq!(chain.normalize("anything").await.as_deref(), Some("Aero"));
        assert_eq!(chain.len(), 3);
    }

    #[tokio::test]
    async fn test_chain_falls_back_to_heuristic() {
        let catalog = Arc::new(sample_catalog());
        let chain = NormalizerChain::new()
            .then(Arc::new(Fixed(None)))
            .then(Arc::new(HeuristicNormalizer::new(catalog)));
        assert_eq!(
            chain.normalize("Where can I buy Kit-Kat?").await.as_deref(),
            Some("KitKat")
        );
    }

    #[tokio::test]
    async fn test_empty_chain_and_blank_text() {
        assert_eq!(NormalizerChain::new().normalize("KitKat").await, None);
        let chain = NormalizerChain::new().then(Arc::new(Fixed(Some("Aero"))));
        assert_eq!(chain.normalize("   ").await, None);
    }
}
