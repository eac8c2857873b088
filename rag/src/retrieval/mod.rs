//! Knowledge sources consulted for grounding context.
//!
//! Every source answers `query(text) -> documents`. The orchestrator turns
//! each call into an explicit [`RetrievalOutcome`] so falling back from the
//! graph to the search index is a plain match, not error handling.

mod graph;
mod search;

pub use graph::{Neo4jGraphSource, extract_keywords, strip_code_fences, validate_cypher};
pub use search::AzureSearchSource;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::RagError;
use crate::types::{ContextDocument, Reference};

/// A collaborator that retrieves context documents for a query.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Short name used in logs and status output.
    fn name(&self) -> &'static str;

    /// Documents relevant to `text`, best first. Empty is a valid answer.
    async fn query(&self, text: &str) -> Result<Vec<ContextDocument>, RagError>;
}

/// What one retrieval attempt produced.
#[derive(Debug)]
pub enum RetrievalOutcome {
    Found(Vec<ContextDocument>),
    /// The source answered but had nothing usable
    Empty,
    Failed(RagError),
}

impl RetrievalOutcome {
    /// Query a source, dropping documents without any body text.
    pub async fn fetch(source: &dyn KnowledgeSource, text: &str) -> Self {
        match source.query(text).await {
            Ok(docs) => {
                let usable: Vec<ContextDocument> = docs
                    .into_iter()
                    .filter(|d| !d.body.trim().is_empty())
                    .collect();
                if usable.is_empty() {
                    RetrievalOutcome::Empty
                } else {
                    RetrievalOutcome::Found(usable)
                }
            }
            Err(e) => RetrievalOutcome::Failed(e),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RetrievalOutcome::Found(_))
    }
}

/// `{title, url}` attributions in first-seen order, without duplicates.
///
/// Documents missing either field still feed generation but are never
/// attributed.
pub fn collect_references(documents: &[ContextDocument]) -> Vec<Reference> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter_map(ContextDocument::reference)
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Vec<ContextDocument>, ()>);

    #[async_trait]
    impl KnowledgeSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn query(&self, _text: &str) -> Result<Vec<ContextDocument>, RagError> {
            self.0
                .clone()
                .map_err(|_| RagError::collaborator("fixed", "down"))
        }
    }

    fn doc(title: Option<&str>, body: &str, url: Option<&str>) -> ContextDocument {
        ContextDocument {
            title: title.map(str::to_string),
            body: body.to_string(),
            url: url.map(str::to_string),
            score: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_found() {
        let source = Fixed(Ok(vec![doc(Some("A"), "body", None)]));
        assert!(RetrievalOutcome::fetch(&source, "q").await.is_found());
    }

    #[tokio::test]
    async fn test_fetch_blank_documents_are_empty() {
        let source = Fixed(Ok(vec![doc(Some("A"), "  ", None)]));
        assert!(matches!(
            RetrievalOutcome::fetch(&source, "q").await,
            RetrievalOutcome::Empty
        ));
        let none = Fixed(Ok(vec![]));
        assert!(matches!(
            RetrievalOutcome::fetch(&none, "q").await,
            RetrievalOutcome::Empty
        ));
    }

    #[tokio::test]
    async fn test_fetch_error_is_failed() {
        let source = Fixed(Err(()));
        assert!(matches!(
            RetrievalOutcome::fetch(&source, "q").await,
            RetrievalOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_references_deduplicated_in_first_seen_order() {
        let docs = vec![
            doc(Some("B"), "x", Some("https://b")),
            doc(Some("A"), "x", Some("https://a")),
            doc(Some("B"), "y", Some("https://b")),
            doc(None, "z", Some("https://c")),
            doc(Some("D"), "z", None),
        ];
        let refs = collect_references(&docs);
        let titles: Vec<&str> = refs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }
}
