//! Azure Cognitive Search full-text source (REST API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::KnowledgeSource;
use crate::error::RagError;
use crate::text::is_resource_name;
use crate::types::ContextDocument;

const COLLABORATOR: &str = "search";

pub const SEARCH_API_VERSION: &str = "2023-11-01";

/// Documents requested per query.
const TOP: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    search: &'a str,
    query_type: &'static str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "@search.score", default)]
    score: Option<f32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<SearchHit> for ContextDocument {
    fn from(hit: SearchHit) -> Self {
        ContextDocument {
            title: non_blank(hit.title),
            body: hit.content.unwrap_or_default(),
            url: non_blank(hit.url),
            score: hit.score,
        }
    }
}

/// Search index source using `POST {endpoint}/indexes/{index}/docs/search`.
pub struct AzureSearchSource {
    client: reqwest::Client,
    endpoint: String,
    index: String,
    api_key: String,
}

impl AzureSearchSource {
    /// Create a source. Missing endpoint or key makes it unavailable; an
    /// index name that is not a plain identifier is rejected.
    pub fn new(
        endpoint: impl Into<String>,
        index: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, RagError> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        let unavailable = |message: &str| RagError::CollaboratorUnavailable {
            collaborator: COLLABORATOR,
            message: message.to_string(),
        };
        if endpoint.is_empty() {
            return Err(unavailable("no endpoint configured"));
        }
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| unavailable("no API key configured"))?;
        let index = index.into();
        if !is_resource_name(&index) {
            return Err(RagError::InvalidInput(format!("invalid index name: {index:?}")));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            index,
            api_key,
        })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, SEARCH_API_VERSION
        )
    }
}

#[async_trait]
impl KnowledgeSource for AzureSearchSource {
    fn name(&self) -> &'static str {
        COLLABORATOR
    }

    async fn query(&self, text: &str) -> Result<Vec<ContextDocument>, RagError> {
        let request = SearchRequest {
            search: text,
            query_type: "simple",
            top: TOP,
        };
        let response = self
            .client
            .post(self.search_url())
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::collaborator(
                COLLABORATOR,
                format!("search returned {status}: {body}"),
            ));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.value.into_iter().map(ContextDocument::from).collect())
    }
}
