//! Neo4j knowledge graph source over the HTTP transactional endpoint.
//!
//! When a completion provider is attached, the question is first translated
//! into Cypher by the model. Generated queries are checked before they are
//! sent: they must be read-only and every `$parameter` must be a plain
//! identifier, with values always passed as parameters. If generation fails
//! or finds nothing, a fixed keyword query over `Content` nodes runs instead.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::KnowledgeSource;
use crate::catalog::Catalog;
use crate::error::RagError;
use crate::generation::{
    CYPHER_SYSTEM_PROMPT, ChatMessage, CompletionProvider, GenerationParams, cypher_request,
};
use crate::normalizer::HeuristicNormalizer;
use crate::text::{fold_lower, is_resource_name};
use crate::types::ContextDocument;

const COLLABORATOR: &str = "graph";

/// Keyword search over crawled pages, ranked by how many keywords hit.
const KEYWORD_QUERY: &str = "MATCH (n:Content)
WHERE any(k IN $keywords WHERE toLower(n.title) CONTAINS k OR toLower(n.content) CONTAINS k)
RETURN n.title AS title, n.content AS content, n.url AS url
ORDER BY size([k IN $keywords WHERE toLower(n.title) CONTAINS k]) +
         size([k IN $keywords WHERE toLower(n.content) CONTAINS k]) DESC
LIMIT 5";

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "with", "by",
];

static WRITE_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(create|merge|delete|detach|set|remove|drop|call|load|foreach)\b").unwrap()
});

static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\w*)").unwrap());

// --- Wire types ---

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<TxStatement<'a>>,
}

#[derive(Debug, Serialize)]
struct TxStatement<'a> {
    statement: &'a str,
    parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Remove markdown code fences a model may wrap its answer in.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```cypher", "")
        .replace("```Cypher", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Check a generated query and return its parameter names.
///
/// Rejects empty queries, write clauses and parameters that are not plain
/// identifiers.
pub fn validate_cypher(cypher: &str) -> Result<BTreeSet<String>, RagError> {
    if cypher.trim().is_empty() {
        return Err(RagError::InvalidInput("empty Cypher query".to_string()));
    }
    if let Some(m) = WRITE_CLAUSE_RE.find(cypher) {
        return Err(RagError::InvalidInput(format!(
            "Cypher query contains write clause '{}'",
            m.as_str()
        )));
    }

    let mut names = BTreeSet::new();
    for cap in PARAM_RE.captures_iter(cypher) {
        let name = &cap[1];
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid {
            return Err(RagError::InvalidInput(format!(
                "invalid Cypher parameter '${name}'"
            )));
        }
        names.insert(name.to_string());
    }
    Ok(names)
}

/// Lowercase search keywords: stopwords and words of two letters or fewer
/// are dropped, surrounding punctuation is trimmed.
pub fn extract_keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map result rows onto documents by column name.
fn rows_to_documents(result: &TxResult) -> Vec<ContextDocument> {
    let column = |names: &[&str]| {
        result
            .columns
            .iter()
            .position(|c| names.contains(&c.to_lowercase().as_str()))
    };
    let title_col = column(&["title", "name"]);
    let body_col = column(&["content", "body", "text", "description"]);
    let url_col = column(&["url", "source"]);
    let score_col = column(&["score"]);

    result
        .data
        .iter()
        .filter_map(|row| {
            let get = |idx: Option<usize>| idx.and_then(|i| row.row.get(i)).and_then(value_text);
            let body = get(body_col)?;
            Some(ContextDocument {
                title: get(title_col),
                body,
                url: get(url_col),
                score: score_col
                    .and_then(|i| row.row.get(i))
                    .and_then(Value::as_f64)
                    .map(|s| s as f32),
            })
        })
        .collect()
}

/// Neo4j source using `POST {uri}/db/{database}/tx/commit`.
pub struct Neo4jGraphSource {
    client: reqwest::Client,
    uri: String,
    database: String,
    user: String,
    password: String,
    generator: Option<Arc<dyn CompletionProvider>>,
    catalog: Option<Arc<Catalog>>,
}

impl Neo4jGraphSource {
    /// Create a source. Missing uri or password makes it unavailable.
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: Option<String>,
        database: impl Into<String>,
    ) -> Result<Self, RagError> {
        let uri = uri.into().trim().trim_end_matches('/').to_string();
        let unavailable = |message: &str| RagError::CollaboratorUnavailable {
            collaborator: COLLABORATOR,
            message: message.to_string(),
        };
        if uri.is_empty() {
            return Err(unavailable("no URI configured"));
        }
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| unavailable("no password configured"))?;
        let database = database.into();
        if !is_resource_name(&database) {
            return Err(RagError::InvalidInput(format!(
                "invalid database name: {database:?}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            uri,
            database,
            user: user.into(),
            password,
            generator: None,
            catalog: None,
        })
    }

    /// Translate questions into Cypher with this provider before falling
    /// back to keyword search.
    pub fn with_query_generator(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.generator = Some(provider);
        self
    }

    /// Use catalog names to fill `$product` and `$category` parameters.
    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    fn tx_url(&self) -> String {
        format!("{}/db/{}/tx/commit", self.uri, self.database)
    }

    /// Run `RETURN 1` to check connectivity and credentials.
    pub async fn verify(&self) -> Result<(), RagError> {
        self.run("RETURN 1", Map::new()).await.map(|_| ())
    }

    async fn run(&self, cypher: &str, parameters: Map<String, Value>) -> Result<Option<TxResult>, RagError> {
        let request = TxRequest {
            statements: vec![TxStatement {
                statement: cypher,
                parameters,
            }],
        };
        let response = self
            .client
            .post(self.tx_url())
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::collaborator(
                COLLABORATOR,
                format!("Neo4j returned {status}: {body}"),
            ));
        }

        let parsed: TxResponse = response.json().await?;
        if let Some(err) = parsed.errors.first() {
            return Err(RagError::collaborator(
                COLLABORATOR,
                format!("{}: {}", err.code, err.message),
            ));
        }
        Ok(parsed.results.into_iter().next())
    }

    async fn execute(
        &self,
        cypher: &str,
        parameters: Map<String, Value>,
    ) -> Result<Vec<ContextDocument>, RagError> {
        Ok(self
            .run(cypher, parameters)
            .await?
            .map(|result| rows_to_documents(&result))
            .unwrap_or_default())
    }

    fn parameter_value(&self, name: &str, text: &str) -> Value {
        let lname = name.to_lowercase();
        if lname == "keywords" {
            return json!(extract_keywords(text));
        }
        if lname.contains("product") {
            if let Some(catalog) = &self.catalog {
                if let Some(product) = HeuristicNormalizer::new(Arc::clone(catalog)).resolve(text) {
                    return json!(product);
                }
            }
        }
        if lname.contains("category") {
            if let Some(category) = self.category_in(text) {
                return json!(category);
            }
        }
        json!(text)
    }

    fn category_in(&self, text: &str) -> Option<String> {
        let catalog = self.catalog.as_ref()?;
        let words: Vec<String> = fold_lower(text)
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let joined = format!(" {} ", words.join(" "));
        catalog
            .entries()
            .iter()
            .filter_map(|e| e.category.as_deref())
            .map(|c| c.trim().to_lowercase())
            .find(|c| !c.is_empty() && joined.contains(&format!(" {} ", fold_lower(c))))
    }

    async fn generated_query(
        &self,
        provider: &dyn CompletionProvider,
        text: &str,
    ) -> Result<Vec<ContextDocument>, RagError> {
        let answer = provider
            .complete_with(
                CYPHER_SYSTEM_PROMPT,
                &[ChatMessage::user(cypher_request(text))],
                GenerationParams::precise(),
            )
            .await?;
        let cypher = strip_code_fences(&answer);
        let names = validate_cypher(&cypher)?;
        log::debug!("Generated Cypher: {}", cypher);

        let parameters = names
            .iter()
            .map(|name| (name.clone(), self.parameter_value(name, text)))
            .collect();
        self.execute(&cypher, parameters).await
    }
}

#[async_trait]
impl KnowledgeSource for Neo4jGraphSource {
    fn name(&self) -> &'static str {
        COLLABORATOR
    }

    async fn query(&self, text: &str) -> Result<Vec<ContextDocument>, RagError> {
        if let Some(generator) = &self.generator {
            match self.generated_query(generator.as_ref(), text).await {
                Ok(docs) if !docs.is_empty() => return Ok(docs),
                Ok(_) => log::debug!("Generated Cypher found nothing, using keyword search"),
                Err(e) => log::warn!("Generated Cypher rejected or failed: {}", e),
            }
        }

        let keywords = extract_keywords(text);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let mut parameters = Map::new();
        parameters.insert("keywords".to_string(), json!(keywords));
        self.execute(KEYWORD_QUERY, parameters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;

    fn source() -> Neo4jGraphSource {
        Neo4jGraphSource::new("http://localhost:7474/", "neo4j", Some("pw".into()), "neo4j")
            .unwrap()
            .with_catalog(Arc::new(sample_catalog()))
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```cypher\nMATCH (n) RETURN n\n```"),
            "MATCH (n) RETURN n"
        );
        assert_eq!(strip_code_fences("  MATCH (n) RETURN n "), "MATCH (n) RETURN n");
    }

    #[test]
    fn test_validate_accepts_read_query() {
        let names = validate_cypher(
            "MATCH (c:Content)-[:MENTIONS]->(e:Entity) WHERE e.title = $product RETURN c.title AS title LIMIT $limit_1",
        )
        .unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["limit_1", "product"]);
    }

    #[test]
    fn test_validate_rejects_writes() {
        for cypher in [
            "MATCH (n) DETACH DELETE n",
            "CREATE (n:Content {title: 'x'})",
            "MATCH (n) set n.title = 'x'",
            "CALL db.labels()",
            "LOAD CSV FROM 'file:///x' AS row RETURN row",
        ] {
            let err = validate_cypher(cypher).unwrap_err();
            assert!(matches!(err, RagError::InvalidInput(_)), "{cypher}");
        }
        // "offset" and "settings" are not write clauses
        assert!(validate_cypher("MATCH (n) WHERE n.settings = $offset RETURN n").is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(validate_cypher("MATCH (n) WHERE n.x = $1 RETURN n").is_err());
        assert!(validate_cypher("MATCH (n) WHERE n.x = $`evil` RETURN n").is_err());
        assert!(validate_cypher("   ").is_err());
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(
            extract_keywords("What is the sugar content of KitKat?"),
            vec!["what", "sugar", "content", "kitkat"]
        );
        assert!(extract_keywords("is it ok").is_empty());
    }

    #[test]
    fn test_rows_to_documents() {
        let result: TxResult = serde_json::from_value(json!({
            "columns": ["title", "content", "url"],
            "data": [
                {"row": ["KitKat", "Wafer bar", "https://x/kitkat"]},
                {"row": [null, "Untitled page", ""]},
                {"row": ["Empty", null, "https://x/empty"]}
            ]
        }))
        .unwrap();
        let docs = rows_to_documents(&result);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title.as_deref(), Some("KitKat"));
        assert_eq!(docs[0].url.as_deref(), Some("https://x/kitkat"));
        assert_eq!(docs[1].title, None);
        assert_eq!(docs[1].url, None);
    }

    #[test]
    fn test_parameter_values_from_catalog() {
        let s = source();
        let q = "Which chocolate bars contain Kit Kat wafers?";
        assert_eq!(s.parameter_value("product", q), json!("KitKat"));
        assert_eq!(s.parameter_value("productName", q), json!("KitKat"));
        assert_eq!(s.parameter_value("category", q), json!("chocolate"));
        assert_eq!(s.parameter_value("query", q), json!(q));
        assert_eq!(s.parameter_value("anything", q), json!(q));
        assert_eq!(s.parameter_value("product", "hello there"), json!("hello there"));
    }

    #[test]
    fn test_tx_url_and_request_body() {
        let s = source();
        assert_eq!(s.tx_url(), "http://localhost:7474/db/neo4j/tx/commit");

        let mut parameters = Map::new();
        parameters.insert("keywords".into(), json!(["kitkat"]));
        let body = serde_json::to_value(TxRequest {
            statements: vec![TxStatement {
                statement: KEYWORD_QUERY,
                parameters,
            }],
        })
        .unwrap();
        assert_eq!(body["statements"][0]["parameters"]["keywords"][0], "kitkat");
    }

    #[test]
    fn test_unconfigured_is_unavailable() {
        let err = Neo4jGraphSource::new("http://localhost:7474", "neo4j", None, "neo4j")
            .err()
            .unwrap();
        assert!(err.is_unavailable());
        let err = Neo4jGraphSource::new("", "neo4j", Some("pw".into()), "neo4j")
            .err()
            .unwrap();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_invalid_database_name() {
        let err = Neo4jGraphSource::new("http://x", "neo4j", Some("pw".into()), "neo4j/../system")
            .err()
            .unwrap();
        assert!(matches!(err, RagError::InvalidInput(_)));
    }
}
