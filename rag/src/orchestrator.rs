//! Conversational retrieval orchestrator.
//!
//! One request runs through these stages:
//!
//! ```text
//! Classify -> ReferenceResolve -> GraphQuery -> VectorQuery -> ProductResolve
//!          -> StoreEnrich -> Generate -> Persist -> Respond
//! ```
//!
//! A structured answer short-circuits straight to `Persist`. Graph and search
//! failures fall through to the next source, generation failures become a
//! fixed apology, and enrichment failures just leave fields empty. Only
//! invalid input and conversation-state errors reach the caller.

use std::sync::Arc;

use crate::catalog::{Catalog, StructuredMetadata};
use crate::context::{ContextWindowBuilder, TokenLimits};
use crate::conversation::{
    ConversationStore, InMemoryConversationStore, enhance_query, generate_session_id,
    validate_session_id,
};
use crate::error::RagError;
use crate::generation::{
    CompletionProvider, GENERATION_FAILURE_APOLOGY, NO_CONTEXT_APOLOGY, system_prompt,
};
use crate::geo::{DEFAULT_MAX_DISTANCE_KM, DEFAULT_STORE_LIMIT, StoreMatcher};
use crate::normalizer::{HeuristicNormalizer, LlmNormalizer, NormalizerChain, ProductNormalizer};
use crate::retrieval::{KnowledgeSource, RetrievalOutcome, collect_references};
use crate::routing::{StructuredQueryClassifier, has_purchase_intent};
use crate::types::{
    AnswerSource, ChatRequest, ChatResponse, ContextDocument, NearbyStore, ProductInfo, Turn,
};

/// Pipeline stage, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    ReferenceResolve,
    GraphQuery,
    VectorQuery,
    ProductResolve,
    StoreEnrich,
    Generate,
    Persist,
    Respond,
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Radius for nearby store lookups
    pub max_distance_km: f64,
    /// Maximum stores returned
    pub store_limit: usize,
    /// Turns scanned for a product before the full history
    pub recent_product_turns: usize,
    /// Ask the completion provider to identify products first
    pub llm_normalization: bool,
    pub token_limits: TokenLimits,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            store_limit: DEFAULT_STORE_LIMIT,
            recent_product_turns: 3,
            llm_normalization: true,
            token_limits: TokenLimits::default(),
        }
    }
}

/// Which collaborators are wired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaboratorStatus {
    pub graph: bool,
    pub search: bool,
    pub completion: bool,
    pub llm_normalization: bool,
}

/// Builder for [`Orchestrator`]. Every collaborator is optional; missing
/// ones are skipped at request time.
pub struct OrchestratorBuilder {
    catalog: Arc<Catalog>,
    conversations: Option<Arc<dyn ConversationStore>>,
    graph: Option<Arc<dyn KnowledgeSource>>,
    search: Option<Arc<dyn KnowledgeSource>>,
    completion: Option<Arc<dyn CompletionProvider>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn conversations(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.conversations = Some(store);
        self
    }

    pub fn graph(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.graph = Some(source);
        self
    }

    pub fn search(mut self, source: Arc<dyn KnowledgeSource>) -> Self {
        self.search = Some(source);
        self
    }

    pub fn completion(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(provider);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Orchestrator {
        let heuristic = HeuristicNormalizer::new(Arc::clone(&self.catalog));
        let mut normalizer = NormalizerChain::new();
        let llm_normalization = self.config.llm_normalization && self.completion.is_some();
        if let (true, Some(provider)) = (llm_normalization, &self.completion) {
            normalizer = normalizer.then(Arc::new(LlmNormalizer::new(
                Arc::clone(&self.catalog),
                Arc::clone(provider),
            )));
        }
        normalizer = normalizer.then(Arc::new(heuristic.clone()));

        let classifier = StructuredQueryClassifier::new(StructuredMetadata::derive(&self.catalog));
        let stores = StoreMatcher::new(self.catalog.stores().to_vec())
            .with_limits(self.config.max_distance_km, self.config.store_limit);
        let context = ContextWindowBuilder::new(
            system_prompt(self.catalog.owner()),
            self.config.token_limits,
        );

        Orchestrator {
            conversations: self.conversations.unwrap_or_else(|| {
                Arc::new(InMemoryConversationStore::new()) as Arc<dyn ConversationStore>
            }),
            catalog: self.catalog,
            classifier,
            graph: self.graph,
            search: self.search,
            completion: self.completion,
            normalizer,
            heuristic,
            stores,
            context,
            llm_normalization,
            recent_product_turns: self.config.recent_product_turns,
        }
    }
}

/// Answers chat requests over the catalog and knowledge sources.
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    classifier: StructuredQueryClassifier,
    conversations: Arc<dyn ConversationStore>,
    graph: Option<Arc<dyn KnowledgeSource>>,
    search: Option<Arc<dyn KnowledgeSource>>,
    completion: Option<Arc<dyn CompletionProvider>>,
    normalizer: NormalizerChain,
    heuristic: HeuristicNormalizer,
    stores: StoreMatcher,
    context: ContextWindowBuilder,
    llm_normalization: bool,
    recent_product_turns: usize,
}

impl Orchestrator {
    pub fn builder(catalog: Arc<Catalog>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            catalog,
            conversations: None,
            graph: None,
            search: None,
            completion: None,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn collaborators(&self) -> CollaboratorStatus {
        CollaboratorStatus {
            graph: self.graph.is_some(),
            search: self.search.is_some(),
            completion: self.completion.is_some(),
            llm_normalization: self.llm_normalization,
        }
    }

    /// Turns recorded for a session.
    pub fn history(&self, session_id: &str) -> Result<Vec<Turn>, RagError> {
        self.conversations.history(session_id)
    }

    /// Forget a session's turns.
    pub fn clear_session(&self, session_id: &str) -> Result<(), RagError> {
        self.conversations.clear(session_id)
    }

    /// Remove a session entirely.
    pub fn delete_session(&self, session_id: &str) -> Result<bool, RagError> {
        self.conversations.delete(session_id)
    }

    fn enter(&self, session_id: &str, stage: Stage) {
        log::debug!("[{}] {:?}", session_id, stage);
    }

    /// Handle one chat request.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, RagError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidInput("query must not be empty".to_string()));
        }
        let session_id = match request.session_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                validate_session_id(id)?;
                id.to_string()
            }
            _ => generate_session_id(),
        };

        self.enter(&session_id, Stage::Classify);
        if let Some(answer) = self.classifier.classify_and_answer(query) {
            self.enter(&session_id, Stage::Persist);
            self.persist(&session_id, query, &answer)?;
            self.enter(&session_id, Stage::Respond);
            return Ok(ChatResponse {
                answer,
                references: Vec::new(),
                session_id,
                source: AnswerSource::Structured,
                stores: None,
                purchase_link: None,
                product_info: None,
            });
        }

        self.enter(&session_id, Stage::ReferenceResolve);
        // Snapshot; no store lock is held across the awaits below.
        let history = self.conversations.history(&session_id)?;
        let retrieval_query = enhance_query(&history, query);

        let (documents, source) = self.retrieve(&session_id, &retrieval_query).await;
        let references = collect_references(&documents);

        self.enter(&session_id, Stage::ProductResolve);
        let location = request.location();
        let product = self.resolve_product(query, &history, location.is_some()).await;

        let mut stores = None;
        if let (Some(product), Some((lat, lon))) = (&product, location) {
            self.enter(&session_id, Stage::StoreEnrich);
            stores = self.nearby_stores(lat, lon, product);
        }
        let (purchase_link, product_info) = match product.as_deref() {
            Some(name) => self.purchase_link(name),
            None => (None, None),
        };

        self.enter(&session_id, Stage::Generate);
        let answer = if documents.is_empty() {
            NO_CONTEXT_APOLOGY.to_string()
        } else {
            self.generate(&documents, &history, query).await
        };

        self.enter(&session_id, Stage::Persist);
        self.persist(&session_id, query, &answer)?;

        self.enter(&session_id, Stage::Respond);
        Ok(ChatResponse {
            answer,
            references,
            session_id,
            source,
            stores,
            purchase_link,
            product_info,
        })
    }

    async fn retrieve(&self, session_id: &str, text: &str) -> (Vec<ContextDocument>, AnswerSource) {
        self.enter(session_id, Stage::GraphQuery);
        if let Some(docs) = self.query_source(self.graph.as_deref(), "graph", text).await {
            return (docs, AnswerSource::Graph);
        }

        self.enter(session_id, Stage::VectorQuery);
        if let Some(docs) = self.query_source(self.search.as_deref(), "search", text).await {
            return (docs, AnswerSource::Vector);
        }

        (Vec::new(), AnswerSource::None)
    }

    async fn query_source(
        &self,
        source: Option<&dyn KnowledgeSource>,
        label: &str,
        text: &str,
    ) -> Option<Vec<ContextDocument>> {
        let Some(source) = source else {
            log::debug!("No {} source configured", label);
            return None;
        };
        match RetrievalOutcome::fetch(source, text).await {
            RetrievalOutcome::Found(docs) => {
                log::debug!("{} returned {} documents", source.name(), docs.len());
                Some(docs)
            }
            RetrievalOutcome::Empty => {
                log::debug!("{} returned no documents", source.name());
                None
            }
            RetrievalOutcome::Failed(e) => {
                log::warn!("{} query failed: {}", source.name(), e);
                None
            }
        }
    }

    /// Product for enrichment: from the query itself, else the most recent
    /// mention in the last few turns, else (when a location was given) the
    /// most recent mention anywhere in the session.
    async fn resolve_product(
        &self,
        query: &str,
        history: &[Turn],
        enrichment_requested: bool,
    ) -> Option<String> {
        let from_query = self.normalizer.normalize(query).await;
        if from_query.is_some() {
            return from_query;
        }
        if !has_purchase_intent(query) {
            return None;
        }

        let recent = history.len().saturating_sub(self.recent_product_turns);
        let found = self.latest_mention(&history[recent..]);
        if found.is_some() || !enrichment_requested {
            return found;
        }
        self.latest_mention(&history[..recent])
    }

    fn latest_mention(&self, turns: &[Turn]) -> Option<String> {
        turns
            .iter()
            .rev()
            .find_map(|turn| self.heuristic.resolve(&turn.text))
    }

    fn nearby_stores(&self, lat: f64, lon: f64, product: &str) -> Option<Vec<NearbyStore>> {
        match self.stores.nearby(lat, lon, Some(product)) {
            Ok(stores) => Some(stores),
            Err(e) => {
                log::warn!("Store lookup skipped: {}", e);
                None
            }
        }
    }

    fn purchase_link(&self, product: &str) -> (Option<String>, Option<ProductInfo>) {
        match self.catalog.purchase_link(product) {
            Some((link, info)) => (Some(link), Some(info)),
            None => (None, None),
        }
    }

    async fn generate(&self, documents: &[ContextDocument], history: &[Turn], query: &str) -> String {
        let Some(provider) = &self.completion else {
            log::warn!("No completion provider configured");
            return GENERATION_FAILURE_APOLOGY.to_string();
        };

        let prompt = self.context.assemble(documents, history, query);
        match provider.complete(&prompt.system, &prompt.messages).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                log::warn!("{} returned an empty completion", provider.name());
                GENERATION_FAILURE_APOLOGY.to_string()
            }
            Err(e) => {
                log::warn!("{} completion failed: {}", provider.name(), e);
                GENERATION_FAILURE_APOLOGY.to_string()
            }
        }
    }

    fn persist(&self, session_id: &str, query: &str, answer: &str) -> Result<(), RagError> {
        self.conversations.append_exchange(session_id, query, answer)
    }
}
