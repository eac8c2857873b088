//! shelfwise-rag: conversational retrieval over a product catalog
//!
//! This crate answers shopper questions about one brand owner's catalog:
//! - Count and list questions answered directly from catalog metadata
//! - Follow-up questions ("is it gluten free?") resolved against the last answer
//! - Grounding context from a knowledge graph, then a search index
//! - Token-budgeted prompts for the completion model
//! - Product name normalization and nearby store lookup
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use shelfwise_rag::{Catalog, ChatRequest, Orchestrator};
//!
//! let catalog = Arc::new(Catalog::load(products, stores)?);
//! let orchestrator = Orchestrator::builder(catalog).build();
//! let response = orchestrator
//!     .handle(ChatRequest::new("Where can I buy KitKat?").with_location(43.65, -79.38))
//!     .await?;
//! ```

pub mod catalog;
pub mod context;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod geo;
pub mod normalizer;
pub mod orchestrator;
pub mod retrieval;
pub mod routing;
pub mod text;
pub mod types;

pub use catalog::{Catalog, StructuredMetadata};
pub use context::{ContextWindowBuilder, TokenLimits};
pub use conversation::{ConversationStore, InMemoryConversationStore};
pub use error::RagError;
pub use generation::{
    ChatCompletionProvider, ChatProviderKind, CompletionProvider, RetryPolicy, RetryingProvider,
};
pub use geo::StoreMatcher;
pub use normalizer::{HeuristicNormalizer, LlmNormalizer, NormalizerChain, ProductNormalizer};
pub use orchestrator::{CollaboratorStatus, Orchestrator, OrchestratorConfig};
pub use retrieval::{AzureSearchSource, KnowledgeSource, Neo4jGraphSource};
pub use routing::StructuredQueryClassifier;
pub use types::{AnswerSource, ChatRequest, ChatResponse, NearbyStore, ProductInfo, Reference, Turn};
