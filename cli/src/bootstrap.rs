//! # Bootstrap
//!
//! Builds the orchestrator and its collaborators from [`Config`]. Secrets are
//! resolved once here. A collaborator that cannot be built is left out and
//! reported, so the CLI always starts in whatever degraded mode the
//! configuration allows.

use anyhow::{Context, Result};
use std::sync::Arc;

use shelfwise_rag::{
    AzureSearchSource, Catalog, ChatCompletionProvider, CompletionProvider, KnowledgeSource,
    Neo4jGraphSource, Orchestrator, OrchestratorConfig, RetryPolicy, RetryingProvider,
};

use crate::config::{Config, GraphConfig, LlmConfig, SearchConfig};

/// A collaborator left out at startup, and why
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded {
    pub collaborator: &'static str,
    pub reason: String,
}

/// The wired orchestrator plus what was left out
pub struct Runtime {
    pub orchestrator: Orchestrator,
    pub degraded: Vec<Degraded>,
}

/// Load the catalog files named by the configuration
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    let products = config.data.products_path();
    let stores = config.data.stores_path();
    Catalog::load(&products, &stores).with_context(|| {
        format!(
            "Failed to load catalog from {} and {}",
            products.display(),
            stores.display()
        )
    })
}

fn build_completion(llm: &LlmConfig) -> Result<Arc<dyn CompletionProvider>> {
    let provider = ChatCompletionProvider::new(
        llm.kind()?,
        llm.endpoint.clone(),
        llm.model.clone(),
        llm.get_api_key(),
        llm.api_version.clone(),
    )?;
    Ok(Arc::new(RetryingProvider::new(
        Arc::new(provider),
        RetryPolicy::default(),
    )))
}

/// Bare Neo4j client for the configured graph, without query generation
pub fn neo4j_source(graph: &GraphConfig) -> Result<Neo4jGraphSource> {
    Ok(Neo4jGraphSource::new(
        graph.uri.clone(),
        graph.user.clone(),
        graph.get_password(),
        graph.database.clone(),
    )?)
}

fn build_graph(
    graph: &GraphConfig,
    catalog: &Arc<Catalog>,
    completion: Option<&Arc<dyn CompletionProvider>>,
) -> Result<Arc<dyn KnowledgeSource>> {
    let mut source = neo4j_source(graph)?.with_catalog(Arc::clone(catalog));
    if let Some(provider) = completion {
        source = source.with_query_generator(Arc::clone(provider));
    }
    Ok(Arc::new(source))
}

fn build_search(search: &SearchConfig) -> Result<Arc<dyn KnowledgeSource>> {
    let source = AzureSearchSource::new(
        search.endpoint.clone(),
        search.index.clone(),
        search.get_api_key(),
    )?;
    Ok(Arc::new(source))
}

/// Wire the orchestrator from configuration
///
/// Only a catalog that cannot be loaded is fatal.
pub fn build_runtime(config: &Config) -> Result<Runtime> {
    let catalog = Arc::new(load_catalog(config)?);
    let mut degraded = Vec::new();
    let mut note = |collaborator: &'static str, reason: String| {
        log::warn!("{} unavailable: {}", collaborator, reason);
        degraded.push(Degraded {
            collaborator,
            reason,
        });
    };

    let completion = match &config.llm {
        Some(llm) => match build_completion(llm) {
            Ok(provider) => Some(provider),
            Err(e) => {
                note("completion", e.to_string());
                None
            }
        },
        None => {
            note("completion", "not configured".to_string());
            None
        }
    };

    let graph = match &config.graph {
        Some(graph) => match build_graph(graph, &catalog, completion.as_ref()) {
            Ok(source) => Some(source),
            Err(e) => {
                note("graph", e.to_string());
                None
            }
        },
        None => {
            note("graph", "not configured".to_string());
            None
        }
    };

    let search = match &config.search {
        Some(search) => match build_search(search) {
            Ok(source) => Some(source),
            Err(e) => {
                note("search", e.to_string());
                None
            }
        },
        None => {
            note("search", "not configured".to_string());
            None
        }
    };

    let mut builder = Orchestrator::builder(catalog).config(OrchestratorConfig {
        max_distance_km: config.retrieval.max_distance_km,
        store_limit: config.retrieval.store_limit,
        llm_normalization: config.retrieval.llm_normalization,
        ..OrchestratorConfig::default()
    });
    if let Some(provider) = completion {
        builder = builder.completion(provider);
    }
    if let Some(source) = graph {
        builder = builder.graph(source);
    }
    if let Some(source) = search {
        builder = builder.search(source);
    }

    Ok(Runtime {
        orchestrator: builder.build(),
        degraded,
    })
}
