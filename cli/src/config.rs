//! # Configuration Management
//!
//! This module handles loading and saving CLI configuration: the completion
//! model, the knowledge graph, the search index, catalog data locations and
//! retrieval tunables.
//!
//! ## Configuration File Location
//!
//! `$XDG_CONFIG_HOME/shelfwise/config.json`, falling back to
//! `$HOME/.config/shelfwise/config.json`.
//!
//! A missing file is not an error. Every collaborator without credentials is
//! simply left out and the orchestrator runs degraded.
//!
//! ## Secrets
//!
//! Each collaborator section may name an environment variable (`*_env`)
//! holding its secret. The variable wins over a value stored in the file.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use shelfwise_rag::ChatProviderKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the directory of the default data files
pub const DATA_DIR_ENV_VAR: &str = "SHELFWISE_DATA_DIR";

/// Data directory used when nothing else is configured
const DEFAULT_DATA_DIR: &str = "data";

const PRODUCTS_FILE: &str = "products.json";
const STORES_FILE: &str = "stores.json";

/// Resolve a secret: the named environment variable first, then the stored value.
fn resolve_secret(env_var: Option<&str>, stored: Option<&str>) -> Option<String> {
    if let Some(var) = env_var {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
    }
    stored.map(str::to_string)
}

/// Mask a secret for display
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

/// Completion model configuration
///
/// # Supported Providers
///
/// - `openai`: OpenAI API
/// - `azure`: Azure OpenAI deployment (`model` is the deployment name)
/// - `custom`: Custom OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider (openai, azure, custom)
    pub provider: String,
    /// API endpoint URL
    pub endpoint: String,
    /// Model name, or deployment name for Azure
    pub model: String,
    /// Azure REST API version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// API key (plaintext)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key (preferred over api_key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl LlmConfig {
    /// Create a new OpenAI configuration
    pub fn openai(model: &str) -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            model: model.to_string(),
            api_version: None,
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
        }
    }

    /// Create a new Azure OpenAI configuration
    pub fn azure(endpoint: &str, deployment: &str) -> Self {
        Self {
            provider: "azure".to_string(),
            endpoint: endpoint.to_string(),
            model: deployment.to_string(),
            api_version: Some(shelfwise_rag::generation::DEFAULT_AZURE_API_VERSION.to_string()),
            api_key: None,
            api_key_env: Some("AZURE_OPENAI_API_KEY".to_string()),
        }
    }

    /// Create a custom OpenAI-compatible configuration
    pub fn custom(endpoint: &str, model: &str) -> Self {
        Self {
            provider: "custom".to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_version: None,
            api_key: None,
            api_key_env: None,
        }
    }

    /// Wire flavour for the configured provider
    pub fn kind(&self) -> Result<ChatProviderKind> {
        match self.provider.as_str() {
            "openai" | "custom" => Ok(ChatProviderKind::OpenAi),
            "azure" => Ok(ChatProviderKind::Azure),
            other => bail!("Unknown LLM provider: {}", other),
        }
    }

    /// Get the API key from environment or config
    pub fn get_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key_env.as_deref(), self.api_key.as_deref())
    }

    pub fn is_ready(&self) -> bool {
        self.get_api_key().is_some()
    }
}

/// Neo4j knowledge graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// HTTP URI of the Neo4j server
    pub uri: String,
    pub user: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Environment variable name for the password (preferred over password)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            database: "neo4j".to_string(),
            password: None,
            password_env: Some("NEO4J_PASSWORD".to_string()),
        }
    }
}

impl GraphConfig {
    pub fn get_password(&self) -> Option<String> {
        resolve_secret(self.password_env.as_deref(), self.password.as_deref())
    }

    pub fn is_ready(&self) -> bool {
        self.get_password().is_some()
    }
}

/// Azure Cognitive Search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Service URL, e.g. `https://<service>.search.windows.net`
    pub endpoint: String,
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key (preferred over api_key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl SearchConfig {
    pub fn new(endpoint: &str, index: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            index: index.to_string(),
            api_key: None,
            api_key_env: Some("AZURE_SEARCH_KEY".to_string()),
        }
    }

    pub fn get_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key_env.as_deref(), self.api_key.as_deref())
    }

    pub fn is_ready(&self) -> bool {
        self.get_api_key().is_some()
    }
}

/// Locations of the catalog files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stores_path: Option<PathBuf>,
}

impl DataConfig {
    /// Directory holding the default data files
    ///
    /// `SHELFWISE_DATA_DIR` takes precedence over `./data`.
    pub fn data_dir() -> PathBuf {
        std::env::var(DATA_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn products_path(&self) -> PathBuf {
        self.products_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join(PRODUCTS_FILE))
    }

    pub fn stores_path(&self) -> PathBuf {
        self.stores_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join(STORES_FILE))
    }
}

/// Retrieval and enrichment tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearby store radius in km
    pub max_distance_km: f64,
    /// Maximum nearby stores returned
    pub store_limit: usize,
    /// Ask the completion model to identify products before the fuzzy matcher
    pub llm_normalization: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_distance_km: shelfwise_rag::geo::DEFAULT_MAX_DISTANCE_KM,
            store_limit: shelfwise_rag::geo::DEFAULT_STORE_LIMIT,
            llm_normalization: true,
        }
    }
}

/// CLI configuration
///
/// Every collaborator section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns the defaults when no file exists yet.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to a specific file
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Check if a configuration file exists
    pub fn exists() -> bool {
        config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Delete the configuration file
    pub fn delete() -> Result<()> {
        let path = config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete config file: {}", path.display()))?;
        }
        Ok(())
    }
}

/// Get the path to the configuration file
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs_config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("shelfwise").join("config.json"))
}

/// Get the config directory
///
/// Uses `$XDG_CONFIG_HOME`, then `$HOME/.config` on all platforms.
fn dirs_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .or_else(|| std::env::var("USERPROFILE").ok())
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_has_no_collaborators() {
        let config = Config::default();
        assert!(config.llm.is_none());
        assert!(config.graph.is_none());
        assert!(config.search.is_none());
        assert_eq!(config.retrieval.max_distance_km, 20.0);
        assert_eq!(config.retrieval.store_limit, 3);
        assert!(config.retrieval.llm_normalization);
    }

    #[test]
    fn test_partial_config_deserialization() {
        let json = r#"{"retrieval": {"store_limit": 5}, "search": {"endpoint": "https://s", "index": "products"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.retrieval.store_limit, 5);
        assert_eq!(config.retrieval.max_distance_km, 20.0);
        assert_eq!(config.search.unwrap().index, "products");
        assert!(config.data.products_path.is_none());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shelfwise").join("config.json");

        let config = Config {
            llm: Some(LlmConfig::azure("https://example.openai.azure.com", "gpt-35")),
            graph: Some(GraphConfig::default()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_secret_takes_precedence() {
        let mut llm = LlmConfig::openai("gpt-4");
        llm.api_key = Some("stored-key".to_string());
        llm.api_key_env = Some("SHELFWISE_TEST_LLM_KEY".to_string());

        // SAFETY: no other test reads or writes this variable
        unsafe { env::set_var("SHELFWISE_TEST_LLM_KEY", "env-key") };
        assert_eq!(llm.get_api_key().as_deref(), Some("env-key"));

        // SAFETY: no other test reads or writes this variable
        unsafe { env::remove_var("SHELFWISE_TEST_LLM_KEY") };
        assert_eq!(llm.get_api_key().as_deref(), Some("stored-key"));
    }

    #[test]
    fn test_graph_without_password_is_not_ready() {
        let graph = GraphConfig {
            password_env: Some("SHELFWISE_TEST_UNSET_PASSWORD".to_string()),
            ..GraphConfig::default()
        };
        assert!(!graph.is_ready());
    }

    #[test]
    fn test_provider_kinds() {
        assert_eq!(LlmConfig::openai("gpt-4").kind().unwrap(), ChatProviderKind::OpenAi);
        assert_eq!(
            LlmConfig::custom("http://localhost:8080/v1", "m").kind().unwrap(),
            ChatProviderKind::OpenAi
        );
        assert_eq!(
            LlmConfig::azure("https://x", "dep").kind().unwrap(),
            ChatProviderKind::Azure
        );
        let mut unknown = LlmConfig::openai("gpt-4");
        unknown.provider = "carrier-pigeon".to_string();
        assert!(unknown.kind().is_err());
    }

    #[test]
    fn test_explicit_data_paths_win() {
        let data = DataConfig {
            products_path: Some(PathBuf::from("/srv/catalog/products.json")),
            stores_path: None,
        };
        assert_eq!(data.products_path(), PathBuf::from("/srv/catalog/products.json"));
        assert!(data.stores_path().ends_with("stores.json"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-1...abcd");
    }
}
