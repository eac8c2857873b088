//! # Config Command
//!
//! Manages the CLI configuration file.
//!
//! ## Usage
//!
//! ```bash
//! # Show current configuration
//! shelfwise config show
//!
//! # Configure the completion model
//! shelfwise config llm openai --model gpt-4
//! shelfwise config llm azure --endpoint https://my.openai.azure.com --deployment gpt-35
//!
//! # Configure the knowledge sources
//! shelfwise config graph --uri http://localhost:7474 --user neo4j
//! shelfwise config search --endpoint https://svc.search.windows.net --index products
//!
//! # Point at different catalog files
//! shelfwise config data --products ./catalog/products.json
//!
//! # Start over
//! shelfwise config reset
//! ```

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::{Config, GraphConfig, LlmConfig, SearchConfig, mask_secret};
use crate::errors::{display_info, display_success, display_warning};
use crate::exit_codes::*;

/// LLM provider types for configuration
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// OpenAI API
    OpenAI {
        model: String,
        api_key: Option<String>,
    },
    /// Azure OpenAI deployment
    Azure {
        endpoint: String,
        deployment: String,
        api_version: Option<String>,
        api_key: Option<String>,
    },
    /// Custom OpenAI-compatible endpoint
    Custom {
        endpoint: String,
        model: String,
        api_key: Option<String>,
    },
}

/// Arguments for the config show command
#[derive(Debug)]
pub struct ConfigShowArgs {
    /// Show full secrets (default: masked)
    pub show_secrets: bool,
}

/// Arguments for the config llm command
#[derive(Debug)]
pub enum ConfigLlmArgs {
    Set(LlmProvider),
    Remove,
}

/// Arguments for the config graph command
#[derive(Debug)]
pub enum ConfigGraphArgs {
    Set {
        uri: String,
        user: String,
        database: String,
        password_env: String,
    },
    Remove,
}

/// Arguments for the config search command
#[derive(Debug)]
pub enum ConfigSearchArgs {
    Set {
        endpoint: String,
        index: String,
        api_key: Option<String>,
        api_key_env: String,
    },
    Remove,
}

/// Arguments for the config data command
#[derive(Debug, Default)]
pub struct ConfigDataArgs {
    pub products: Option<PathBuf>,
    pub stores: Option<PathBuf>,
}

fn llm_config_for(provider: LlmProvider) -> LlmConfig {
    match provider {
        LlmProvider::OpenAI { model, api_key } => {
            let mut cfg = LlmConfig::openai(&model);
            cfg.api_key = api_key;
            cfg
        }
        LlmProvider::Azure {
            endpoint,
            deployment,
            api_version,
            api_key,
        } => {
            let mut cfg = LlmConfig::azure(&endpoint, &deployment);
            if api_version.is_some() {
                cfg.api_version = api_version;
            }
            cfg.api_key = api_key;
            cfg
        }
        LlmProvider::Custom {
            endpoint,
            model,
            api_key,
        } => {
            let mut cfg = LlmConfig::custom(&endpoint, &model);
            cfg.api_key = api_key;
            cfg
        }
    }
}

fn apply_graph(config: &mut Config, args: ConfigGraphArgs) {
    config.graph = match args {
        ConfigGraphArgs::Set {
            uri,
            user,
            database,
            password_env,
        } => Some(GraphConfig {
            uri,
            user,
            database,
            password: None,
            password_env: Some(password_env),
        }),
        ConfigGraphArgs::Remove => None,
    };
}

fn apply_search(config: &mut Config, args: ConfigSearchArgs) {
    config.search = match args {
        ConfigSearchArgs::Set {
            endpoint,
            index,
            api_key,
            api_key_env,
        } => {
            let mut search = SearchConfig::new(&endpoint, &index);
            search.api_key = api_key;
            search.api_key_env = Some(api_key_env);
            Some(search)
        }
        ConfigSearchArgs::Remove => None,
    };
}

fn apply_data(config: &mut Config, args: ConfigDataArgs) {
    if args.products.is_some() {
        config.data.products_path = args.products;
    }
    if args.stores.is_some() {
        config.data.stores_path = args.stores;
    }
}

fn secret_line(label: &str, env_var: Option<&str>, stored: Option<&str>, show_secrets: bool) {
    if let Some(env_var) = env_var {
        let status = if std::env::var(env_var).is_ok() {
            "✓ set".green().to_string()
        } else {
            "✗ not set".red().to_string()
        };
        println!("  {} {} ({})", format!("{} Env:", label).dimmed(), env_var, status);
    }
    if let Some(stored) = stored {
        let display = if show_secrets {
            stored.to_string()
        } else {
            mask_secret(stored)
        };
        println!("  {} {}", format!("{}:", label).dimmed(), display);
    }
}

/// Execute the config show command
pub fn execute_show(args: ConfigShowArgs) -> Result<i32> {
    let config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };

    println!();
    println!("{}", "shelfwise configuration".bold().underline());
    println!();

    println!("{}", "Completion".cyan().bold());
    match &config.llm {
        Some(llm) => {
            println!("  {} {}", "Provider:".dimmed(), llm.provider);
            println!("  {} {}", "Endpoint:".dimmed(), llm.endpoint);
            println!("  {} {}", "Model:".dimmed(), llm.model);
            if let Some(version) = &llm.api_version {
                println!("  {} {}", "API Version:".dimmed(), version);
            }
            secret_line(
                "API Key",
                llm.api_key_env.as_deref(),
                llm.api_key.as_deref(),
                args.show_secrets,
            );
        }
        None => println!("  {}", "Not configured".dimmed()),
    }
    println!();

    println!("{}", "Knowledge graph".cyan().bold());
    match &config.graph {
        Some(graph) => {
            println!("  {} {}", "URI:".dimmed(), graph.uri);
            println!("  {} {}", "User:".dimmed(), graph.user);
            println!("  {} {}", "Database:".dimmed(), graph.database);
            secret_line(
                "Password",
                graph.password_env.as_deref(),
                graph.password.as_deref(),
                args.show_secrets,
            );
        }
        None => println!("  {}", "Not configured".dimmed()),
    }
    println!();

    println!("{}", "Search index".cyan().bold());
    match &config.search {
        Some(search) => {
            println!("  {} {}", "Endpoint:".dimmed(), search.endpoint);
            println!("  {} {}", "Index:".dimmed(), search.index);
            secret_line(
                "API Key",
                search.api_key_env.as_deref(),
                search.api_key.as_deref(),
                args.show_secrets,
            );
        }
        None => println!("  {}", "Not configured".dimmed()),
    }
    println!();

    println!("{}", "Data".cyan().bold());
    println!("  {} {}", "Products:".dimmed(), config.data.products_path().display());
    println!("  {} {}", "Stores:".dimmed(), config.data.stores_path().display());
    println!();

    println!("{}", "Retrieval".cyan().bold());
    println!("  {} {} km", "Store radius:".dimmed(), config.retrieval.max_distance_km);
    println!("  {} {}", "Store limit:".dimmed(), config.retrieval.store_limit);
    println!(
        "  {} {}",
        "LLM normalization:".dimmed(),
        config.retrieval.llm_normalization
    );
    println!();

    Ok(EXIT_SUCCESS)
}

/// Execute the config llm command
pub fn execute_llm(args: ConfigLlmArgs) -> Result<i32> {
    let mut config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };

    match args {
        ConfigLlmArgs::Set(provider) => {
            let llm = llm_config_for(provider);
            if let Err(e) = llm.kind() {
                display_warning(&e.to_string());
                return Ok(EXIT_INVALID_INPUT);
            }
            let ready = llm.is_ready();
            let env_var = llm.api_key_env.clone();
            display_success(&format!("Completion set to {} {}", llm.provider, llm.model));
            config.llm = Some(llm);
            config.save()?;
            if !ready {
                display_warning(&format!(
                    "API key not found. Set the {} environment variable.",
                    env_var.as_deref().unwrap_or("API key")
                ));
            }
        }
        ConfigLlmArgs::Remove => {
            if config.llm.take().is_none() {
                display_info("Completion is not configured.");
                return Ok(EXIT_SUCCESS);
            }
            config.save()?;
            display_success("Completion configuration removed.");
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Execute the config graph command
pub fn execute_graph(args: ConfigGraphArgs) -> Result<i32> {
    let mut config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    apply_graph(&mut config, args);
    config.save()?;

    match &config.graph {
        Some(graph) if !graph.is_ready() => {
            display_success(&format!("Knowledge graph set to {}", graph.uri));
            display_warning(&format!(
                "Password not found. Set the {} environment variable.",
                graph.password_env.as_deref().unwrap_or("password")
            ));
        }
        Some(graph) => display_success(&format!("Knowledge graph set to {}", graph.uri)),
        None => display_success("Knowledge graph configuration removed."),
    }
    Ok(EXIT_SUCCESS)
}

/// Execute the config search command
pub fn execute_search(args: ConfigSearchArgs) -> Result<i32> {
    let mut config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    apply_search(&mut config, args);
    config.save()?;

    match &config.search {
        Some(search) => {
            display_success(&format!(
                "Search index set to {} ({})",
                search.endpoint, search.index
            ));
            if !search.is_ready() {
                display_warning("API key not found for the search index.");
            }
        }
        None => display_success("Search index configuration removed."),
    }
    Ok(EXIT_SUCCESS)
}

/// Execute the config data command
pub fn execute_data(args: ConfigDataArgs) -> Result<i32> {
    let mut config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    apply_data(&mut config, args);
    config.save()?;

    display_success(&format!(
        "Catalog files: {} and {}",
        config.data.products_path().display(),
        config.data.stores_path().display()
    ));
    Ok(EXIT_SUCCESS)
}

/// Execute the config reset command
pub fn execute_reset() -> Result<i32> {
    if !Config::exists() {
        display_info("No configuration file to remove.");
        return Ok(EXIT_SUCCESS);
    }
    Config::delete()?;
    display_success("Configuration removed; defaults will be used.");
    Ok(EXIT_SUCCESS)
}
