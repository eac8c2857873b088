//! # Status Command
//!
//! Reports which collaborators are configured, so it is clear which degraded
//! mode the orchestrator will run in.
//!
//! ## Usage
//!
//! ```bash
//! shelfwise status
//! ```

use anyhow::Result;
use colored::Colorize;

use crate::bootstrap::{load_catalog, neo4j_source};
use crate::config::{Config, config_path};
use crate::exit_codes::*;

/// State of one collaborator as far as configuration can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Ready,
    MissingSecret,
    NotConfigured,
}

fn print_readiness(name: &str, readiness: Readiness, detail: &str) {
    match readiness {
        Readiness::Ready => println!(
            "{} {}: {} {}",
            "✓".bright_green().bold(),
            name,
            "Configured".green(),
            detail.dimmed()
        ),
        Readiness::MissingSecret => println!(
            "{} {}: {} {}",
            "⚠".yellow().bold(),
            name,
            "Secret missing".yellow(),
            detail.dimmed()
        ),
        Readiness::NotConfigured => println!(
            "{} {}: {}",
            "✗".red().bold(),
            name,
            "Not configured".red()
        ),
    }
}

fn readiness(configured: bool, ready: bool) -> Readiness {
    match (configured, ready) {
        (false, _) => Readiness::NotConfigured,
        (true, false) => Readiness::MissingSecret,
        (true, true) => Readiness::Ready,
    }
}

/// Execute the status command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Catalog loads; collaborators may still be missing
/// * `Ok(EXIT_CONFIG_ERROR)` - Configuration file could not be read
/// * `Ok(EXIT_DATA_ERROR)` - Catalog files could not be loaded
pub async fn execute() -> Result<i32> {
    println!("{}", "shelfwise status".bold());
    println!("{}", "─".repeat(40).dimmed());
    println!();

    if let Ok(path) = config_path() {
        let state = if Config::exists() {
            "Found".green()
        } else {
            "Not found (using defaults)".yellow()
        };
        println!("{} Config: {} {}", "ℹ".blue(), state, path.display().to_string().dimmed());
    }
    let config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };

    let catalog = match load_catalog(&config) {
        Ok(catalog) => {
            println!(
                "{} Catalog: {} products from {}, {} stores",
                "✓".bright_green().bold(),
                catalog.entries().len(),
                catalog.owner().bold(),
                catalog.stores().len()
            );
            Some(catalog)
        }
        Err(e) => {
            println!("{} Catalog: {}", "✗".red().bold(), format!("{:#}", e).red());
            None
        }
    };
    println!();

    let llm = config.llm.as_ref();
    print_readiness(
        "Completion",
        readiness(llm.is_some(), llm.is_some_and(|l| l.is_ready())),
        &llm.map(|l| format!("{} {}", l.provider, l.model)).unwrap_or_default(),
    );

    let graph = config.graph.as_ref();
    print_readiness(
        "Knowledge graph",
        readiness(graph.is_some(), graph.is_some_and(|g| g.is_ready())),
        &graph.map(|g| g.uri.clone()).unwrap_or_default(),
    );
    if let Some(graph) = graph.filter(|g| g.is_ready()) {
        let reachable = match neo4j_source(graph) {
            Ok(source) => source.verify().await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match reachable {
            Ok(()) => println!("  {} {}", "→".cyan(), "Reachable".green()),
            Err(e) => println!("  {} {}", "→".cyan(), e.red()),
        }
    }

    let search = config.search.as_ref();
    print_readiness(
        "Search index",
        readiness(search.is_some(), search.is_some_and(|s| s.is_ready())),
        &search
            .map(|s| format!("{} ({})", s.endpoint, s.index))
            .unwrap_or_default(),
    );

    println!();
    if catalog.is_none() {
        return Ok(EXIT_DATA_ERROR);
    }
    let any_source = graph.is_some_and(|g| g.is_ready()) || search.is_some_and(|s| s.is_ready());
    if !any_source {
        println!(
            "{} Only count and list questions can be answered. Configure a source with `shelfwise config graph` or `shelfwise config search`.",
            "ℹ".blue()
        );
    }

    Ok(EXIT_SUCCESS)
}
