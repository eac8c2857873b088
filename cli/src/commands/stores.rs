//! # Stores Command
//!
//! Finds stores carrying a product, without going through the question
//! pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Closest stores carrying KitKat
//! shelfwise stores --lat 43.65 --lon -79.38 --product kitkat
//!
//! # Every store carrying KitKat, anywhere
//! shelfwise stores --product kitkat
//! ```

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;

use shelfwise_rag::{HeuristicNormalizer, NearbyStore, StoreMatcher};
use shelfwise_rag::types::StoreEntry;

use crate::bootstrap::load_catalog;
use crate::errors::{display_data_error, display_validation_error, report_rag_error};
use crate::exit_codes::*;

/// Arguments for the stores command
#[derive(Debug, Clone, Default)]
pub struct StoresArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Product name, resolved against the catalog when possible
    pub product: Option<String>,
    /// Override the configured search radius
    pub max_distance_km: Option<f64>,
    /// Override the configured result limit
    pub limit: Option<usize>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StoresOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    product: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nearby: Option<&'a [NearbyStore]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    carrying: Option<&'a [&'a StoreEntry]>,
}

/// Execute the stores command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Lookup completed (possibly with no stores)
/// * `Ok(EXIT_INVALID_INPUT)` - Neither coordinates nor a product, or bad coordinates
/// * `Ok(EXIT_DATA_ERROR)` - Catalog files could not be loaded
pub async fn execute(args: StoresArgs) -> Result<i32> {
    let location = match super::coordinates(args.latitude, args.longitude) {
        Ok(location) => location,
        Err(code) => return Ok(code),
    };
    if location.is_none() && args.product.is_none() {
        display_validation_error("give --lat/--lon, --product, or both");
        return Ok(EXIT_INVALID_INPUT);
    }

    let config = match super::load_config() {
        Ok(config) => config,
        Err(code) => return Ok(code),
    };
    let catalog = match load_catalog(&config) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            display_data_error(&format!("{:#}", e));
            return Ok(EXIT_DATA_ERROR);
        }
    };

    // Canonical name when the catalog knows the product, else the raw text
    let product = args.product.as_deref().map(|raw| {
        HeuristicNormalizer::new(Arc::clone(&catalog))
            .resolve(raw)
            .unwrap_or_else(|| raw.trim().to_string())
    });

    let matcher = StoreMatcher::new(catalog.stores().to_vec()).with_limits(
        args.max_distance_km.unwrap_or(config.retrieval.max_distance_km),
        args.limit.unwrap_or(config.retrieval.store_limit),
    );

    match location {
        Some((lat, lon)) => {
            let nearby = match matcher.nearby(lat, lon, product.as_deref()) {
                Ok(nearby) => nearby,
                Err(e) => return Ok(report_rag_error(&e)),
            };
            if args.json {
                print_json(&StoresOutput {
                    product: product.as_deref(),
                    nearby: Some(&nearby),
                    carrying: None,
                })?;
            } else {
                print_nearby(product.as_deref(), &nearby);
            }
        }
        None => {
            let name = product.as_deref().unwrap_or_default();
            let carrying = matcher.stores_carrying(name);
            if args.json {
                print_json(&StoresOutput {
                    product: Some(name),
                    nearby: None,
                    carrying: Some(&carrying),
                })?;
            } else {
                print_carrying(name, &carrying);
            }
        }
    }

    Ok(EXIT_SUCCESS)
}

fn print_json(output: &StoresOutput<'_>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

fn print_nearby(product: Option<&str>, nearby: &[NearbyStore]) {
    let what = product.unwrap_or("any product");
    if nearby.is_empty() {
        println!("{} No stores nearby carry {}", "✗".red().bold(), what.bold());
        return;
    }
    println!("{} {}", "Stores carrying".bold(), what.bold().cyan());
    for (i, entry) in nearby.iter().enumerate() {
        println!(
            "  {}. {} {} {}",
            i + 1,
            entry.store.name.bold(),
            format!("({:.2} km)", entry.distance_km).yellow(),
            entry.store.address.as_deref().unwrap_or("").dimmed()
        );
    }
}

fn print_carrying(product: &str, stores: &[&StoreEntry]) {
    if stores.is_empty() {
        println!("{} No stores carry {}", "✗".red().bold(), product.bold());
        return;
    }
    println!("{} {}", "Stores carrying".bold(), product.bold().cyan());
    for store in stores {
        println!(
            "  • {} {}",
            store.name.bold(),
            store.address.as_deref().unwrap_or("").dimmed()
        );
    }
}
