//! # CLI Command Implementations
//!
//! Each submodule implements one top-level command.
//!
//! ## Available Commands
//!
//! - [`ask`] - Ask one question about the catalog
//! - [`chat`] - Multi-turn conversation on stdin
//! - [`stores`] - Find stores carrying a product
//! - [`classify`] - Answer count and list questions from catalog metadata
//! - [`status`] - Report which collaborators are configured
//! - [`config`] - Manage CLI configuration

pub mod ask;
pub mod chat;
pub mod classify;
pub mod config;
pub mod status;
pub mod stores;

use crate::bootstrap::{Runtime, build_runtime, load_catalog};
use crate::config::Config;
use crate::errors::{display_config_error, display_data_error, display_validation_error, display_warning};
use crate::exit_codes::*;
use shelfwise_rag::Catalog;

/// Load the configuration, reporting failures as an exit code
pub(crate) fn load_config() -> Result<Config, i32> {
    Config::load().map_err(|e| {
        display_config_error(&format!("{:#}", e));
        EXIT_CONFIG_ERROR
    })
}

/// Load configuration and catalog only
pub(crate) fn load_catalog_only() -> Result<Catalog, i32> {
    let config = load_config()?;
    load_catalog(&config).map_err(|e| {
        display_data_error(&format!("{:#}", e));
        EXIT_DATA_ERROR
    })
}

/// Load configuration and wire the orchestrator
///
/// Degraded collaborators are listed when `verbose` is set.
pub(crate) fn load_runtime(verbose: bool) -> Result<Runtime, i32> {
    let config = load_config()?;
    let runtime = build_runtime(&config).map_err(|e| {
        display_data_error(&format!("{:#}", e));
        EXIT_DATA_ERROR
    })?;
    if verbose {
        for degraded in &runtime.degraded {
            display_warning(&format!("{}: {}", degraded.collaborator, degraded.reason));
        }
    }
    Ok(runtime)
}

/// Pair up optional coordinates; one without the other is an error
pub(crate) fn coordinates(lat: Option<f64>, lon: Option<f64>) -> Result<Option<(f64, f64)>, i32> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some((lat, lon))),
        (None, None) => Ok(None),
        _ => {
            display_validation_error("--lat and --lon must be given together");
            Err(EXIT_INVALID_INPUT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_pairing() {
        assert_eq!(coordinates(None, None), Ok(None));
        assert_eq!(coordinates(Some(43.6), Some(-79.3)), Ok(Some((43.6, -79.3))));
        assert_eq!(coordinates(Some(43.6), None), Err(EXIT_INVALID_INPUT));
    }
}
