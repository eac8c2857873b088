//! # shelfwise CLI Library
//!
//! Command-line front end for the shelfwise catalog assistant.
//!
//! ## Modules
//!
//! - [`bootstrap`] - Wires the orchestrator from configuration
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration management
//! - [`errors`] - Error display
//! - [`exit_codes`] - Standard exit codes

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exit_codes;

pub use config::Config;
