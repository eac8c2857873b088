//! # Classify Command
//!
//! Answers count and list questions straight from catalog metadata, with no
//! collaborators involved.
//!
//! ## Usage
//!
//! ```bash
//! shelfwise classify "How many coffee products are there?"
//! ```

use anyhow::Result;
use colored::Colorize;

use shelfwise_rag::{Catalog, StructuredMetadata, StructuredQueryClassifier};

use crate::errors::display_validation_error;
use crate::exit_codes::*;

/// Arguments for the classify command
#[derive(Debug, Clone)]
pub struct ClassifyArgs {
    pub query: String,
    pub json: bool,
}

fn classify(catalog: &Catalog, query: &str) -> Option<String> {
    StructuredQueryClassifier::new(StructuredMetadata::derive(catalog)).classify_and_answer(query)
}

/// Execute the classify command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - The question was answered from metadata
/// * `Ok(EXIT_INVALID_INPUT)` - Not a count or list question
pub fn execute(args: ClassifyArgs) -> Result<i32> {
    let catalog = match super::load_catalog_only() {
        Ok(catalog) => catalog,
        Err(code) => return Ok(code),
    };

    let answer = classify(&catalog, &args.query);
    if args.json {
        let output = serde_json::json!({
            "query": args.query,
            "structured": answer.is_some(),
            "answer": answer,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(if answer.is_some() {
            EXIT_SUCCESS
        } else {
            EXIT_INVALID_INPUT
        });
    }

    match answer {
        Some(answer) => {
            println!("{}", answer.bold());
            Ok(EXIT_SUCCESS)
        }
        None => {
            display_validation_error("not a count or list question about the catalog");
            Ok(EXIT_INVALID_INPUT)
        }
    }
}
