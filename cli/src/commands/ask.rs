//! # Ask Command
//!
//! Implements the ask command: one question, one answer.
//!
//! ## Usage
//!
//! ```bash
//! # Ask a question about the catalog
//! shelfwise ask "Is KitKat gluten free?"
//!
//! # Find where to buy something nearby
//! shelfwise ask "Where can I buy Aero?" --lat 43.65 --lon -79.38
//!
//! # Get JSON output
//! shelfwise ask "How many coffee products are there?" --json
//! ```

use anyhow::Result;
use colored::Colorize;
use termimad::MadSkin;

use shelfwise_rag::{AnswerSource, ChatRequest, ChatResponse};

use crate::errors::report_rag_error;
use crate::exit_codes::*;

/// Arguments for the ask command
#[derive(Debug, Clone)]
pub struct AskArgs {
    /// The question
    pub query: String,
    /// Session id to record the turn under
    pub session_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Output as JSON
    pub json: bool,
    pub verbose: bool,
}

/// Execute the ask command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Answered (possibly with an apology)
/// * `Ok(EXIT_CONFIG_ERROR)` - Configuration file could not be read
/// * `Ok(EXIT_DATA_ERROR)` - Catalog files could not be loaded
/// * `Ok(EXIT_INVALID_INPUT)` - Bad session id, coordinates or empty query
pub async fn execute(args: AskArgs) -> Result<i32> {
    let location = match super::coordinates(args.latitude, args.longitude) {
        Ok(location) => location,
        Err(code) => return Ok(code),
    };
    let runtime = match super::load_runtime(args.verbose) {
        Ok(runtime) => runtime,
        Err(code) => return Ok(code),
    };

    let mut request = ChatRequest::new(args.query);
    if let Some(session_id) = args.session_id {
        request = request.with_session(session_id);
    }
    if let Some((lat, lon)) = location {
        request = request.with_location(lat, lon);
    }

    match runtime.orchestrator.handle(request).await {
        Ok(response) => {
            if args.json {
                output_json(&response)?;
            } else {
                render_response(&response, args.verbose);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => Ok(report_rag_error(&e)),
    }
}

/// Output response as JSON
fn output_json(response: &ChatResponse) -> Result<()> {
    let json = serde_json::to_string_pretty(response)?;
    println!("{}", json);
    Ok(())
}

/// Maximum width for markdown rendering
const MARKDOWN_MAX_WIDTH: usize = 80;

/// Create a styled skin for terminal markdown rendering
fn create_markdown_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Cyan);
    skin.bold.set_fg(termimad::crossterm::style::Color::White);
    skin.italic
        .set_fg(termimad::crossterm::style::Color::Yellow);
    skin
}

/// Render markdown text with a maximum width
pub(crate) fn render_markdown(text: &str) {
    let skin = create_markdown_skin();
    let fmt_text = termimad::FmtText::from(&skin, text, Some(MARKDOWN_MAX_WIDTH));
    print!("{}", fmt_text);
}

fn source_label(source: AnswerSource) -> &'static str {
    match source {
        AnswerSource::Structured => "catalog",
        AnswerSource::Graph => "knowledge graph",
        AnswerSource::Vector => "search index",
        AnswerSource::None => "no context",
    }
}

/// Print an answer with its product, store and source details
pub(crate) fn render_response(response: &ChatResponse, verbose: bool) {
    println!();
    render_markdown(&response.answer);
    println!();

    if let Some(info) = &response.product_info {
        println!(
            "{} {} {}",
            "Buy online:".green().bold(),
            info.name.bold(),
            info.purchase_link.cyan()
        );
    }

    if let Some(stores) = &response.stores {
        if stores.is_empty() {
            println!("{}", "No nearby stores carry this product.".dimmed());
        } else {
            println!("{}", "Nearby stores".bold().underline());
            for (i, nearby) in stores.iter().enumerate() {
                let address = nearby.store.address.as_deref().unwrap_or("");
                println!(
                    "  {}. {} {} {}",
                    i + 1,
                    nearby.store.name.bold(),
                    format!("({:.2} km)", nearby.distance_km).yellow(),
                    address.dimmed()
                );
            }
        }
        println!();
    }

    if !response.references.is_empty() {
        println!("{}", "Sources".bold().underline());
        for reference in &response.references {
            println!("  • {} {}", reference.title, reference.url.cyan());
        }
        println!();
    }

    if verbose {
        println!(
            "{} {} {} {}",
            "Answered from:".dimmed(),
            source_label(response.source).dimmed(),
            "Session:".dimmed(),
            response.session_id.dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwise_rag::Reference;

    fn response() -> ChatResponse {
        ChatResponse {
            answer: "KitKat is a **wafer** bar.".to_string(),
            references: vec![Reference {
                title: "KitKat".to_string(),
                url: "https://example.com/kitkat".to_string(),
            }],
            session_id: "session_1".to_string(),
            source: AnswerSource::Graph,
            stores: Some(Vec::new()),
            purchase_link: None,
            product_info: None,
        }
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(source_label(AnswerSource::Structured), "catalog");
        assert_eq!(source_label(AnswerSource::None), "no context");
    }

    #[test]
    fn test_render_response_does_not_panic() {
        render_response(&response(), true);
    }

    #[test]
    fn test_json_output_omits_missing_enrichment() {
        let value = serde_json::to_value(response()).unwrap();
        assert_eq!(value["source"], "graph");
        assert!(value.get("purchase_link").is_none());
        assert_eq!(value["stores"], serde_json::json!([]));
    }
}
