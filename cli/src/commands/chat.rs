//! # Chat Command
//!
//! Interactive multi-turn conversation. Every line read from stdin is one
//! question in the same session, so follow-ups like "is it gluten free?"
//! resolve against the previous answer.
//!
//! ## Usage
//!
//! ```bash
//! shelfwise chat --lat 43.65 --lon -79.38
//! ```
//!
//! Lines starting with `/` are commands: `/clear`, `/history`, `/exit`.

use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use shelfwise_rag::conversation::generate_session_id;
use shelfwise_rag::{ChatRequest, Orchestrator};

use super::ask::render_response;
use crate::errors::{display_error, display_info, report_rag_error};
use crate::exit_codes::*;

/// Arguments for the chat command
#[derive(Debug, Clone)]
pub struct ChatArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verbose: bool,
}

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq)]
enum Input<'a> {
    Question(&'a str),
    Clear,
    History,
    Exit,
    Unknown(&'a str),
    Blank,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Blank,
        "/clear" => Input::Clear,
        "/history" => Input::History,
        "/exit" | "/quit" => Input::Exit,
        _ if line.starts_with('/') => Input::Unknown(line),
        _ => Input::Question(line),
    }
}

fn print_history(orchestrator: &Orchestrator, session_id: &str) -> Result<(), i32> {
    let turns = orchestrator
        .history(session_id)
        .map_err(|e| report_rag_error(&e))?;
    if turns.is_empty() {
        println!("{}", "(no messages yet)".dimmed());
    }
    for turn in turns {
        println!(
            "{} {} {}",
            format!("[{}]", turn.index).dimmed(),
            turn.role.as_str().cyan(),
            turn.text
        );
    }
    Ok(())
}

/// Execute the chat command
///
/// Returns when stdin closes or `/exit` is typed.
pub async fn execute(args: ChatArgs) -> Result<i32> {
    let location = match super::coordinates(args.latitude, args.longitude) {
        Ok(location) => location,
        Err(code) => return Ok(code),
    };
    let runtime = match super::load_runtime(args.verbose) {
        Ok(runtime) => runtime,
        Err(code) => return Ok(code),
    };
    let orchestrator = runtime.orchestrator;
    let session_id = generate_session_id();

    display_info(&format!(
        "Chatting about {} products. /clear, /history, /exit",
        orchestrator.catalog().owner()
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_input(&line) {
            Input::Blank => continue,
            Input::Exit => break,
            Input::Clear => match orchestrator.clear_session(&session_id) {
                Ok(()) => display_info("Conversation cleared"),
                Err(e) => return Ok(report_rag_error(&e)),
            },
            Input::History => {
                if let Err(code) = print_history(&orchestrator, &session_id) {
                    return Ok(code);
                }
            }
            Input::Unknown(command) => display_error(&format!("Unknown command: {}", command)),
            Input::Question(query) => {
                let mut request = ChatRequest::new(query).with_session(session_id.as_str());
                if let Some((lat, lon)) = location {
                    request = request.with_location(lat, lon);
                }
                match orchestrator.handle(request).await {
                    Ok(response) => render_response(&response, args.verbose),
                    Err(e) => return Ok(report_rag_error(&e)),
                }
            }
        }
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), Input::Blank);
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input(" /history "), Input::History);
        assert_eq!(parse_input("/quit"), Input::Exit);
        assert_eq!(parse_input("/help"), Input::Unknown("/help"));
        assert_eq!(
            parse_input("Is it gluten free?"),
            Input::Question("Is it gluten free?")
        );
    }
}
