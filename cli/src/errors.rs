//! # Error Handling
//!
//! User-friendly error display for the shelfwise CLI, and the mapping from
//! library errors to exit codes.

use colored::Colorize;
use shelfwise_rag::RagError;

use crate::exit_codes::*;

/// Display a configuration error with helpful suggestions
pub fn display_config_error(message: &str) {
    eprintln!("{} Configuration error: {}", "✗".red().bold(), message);
    eprintln!();
    eprintln!("{}", "Possible causes:".yellow());
    eprintln!("  • Configuration file is corrupted");
    eprintln!("  • A section has the wrong shape");
    eprintln!();
    eprintln!(
        "{} Run `shelfwise config show` or `shelfwise config reset`.",
        "Tip:".cyan().bold()
    );
}

/// Display a catalog loading error with helpful suggestions
pub fn display_data_error(message: &str) {
    eprintln!("{} Catalog error: {}", "✗".red().bold(), message);
    eprintln!();
    eprintln!("{}", "Possible causes:".yellow());
    eprintln!("  • products.json or stores.json is missing");
    eprintln!("  • Two products normalize to the same name");
    eprintln!();
    eprintln!(
        "{} Set SHELFWISE_DATA_DIR or run `shelfwise config data`.",
        "Tip:".cyan().bold()
    );
}

/// Display a network error with helpful suggestions
pub fn display_network_error(message: &str) {
    eprintln!("{} Network error: {}", "✗".red().bold(), message);
    eprintln!();
    eprintln!(
        "{} Check your connection and the configured endpoints.",
        "Tip:".cyan().bold()
    );
}

/// Display a service unavailable error with helpful suggestions
pub fn display_service_error(message: &str) {
    eprintln!("{} Service unavailable: {}", "✗".red().bold(), message);
    eprintln!();
    eprintln!(
        "{} Run `shelfwise status` to see which collaborators are configured.",
        "Tip:".cyan().bold()
    );
}

/// Display a validation error with helpful suggestions
pub fn display_validation_error(message: &str) {
    eprintln!("{} Invalid request: {}", "✗".red().bold(), message);
    eprintln!();
    eprintln!(
        "{} Check the command options and try again.",
        "Tip:".cyan().bold()
    );
}

/// Display a session error
pub fn display_session_error(message: &str) {
    eprintln!("{} Session error: {}", "✗".red().bold(), message);
}

/// Display a generic error
pub fn display_error(message: &str) {
    eprintln!("{} Error: {}", "✗".red().bold(), message);
}

/// Display a warning
pub fn display_warning(message: &str) {
    eprintln!("{} Warning: {}", "⚠".yellow().bold(), message);
}

/// Display a success message
pub fn display_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Display an info message
pub fn display_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Exit code for a library error
pub fn exit_code_for(error: &RagError) -> i32 {
    match error {
        RagError::InvalidInput(_) => EXIT_INVALID_INPUT,
        RagError::CollaboratorUnavailable { .. } => EXIT_SERVICE_UNAVAILABLE,
        RagError::Http(_) | RagError::Collaborator { .. } => EXIT_NETWORK_ERROR,
        RagError::Catalog(_) => EXIT_DATA_ERROR,
        RagError::ConversationState(_) => EXIT_SESSION_ERROR,
        RagError::Serialization(_) => EXIT_ERROR,
    }
}

/// Display a library error and return the matching exit code
pub fn report_rag_error(error: &RagError) -> i32 {
    let message = error.to_string();
    match error {
        RagError::InvalidInput(_) => display_validation_error(&message),
        RagError::CollaboratorUnavailable { .. } => display_service_error(&message),
        RagError::Http(_) | RagError::Collaborator { .. } => display_network_error(&message),
        RagError::Catalog(_) => display_data_error(&message),
        RagError::ConversationState(_) => display_session_error(&message),
        RagError::Serialization(_) => display_error(&message),
    }
    exit_code_for(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(
            exit_code_for(&RagError::InvalidInput("bad id".into())),
            EXIT_INVALID_INPUT
        );
        assert_eq!(
            exit_code_for(&RagError::CollaboratorUnavailable {
                collaborator: "graph",
                message: "no URI configured".into()
            }),
            EXIT_SERVICE_UNAVAILABLE
        );
        assert_eq!(
            exit_code_for(&RagError::collaborator("search", "503")),
            EXIT_NETWORK_ERROR
        );
        assert_eq!(
            exit_code_for(&RagError::Catalog("duplicate".into())),
            EXIT_DATA_ERROR
        );
    }

    #[test]
    fn test_display_functions_do_not_panic() {
        display_config_error("Config file not found");
        display_data_error("products.json missing");
        display_warning("search is not configured");
        display_success("Saved");
        display_info("Loading catalog");
        assert_eq!(
            report_rag_error(&RagError::ConversationState("lost".into())),
            EXIT_SESSION_ERROR
        );
    }
}
