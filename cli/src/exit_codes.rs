//! # Exit Codes
//!
//! Standard exit codes for the shelfwise CLI.
//!
//! These codes follow common Unix conventions and give scripts something
//! meaningful to branch on.

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// General error (unspecified)
pub const EXIT_ERROR: i32 = 1;

/// Configuration error (unreadable or invalid config)
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Catalog or store data could not be loaded
pub const EXIT_DATA_ERROR: i32 = 3;

/// Network error (connection failed, timeout, etc.)
pub const EXIT_NETWORK_ERROR: i32 = 4;

/// Invalid input (bad arguments, malformed session id, not a structured question)
pub const EXIT_INVALID_INPUT: i32 = 6;

/// A required collaborator is not configured
pub const EXIT_SERVICE_UNAVAILABLE: i32 = 7;

/// Conversation state could not be read or written
pub const EXIT_SESSION_ERROR: i32 = 8;
