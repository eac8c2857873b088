use thiserror::Error;

/// Errors that can occur during retrieval and orchestration.
///
/// Empty retrievals and ambiguous product names are not errors: the first is
/// reported as [`crate::retrieval::RetrievalOutcome::Empty`], the second
/// resolves to "no product".
#[derive(Error, Debug)]
pub enum RagError {
    #[error("{collaborator} is unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} call failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Conversation state error: {0}")]
    ConversationState(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    /// Shorthand for a failed collaborator call.
    pub fn collaborator(collaborator: &'static str, message: impl Into<String>) -> Self {
        RagError::Collaborator {
            collaborator,
            message: message.into(),
        }
    }

    /// Check if this error means the collaborator was never usable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RagError::CollaboratorUnavailable { .. })
    }
}
