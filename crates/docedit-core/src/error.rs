//! Error taxonomy for the edit pipeline.
//!
//! Every failure the pipeline can hit maps to exactly one [`EditError`]
//! variant. The orchestrator turns any of them into a single terminal
//! `error` event, except [`EditError::Cancelled`], which means nobody is
//! listening anymore.

use std::time::Duration;

/// Failure raised by any step of the edit pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The document id is unknown to the store.
    #[error("Document {0} not found")]
    NotFound(String),

    /// The intent response was absent, malformed, or named an unknown operation.
    #[error("Could not understand the request: {0}")]
    IntentParse(String),

    /// The generative capability failed.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// A model call did not answer within the configured bound.
    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: &'static str, after: Duration },

    /// The intent's line range does not resolve against the current document.
    #[error("Invalid line range: {0}")]
    InvalidRange(String),

    /// The store failed while reading a document.
    #[error("Document store error: {0}")]
    Store(String),

    /// The store rejected or failed the write.
    #[error("Failed to save document: {0}")]
    Commit(String),

    /// A pipeline step panicked.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The client went away; the request is abandoned without committing.
    #[error("request cancelled")]
    Cancelled,
}

impl EditError {
    /// Returns `true` when the request was abandoned by the client.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EditError::Cancelled)
    }

    /// Machine-readable error class.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::NotFound(_) => "not_found",
            EditError::IntentParse(_) => "intent_parse",
            EditError::Generation(_) | EditError::Timeout { .. } => "generation_failed",
            EditError::InvalidRange(_) => "invalid_range",
            EditError::Store(_) => "store_error",
            EditError::Commit(_) => "commit_failed",
            EditError::Internal(_) => "internal",
            EditError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_a_generation_failure() {
        let err = EditError::Timeout {
            phase: "Generation",
            after: Duration::from_secs(30),
        };
        assert_eq!(err.code(), "generation_failed");
        assert_eq!(err.to_string(), "Generation timed out after 30s");
    }

    #[test]
    fn timeout_names_phase_and_keeps_subsecond_bounds() {
        let err = EditError::Timeout {
            phase: "Intent extraction",
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Intent extraction timed out after 250ms");
    }

    #[test]
    fn only_cancelled_is_cancelled() {
        assert!(EditError::Cancelled.is_cancelled());
        assert!(!EditError::NotFound("x".into()).is_cancelled());
    }
}
