use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to character loading.
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("character '{0}' not found")]
    NotFound(String),

    #[error("invalid character file '{path}': {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("filesystem error: {0}")]
    FileSystemError(String),
}

/// Errors from speech synthesis back-ends.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech service '{0}' is disabled")]
    Disabled(String),

    #[error("speech back-end error: {0}")]
    Backend(String),

    #[error("speech entry '{0}' not found")]
    NotFound(String),

    #[error("speech request cancelled")]
    Cancelled,
}

/// Errors from the client transport.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("tunnel closed")]
    Closed,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors raised inside a session operation.
///
/// Everything except [`SessionError::Cancelled`] is reported to the client as
/// a non-fatal error notice.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("text generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("speech generation failed: {0}")]
    Speech(#[from] SpeechError),

    #[error("storage failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("transport failed: {0}")]
    Tunnel(#[from] TunnelError),

    #[error("character unavailable: {0}")]
    Character(#[from] CharacterError),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl SessionError {
    /// Whether this error is a preemption rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SessionError::Cancelled
                | SessionError::Generation(LlmError::Cancelled)
                | SessionError::Speech(SpeechError::Cancelled)
        )
    }

    /// Short human-readable summary used as the client-facing message.
    pub fn summary(&self) -> &'static str {
        match self {
            SessionError::Generation(_) => "Reply generation failed",
            SessionError::Speech(_) => "Speech generation failed",
            SessionError::Repository(_) => "Could not save the conversation",
            SessionError::Tunnel(_) => "Could not reach the client",
            SessionError::Character(_) => "Character could not be loaded",
            SessionError::InvalidMessage(_) => "Message rejected",
            SessionError::Cancelled => "Operation cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_session_error_from_llm() {
        let err: SessionError = LlmError::AuthenticationFailed.into();
        assert!(!err.is_cancelled());
        assert_eq!(err.summary(), "Reply generation failed");
        assert_eq!(
            err.to_string(),
            "text generation failed: authentication failed"
        );
    }

    #[test]
    fn test_cancellation_variants_are_detected() {
        assert!(SessionError::Cancelled.is_cancelled());
        assert!(SessionError::from(LlmError::Cancelled).is_cancelled());
        assert!(SessionError::from(SpeechError::Cancelled).is_cancelled());
        assert!(!SessionError::from(SpeechError::Backend("x".into())).is_cancelled());
    }

    #[test]
    fn test_character_error_display() {
        let err = CharacterError::NotFound("kate".to_string());
        assert_eq!(err.to_string(), "character 'kate' not found");
    }
}
