use thiserror::Error;

/// Errors produced by the chat core.
///
/// Backend failures (`ConnectionFailure`, `Transport`, `ServerError`,
/// `InvalidResponse`) never escape a turn: the session turns them into a
/// bot-authored transcript message. `Validation`, `CharacterNotFound` and
/// `Busy` are returned to the caller so the UI can show a notice.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Can't connect to Ollama. Make sure it's running on {endpoint}")]
    ConnectionFailure { endpoint: String },

    #[error("Ollama error: {0}")]
    Transport(String),

    #[error("Ollama error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("Ollama error: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    #[error("A reply is already being generated")]
    Busy,
}

impl ChatError {
    /// True for failures that come from talking to the backend.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ChatError::ConnectionFailure { .. }
                | ChatError::Transport(_)
                | ChatError::ServerError { .. }
                | ChatError::InvalidResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failure_names_the_endpoint() {
        let err = ChatError::ConnectionFailure {
            endpoint: "http://localhost:11434".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Can't connect to Ollama. Make sure it's running on http://localhost:11434"
        );
        assert!(err.is_backend());
    }

    #[test]
    fn server_error_shows_status() {
        let err = ChatError::ServerError { status: 404 };
        assert_eq!(err.to_string(), "Ollama error: HTTP 404");
    }

    #[test]
    fn validation_is_not_a_backend_failure() {
        let err = ChatError::Validation("Please enter a character name".to_string());
        assert!(!err.is_backend());
        assert!(!ChatError::Busy.is_backend());
    }
}
