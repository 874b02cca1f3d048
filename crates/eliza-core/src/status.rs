use std::fmt;

use crate::ai::Backend;
use crate::config::BackendConfig;
use crate::error::ChatError;

/// Result of the last connectivity check against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendStatus {
    #[default]
    Checking,
    Connected { models: Vec<String> },
    /// The server answered with a non-success status
    NotResponding,
    /// The server could not be reached at all
    Disconnected,
}

impl BackendStatus {
    pub fn from_listing(result: Result<Vec<String>, ChatError>) -> Self {
        match result {
            Ok(models) => BackendStatus::Connected { models },
            Err(ChatError::ServerError { .. }) => BackendStatus::NotResponding,
            Err(_) => BackendStatus::Disconnected,
        }
    }

    pub fn models(&self) -> &[String] {
        match self {
            BackendStatus::Connected { models } => models,
            _ => &[],
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, BackendStatus::Connected { .. })
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Checking => write!(f, "Checking..."),
            BackendStatus::Connected { models } => {
                write!(f, "✅ Connected - {} models found", models.len())
            }
            BackendStatus::NotResponding => write!(f, "❌ Ollama not responding"),
            BackendStatus::Disconnected => write!(f, "❌ Cannot connect to Ollama"),
        }
    }
}

/// Ask the backend for its models and summarise the outcome.
pub async fn check_backend(backend: &dyn Backend, config: &BackendConfig) -> BackendStatus {
    let status = BackendStatus::from_listing(backend.list_models(config).await);
    tracing::info!(endpoint = %config.endpoint_url, status = %status, "backend check");
    status
}
