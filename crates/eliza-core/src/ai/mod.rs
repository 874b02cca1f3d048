pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::Result;

/// A text-generation server the session can talk to.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Complete `prompt` in one non-streamed request. Returns the trimmed reply.
    async fn generate(&self, prompt: &str, config: &BackendConfig) -> Result<String>;

    /// Names of the models the server has available.
    async fn list_models(&self, config: &BackendConfig) -> Result<Vec<String>>;
}
