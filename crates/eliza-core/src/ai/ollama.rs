use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Backend;
use crate::config::BackendConfig;
use crate::error::{ChatError, Result};

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

/// Client for Ollama's `/api/generate` and `/api/tags` endpoints.
///
/// The endpoint comes from the `BackendConfig` passed to each call, so one
/// client survives settings changes.
#[derive(Clone, Default)]
pub struct OllamaClient {
    client: Client,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn map_transport_error(err: reqwest::Error, config: &BackendConfig) -> ChatError {
        if err.is_connect() {
            ChatError::ConnectionFailure {
                endpoint: config.endpoint_url.clone(),
            }
        } else if err.is_decode() {
            ChatError::InvalidResponse(err.to_string())
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Backend for OllamaClient {
    async fn generate(&self, prompt: &str, config: &BackendConfig) -> Result<String> {
        let url = config.generate_url();

        let request = OllamaRequest {
            model: &config.model_name,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: config.temperature,
                num_predict: config.max_response_tokens,
            },
        };

        debug!(%url, model = %config.model_name, prompt_len = prompt.len(), "sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, config))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(%url, status, "generate request failed");
            return Err(ChatError::ServerError { status });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| Self::map_transport_error(e, config))?;
        Ok(ollama_response.response.trim().to_string())
    }

    async fn list_models(&self, config: &BackendConfig) -> Result<Vec<String>> {
        let url = config.tags_url();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(e, config))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(%url, status, "model listing failed");
            return Err(ChatError::ServerError { status });
        }

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| Self::map_transport_error(e, config))?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        debug!(count = model_names.len(), "listed models");
        Ok(model_names)
    }
}
