//! Backend settings. Held in memory for the life of the session; startup
//! values come from defaults and command line flags.

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";
pub const DEFAULT_TEMPERATURE: f32 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 200;

pub const TEMPERATURE_RANGE: (f32, f32) = (0.1, 2.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (50, 500);

/// Where and how to reach the model server
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub endpoint_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_response_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_response_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl BackendConfig {
    pub fn set_endpoint(&mut self, url: &str) {
        self.endpoint_url = url.trim().trim_end_matches('/').to_string();
    }

    pub fn set_model(&mut self, model: &str) {
        self.model_name = model.trim().to_string();
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        let (lo, hi) = TEMPERATURE_RANGE;
        self.temperature = if temperature.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            temperature.clamp(lo, hi)
        };
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        let (lo, hi) = MAX_TOKENS_RANGE;
        self.max_response_tokens = max_tokens.clamp(lo, hi);
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint_url)
    }

    pub fn tags_url(&self) -> String {
        format!("{}/api/tags", self.endpoint_url)
    }
}
