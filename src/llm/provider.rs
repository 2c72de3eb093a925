// src/llm/provider.rs
// LLM Provider abstraction - pluggable architecture
// Default: OpenAI chat completions; Ollama for local models

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::optimizer::prompt::SYSTEM_PROMPT;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// LLM Provider trait - implement this to support new models
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError>;
    fn model_name(&self) -> &str;

    /// Reachability probe used at startup
    async fn health_check(&self) -> Result<(), LLMError> {
        Ok(())
    }
}

/// Configuration for the supported providers
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum LLMConfig {
    /// OpenAI-compatible chat completions API (requires API key)
    OpenAI {
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        timeout_secs: u64,
    },
    /// Local model served by Ollama
    Ollama {
        ollama_url: String,
        model: String,
        temperature: f32,
        timeout_secs: u64,
    },
}

impl LLMConfig {
    pub fn model(&self) -> &str {
        match self {
            LLMConfig::OpenAI { model, .. } | LLMConfig::Ollama { model, .. } => model,
        }
    }
}

/// Error types for LLM operations
#[derive(Debug, Clone, Error)]
pub enum LLMError {
    #[error("LLM connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, LLMError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LLMError::ConfigError(format!("failed to build HTTP client: {}", e)))
}

// ============ OpenAI ============

pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, LLMError> {
        if api_key.trim().is_empty() {
            return Err(LLMError::ConfigError("OpenAI API key is empty".to_string()));
        }
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            client: build_client(timeout_secs)?,
        })
    }
}

#[async_trait::async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Generating with OpenAI");

        let url = format!("{}/chat/completions", self.base_url);
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| LLMError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(model = %self.model, %status, "OpenAI request rejected");
            return Err(LLMError::GenerationFailed(format!("HTTP {}: {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LLMError::InvalidResponse("response has no message content".to_string()))?;

        info!(model = %self.model, response_len = content.len(), "Generation complete");
        Ok(content.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============ Ollama ============

pub struct OllamaProvider {
    url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String, temperature: f32, timeout_secs: u64) -> Result<Self, LLMError> {
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            temperature,
            client: build_client(timeout_secs)?,
        })
    }
}

#[async_trait::async_trait]
impl LLMProvider for OllamaProvider {
    async fn health_check(&self) -> Result<(), LLMError> {
        let health_url = format!("{}/api/tags", self.url);
        self.client.get(&health_url).send().await.map_err(|e| {
            LLMError::ConnectionFailed(format!("Cannot reach Ollama at {}: {}", self.url, e))
        })?;
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Generating with Ollama");

        let url = format!("{}/api/generate", self.url);
        let req = OllamaRequest {
            model: &self.model,
            system: SYSTEM_PROMPT,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| LLMError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LLMError::GenerationFailed(format!("HTTP {}", status)));
        }

        let ollama_resp: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        info!(model = %self.model, response_len = ollama_resp.response.len(), "Generation complete");
        Ok(ollama_resp.response.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory function to create LLM provider from config
pub fn create_llm_provider(config: LLMConfig) -> Result<Box<dyn LLMProvider>, LLMError> {
    match config {
        LLMConfig::OpenAI {
            api_key,
            base_url,
            model,
            temperature,
            timeout_secs,
        } => {
            info!("Initializing OpenAI provider ({}) at {}", model, base_url);
            let provider = OpenAIProvider::new(api_key, base_url, model, temperature, timeout_secs)?;
            Ok(Box::new(provider))
        }
        LLMConfig::Ollama {
            ollama_url,
            model,
            temperature,
            timeout_secs,
        } => {
            info!("Initializing Ollama provider ({}) at {}", model, ollama_url);
            let provider = OllamaProvider::new(ollama_url, model, temperature, timeout_secs)?;
            Ok(Box::new(provider))
        }
    }
}
