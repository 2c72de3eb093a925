// src/llm/mod.rs

pub mod provider;

pub use provider::{create_llm_provider, LLMConfig, LLMError, LLMProvider, OllamaProvider, OpenAIProvider};
