// src/config.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::llm::provider::{
    LLMConfig, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENAI_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use crate::optimizer::similarity::DEFAULT_SIMILARITY_THRESHOLD;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("OPTIMIZER_MODE=llm with the openai provider requires OPENAI_API_KEY")]
    MissingApiKey,
}

/// How fresh optimizations are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSetting {
    /// Use a model when one is configured, heuristics otherwise
    Auto,
    Llm,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryBackend {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub mode: ModeSetting,
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub llm_timeout_secs: u64,
    pub history: HistoryBackend,
    pub similarity_threshold: f64,
}

fn parse_var<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: v,
        }),
        _ => Ok(default),
    }
}

impl ApiConfig {
    /// Load `.env` (unless NO_DOTENV=true) and read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let skip_dotenv = std::env::var("NO_DOTENV")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);
        if !skip_dotenv {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("BACKEND_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_var("BACKEND_PORT", get("BACKEND_PORT").or_else(|| get("PORT")), 5000u16)?;

        let mode = match get("OPTIMIZER_MODE").map(|v| v.to_lowercase()) {
            None => ModeSetting::Auto,
            Some(v) => match v.as_str() {
                "" | "auto" => ModeSetting::Auto,
                "llm" => ModeSetting::Llm,
                "heuristic" | "demo" => ModeSetting::Heuristic,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "OPTIMIZER_MODE".into(),
                        value: v,
                    })
                }
            },
        };

        let provider = match get("LLM_PROVIDER").map(|v| v.to_lowercase()) {
            None => ProviderKind::OpenAI,
            Some(v) => match v.as_str() {
                "" | "openai" => ProviderKind::OpenAI,
                "ollama" => ProviderKind::Ollama,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "LLM_PROVIDER".into(),
                        value: v,
                    })
                }
            },
        };

        let history = match get("HISTORY_PATH") {
            Some(p) if p.eq_ignore_ascii_case("memory") => HistoryBackend::Memory,
            Some(p) if !p.trim().is_empty() => HistoryBackend::File(PathBuf::from(p)),
            _ => HistoryBackend::File(Self::default_history_path()),
        };

        let similarity_threshold = parse_var(
            "SIMILARITY_THRESHOLD",
            get("SIMILARITY_THRESHOLD"),
            DEFAULT_SIMILARITY_THRESHOLD,
        )?;
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "SIMILARITY_THRESHOLD".into(),
                value: similarity_threshold.to_string(),
            });
        }

        let config = Self {
            host,
            port,
            mode,
            provider,
            openai_api_key: get("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            temperature: parse_var("LLM_TEMPERATURE", get("LLM_TEMPERATURE"), DEFAULT_TEMPERATURE)?,
            llm_timeout_secs: parse_var("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), DEFAULT_TIMEOUT_SECS)?,
            history,
            similarity_threshold,
        };

        // Fail at startup rather than on the first request
        config.llm_config()?;
        Ok(config)
    }

    /// ~/.sqltune/history.json
    pub fn default_history_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".sqltune")
            .join("history.json")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Model settings for the resolved mode; `None` means heuristic mode
    pub fn llm_config(&self) -> Result<Option<LLMConfig>, ConfigError> {
        let wants_llm = match self.mode {
            ModeSetting::Heuristic => return Ok(None),
            ModeSetting::Llm => true,
            ModeSetting::Auto => match self.provider {
                ProviderKind::OpenAI => self.openai_api_key.is_some(),
                ProviderKind::Ollama => true,
            },
        };
        if !wants_llm {
            return Ok(None);
        }

        match self.provider {
            ProviderKind::OpenAI => {
                let api_key = self.openai_api_key.clone().ok_or(ConfigError::MissingApiKey)?;
                Ok(Some(LLMConfig::OpenAI {
                    api_key,
                    base_url: self.openai_base_url.clone(),
                    model: self.openai_model.clone(),
                    temperature: self.temperature,
                    timeout_secs: self.llm_timeout_secs,
                }))
            }
            ProviderKind::Ollama => Ok(Some(LLMConfig::Ollama {
                ollama_url: self.ollama_url.clone(),
                model: self.ollama_model.clone(),
                temperature: self.temperature,
                timeout_secs: self.llm_timeout_secs,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_are_heuristic_without_key() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert_eq!(config.mode, ModeSetting::Auto);
        assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(config.llm_config().unwrap(), None);
        assert!(matches!(config.history, HistoryBackend::File(_)));
    }

    #[test]
    fn test_auto_mode_uses_openai_with_key() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test"), ("PORT", "8080")]).unwrap();
        assert_eq!(config.port, 8080);
        match config.llm_config().unwrap() {
            Some(LLMConfig::OpenAI { model, temperature, .. }) => {
                assert_eq!(model, "gpt-4o");
                assert_eq!(temperature, DEFAULT_TEMPERATURE);
            }
            other => panic!("expected OpenAI config, got {:?}", other),
        }
    }

    #[test]
    fn test_llm_mode_without_key_fails() {
        let err = config_from(&[("OPTIMIZER_MODE", "llm")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
    }

    #[test]
    fn test_heuristic_mode_ignores_key() {
        let config = config_from(&[("OPTIMIZER_MODE", "heuristic"), ("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.llm_config().unwrap(), None);
    }

    #[test]
    fn test_ollama_provider() {
        let config = config_from(&[("LLM_PROVIDER", "ollama"), ("OLLAMA_MODEL", "qwen2")]).unwrap();
        assert!(matches!(
            config.llm_config().unwrap(),
            Some(LLMConfig::Ollama { ref model, .. }) if model == "qwen2"
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("BACKEND_PORT", "http")]).is_err());
        assert!(config_from(&[("SIMILARITY_THRESHOLD", "1.5")]).is_err());
        assert!(config_from(&[("OPTIMIZER_MODE", "turbo")]).is_err());
    }

    #[test]
    fn test_memory_history_backend() {
        let config = config_from(&[("HISTORY_PATH", "memory")]).unwrap();
        assert_eq!(config.history, HistoryBackend::Memory);
    }
}
