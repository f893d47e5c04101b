//! Text generation backends.
//!
//! Supports:
//! - **Gemini**: `generateContent` REST API (default)
//! - **OpenAI**: any OpenAI-compatible `chat/completions` endpoint
//!
//! Both speak plain HTTP through `reqwest` and implement the `LlmProvider`
//! trait the intake wizard depends on.

pub mod gemini;
mod http;
pub mod openai;
pub mod provider;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, LlmError};

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAi,
}

impl LlmBackend {
    /// Environment variable holding this backend's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "PLANNER_LLM_BACKEND".to_string(),
                message: format!("unknown backend '{other}' (expected gemini or openai)"),
            }),
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Endpoint override (proxies, local gateways, tests).
    pub base_url: Option<String>,
    /// Upper bound for a single generation call.
    pub timeout: Duration,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Gemini => {
            tracing::info!("Using Gemini (model: {})", config.model);
            Arc::new(GeminiProvider::new(
                config.api_key.clone(),
                &config.model,
                config.base_url.clone(),
                config.timeout,
            )?)
        }
        LlmBackend::OpenAi => {
            tracing::info!("Using OpenAI (model: {})", config.model);
            Arc::new(OpenAiProvider::new(
                config.api_key.clone(),
                &config.model,
                config.base_url.clone(),
                config.timeout,
            )?)
        }
    };
    Ok(provider)
}
