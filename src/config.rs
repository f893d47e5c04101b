//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::intake::WizardConfig;
use crate::llm::{LlmBackend, LlmConfig};

/// Process-wide planner configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub llm: LlmConfig,
    pub wizard: WizardConfig,
    /// Port for the HTTP surface; `None` disables it.
    pub http_port: Option<u16>,
    /// Whether to run the stdin REPL.
    pub cli_enabled: bool,
    /// Where the CLI writes finished plans.
    pub output_dir: PathBuf,
    /// Optional log file (in addition to stderr).
    pub log_file: Option<PathBuf>,
}

impl PlannerConfig {
    /// Load configuration from the process environment, after applying a
    /// `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend: LlmBackend = match get("PLANNER_LLM_BACKEND") {
            Some(raw) => raw.parse()?,
            None => LlmBackend::Gemini,
        };

        let key_var = backend.api_key_var();
        let api_key = get(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = get("PLANNER_MODEL").unwrap_or_else(|| backend.default_model().to_string());
        let timeout_secs: u64 = parse_or("PLANNER_LLM_TIMEOUT_SECS", get("PLANNER_LLM_TIMEOUT_SECS"), 120)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PLANNER_LLM_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let port: u16 = parse_or("PLANNER_HTTP_PORT", get("PLANNER_HTTP_PORT"), 8080)?;
        let cli_enabled = match get("PLANNER_CLI") {
            Some(raw) => parse_flag("PLANNER_CLI", &raw)?,
            None => true,
        };

        Ok(Self {
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
                base_url: get("PLANNER_LLM_BASE_URL"),
                timeout: Duration::from_secs(timeout_secs),
            },
            wizard: WizardConfig::default(),
            http_port: (port != 0).then_some(port),
            cli_enabled,
            output_dir: get("PLANNER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            log_file: get("PLANNER_LOG_FILE").map(PathBuf::from),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{other}' is not a boolean"),
        }),
    }
}
