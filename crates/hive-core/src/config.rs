use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::descriptor::{GenerationSpec, Provider};
use crate::error::{HiveError, Result};

/// Top-level run configuration (`hive.toml`). Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding one sub-directory per team.
    #[serde(default = "default_teams_dir")]
    pub teams_dir: String,
    /// Shared state snapshot, relative to the working directory.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Artifact directory name inside each team directory.
    #[serde(default = "default_output_dir_name")]
    pub output_dir_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            teams_dir: default_teams_dir(),
            state_file: default_state_file(),
            output_dir_name: default_output_dir_name(),
        }
    }
}

fn default_teams_dir() -> String { "teams".to_string() }
fn default_state_file() -> String { "cache.json".to_string() }
fn default_output_dir_name() -> String { "output".to_string() }

/// Runtime logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String { "hive=info,warn".to_string() }

/// Retry configuration for LLM requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on model ⇄ tool exchanges per unit.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

fn default_max_tool_rounds() -> usize { 5 }

/// Per-provider overrides under `[providers.<name>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Fully resolved settings for one backend call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

fn default_max_tokens() -> u32 { 4096 }

impl AppConfig {
    /// Load from a TOML file, expanding `${ENV_VAR}` references first.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| HiveError::ConfigNotFound(path.display().to_string()))?;

        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| HiveError::Config(e.to_string()))
    }

    /// Load when present, defaults otherwise. Parse errors are still errors.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn team_dir(&self, team: &str) -> PathBuf {
        Path::new(&self.run.teams_dir).join(team)
    }

    /// Merge a descriptor's generation spec with provider settings.
    ///
    /// Descriptor fields win over `[providers.*]`, which win over built-in
    /// defaults. The API key falls back to the provider's conventional
    /// environment variable.
    pub fn model_config(&self, spec: &GenerationSpec) -> ModelConfig {
        let provider_cfg = self
            .providers
            .get(spec.provider.as_str())
            .cloned()
            .unwrap_or_default();

        let model_id = spec
            .model
            .clone()
            .or(provider_cfg.model)
            .unwrap_or_else(|| default_model(spec.provider).to_string());

        let api_key = provider_cfg
            .api_key
            .or_else(|| std::env::var(api_key_env(spec.provider)).ok());

        ModelConfig {
            provider: spec.provider,
            model_id,
            api_key,
            base_url: provider_cfg.base_url,
            max_tokens: spec.max_tokens.unwrap_or_else(default_max_tokens),
            temperature: spec.temperature,
            top_p: spec.top_p,
        }
    }
}

pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "gpt-4o-mini",
        Provider::Mistral => "mistral-small-latest",
        Provider::Claude => "claude-sonnet-4-20250514",
    }
}

pub fn api_key_env(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI_API_KEY",
        Provider::Mistral => "MISTRAL_API_KEY",
        Provider::Claude => "ANTHROPIC_API_KEY",
    }
}

/// Expand `${ENV_VAR}` references. Unset variables, and an unterminated
/// `${`, stay as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match std::env::var(name) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
