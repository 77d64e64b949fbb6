//! Configuration types for research runs.
//!
//! Loaded from TOML; every section falls back to defaults. Credentials are
//! never stored in code: they come from [`SecretRef`]s, which by default
//! read environment variables.

use std::path::{Path, PathBuf};

use lodestar_search::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::analysis::grouping::GroupingStrategy;
use crate::depth::Depth;
use crate::error::{ResearchError, Result};
use crate::llm::CompletionOptions;

/// Environment variable read for the LLM API key by default.
pub const LLM_API_KEY_ENV: &str = "LODESTAR_LLM_API_KEY";
/// Environment variable read for the search API key by default.
pub const SEARCH_API_KEY_ENV: &str = "LODESTAR_SEARCH_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Depth used when a run does not name one.
    pub depth: Depth,
    pub llm: LlmConfig,
    pub search: SearchSettings,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

/// Where an API key comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretRef {
    /// No API key.
    #[default]
    None,
    /// Inline literal key (discouraged; use env/command when possible).
    Literal { value: String },
    /// Read the key from an environment variable.
    Env { var: String },
    /// Read the key from the output of a local command.
    Command { cmd: String },
}

impl SecretRef {
    pub fn env(var: &str) -> Self {
        Self::Env {
            var: var.to_owned(),
        }
    }

    /// Resolve the key. `None` yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] if the variable is missing or empty,
    /// or the command fails or prints nothing.
    pub fn resolve(&self) -> Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::Literal { value } => Ok(Some(value.clone())),
            Self::Env { var } => {
                let value = std::env::var(var)
                    .map_err(|_| ResearchError::Config(format!("secret env var is missing: {var}")))?;
                if value.trim().is_empty() {
                    return Err(ResearchError::Config(format!("secret env var is empty: {var}")));
                }
                Ok(Some(value.trim().to_owned()))
            }
            Self::Command { cmd } => {
                if cmd.trim().is_empty() {
                    return Err(ResearchError::Config("secret command is empty".to_owned()));
                }
                let output = std::process::Command::new("/bin/sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .map_err(|e| ResearchError::Config(format!("failed to run secret command: {e}")))?;
                if !output.status.success() {
                    return Err(ResearchError::Config(format!(
                        "secret command failed with status {}",
                        output
                            .status
                            .code()
                            .map_or_else(|| "unknown".to_owned(), |c| c.to_string())
                    )));
                }
                let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
                if value.is_empty() {
                    return Err(ResearchError::Config(
                        "secret command returned empty output".to_owned(),
                    ));
                }
                Ok(Some(value))
            }
        }
    }
}

/// Language model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without `/v1`.
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub api_key: SecretRef,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout_seconds: 120,
            api_key: SecretRef::env(LLM_API_KEY_ENV),
        }
    }
}

impl LlmConfig {
    /// Generation settings sent with every request.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::default()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

/// Search and fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub api_url: String,
    pub results_per_query: usize,
    pub timeout_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub fetch_concurrency: usize,
    /// Minimum spacing between search API calls.
    pub min_interval_ms: u64,
    /// 0 disables the search cache.
    pub cache_ttl_seconds: u64,
    pub min_sources_per_query: usize,
    pub user_agent: Option<String>,
    pub api_key: SecretRef,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let base = SearchConfig::default();
        Self {
            api_url: base.api_url,
            results_per_query: base.results_per_query,
            timeout_seconds: base.timeout_seconds,
            fetch_timeout_seconds: base.fetch_timeout_seconds,
            fetch_concurrency: base.fetch_concurrency,
            min_interval_ms: base.min_interval_ms,
            cache_ttl_seconds: base.cache_ttl_seconds,
            min_sources_per_query: base.min_sources_per_query,
            user_agent: base.user_agent,
            api_key: SecretRef::env(SEARCH_API_KEY_ENV),
        }
    }
}

impl SearchSettings {
    /// Build the retrieval config, resolving the API key.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] if the key cannot be resolved.
    pub fn to_search_config(&self) -> Result<SearchConfig> {
        let config = self.to_search_config_with_key(self.api_key.resolve()?);
        config
            .validate()
            .map_err(|e| ResearchError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Build the retrieval config with an already-resolved key.
    pub fn to_search_config_with_key(&self, api_key: Option<String>) -> SearchConfig {
        SearchConfig {
            api_url: self.api_url.clone(),
            api_key,
            results_per_query: self.results_per_query,
            timeout_seconds: self.timeout_seconds,
            fetch_timeout_seconds: self.fetch_timeout_seconds,
            fetch_concurrency: self.fetch_concurrency,
            min_interval_ms: self.min_interval_ms,
            cache_ttl_seconds: self.cache_ttl_seconds,
            min_sources_per_query: self.min_sources_per_query,
            user_agent: self.user_agent.clone(),
            ..SearchConfig::default()
        }
    }
}

/// Analysis thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sources with less content than this are not analysed.
    pub min_content_len: usize,
    /// Sources less relevant than this are not analysed.
    pub min_relevance: f64,
    /// Upper bound on sources analysed per sub-question.
    pub max_sources_per_answer: usize,
    pub grouping: GroupingStrategy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_content_len: 100,
            min_relevance: 0.3,
            max_sources_per_answer: 10,
            grouping: GroupingStrategy::default(),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("research_outputs"),
        }
    }
}

impl ResearchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ResearchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ResearchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/lodestar/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("lodestar").join("config.toml")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".config").join("lodestar").join("config.toml")
        } else {
            PathBuf::from("/tmp/lodestar-config/config.toml")
        }
    }

    /// Check values that would make a run meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_url.trim().is_empty() {
            return Err(ResearchError::Config("llm.api_url must not be empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ResearchError::Config("llm.model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ResearchError::Config(
                "llm.temperature must be between 0 and 2".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.analysis.min_relevance) {
            return Err(ResearchError::Config(
                "analysis.min_relevance must be between 0 and 1".into(),
            ));
        }
        if self.analysis.max_sources_per_answer == 0 {
            return Err(ResearchError::Config(
                "analysis.max_sources_per_answer must be greater than 0".into(),
            ));
        }
        self.search
            .to_search_config_with_key(None)
            .validate()
            .map_err(|e| ResearchError::Config(format!("search: {e}")))
    }
}
