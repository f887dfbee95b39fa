//! Configuration models for cscorpus.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The user resolves these unknowns at runtime via config file.

use super::DEFAULT_CATEGORIES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level configuration for cscorpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote generation endpoint
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Retry policy for remote calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Parameter space and sampling settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Batch output files
    #[serde(default)]
    pub output: OutputConfig,

    /// Annotation store settings
    #[serde(default)]
    pub annotation: AnnotationConfig,
}

/// Chat-completions endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// API key (can also be set via the `api_key_env` variable)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "LITELLM_API_KEY".to_string()
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_timeout() -> u64 {
    180
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Retry settings for a single remote call.
///
/// `max_attempts = 1` disables retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Generation parameter space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Topics, in enumeration order
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// Target model identifiers, in enumeration order
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Calls per (task, model) for script generation
    #[serde(default = "default_samples_per_model")]
    pub samples_per_model: usize,

    /// Flat delay between consecutive remote calls
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,

    /// Optional prompt table (topic → level → language → prompt) overriding built-ins
    #[serde(default)]
    pub prompt_overrides: Option<PathBuf>,
}

fn default_topics() -> Vec<String> {
    [
        "Business",
        "Everyday Conversation",
        "Language Education",
        "Entertainment",
        "Slang/Neologisms",
        "Travel",
        "Software Development",
        "Health & Wellness",
        "Academic",
        "Traditional Culture",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_models() -> Vec<String> {
    ["gpt-4o-mini", "gpt-4.1-nano", "gpt-4.1-mini", "claude-3.7-sonnet"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_samples_per_model() -> usize {
    1
}

fn default_call_delay_ms() -> u64 {
    1000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            models: default_models(),
            temperature: default_temperature(),
            samples_per_model: default_samples_per_model(),
            call_delay_ms: default_call_delay_ms(),
            prompt_overrides: None,
        }
    }
}

impl GenerationConfig {
    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Script batch output
    #[serde(default = "default_scripts_path")]
    pub scripts_path: PathBuf,

    /// Dialogue batch output
    #[serde(default = "default_dialogues_path")]
    pub dialogues_path: PathBuf,

    /// Prompt table output
    #[serde(default = "default_prompts_path")]
    pub prompts_path: PathBuf,
}

fn default_scripts_path() -> PathBuf {
    PathBuf::from("scripts/samples.json")
}

fn default_dialogues_path() -> PathBuf {
    PathBuf::from("dialogues.json")
}

fn default_prompts_path() -> PathBuf {
    PathBuf::from("prompts.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            scripts_path: default_scripts_path(),
            dialogues_path: default_dialogues_path(),
            prompts_path: default_prompts_path(),
        }
    }
}

/// Annotation store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Directory holding `scripts_<worker>.json` files
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Allowed worker names; empty allows any valid name
    #[serde(default)]
    pub workers: Vec<String>,

    /// Fixed category label set used for counts
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            workers: Vec::new(),
            categories: default_categories(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.topics.is_empty() {
            return Err(ConfigError::Invalid("generation.topics is empty".into()));
        }
        if self.generation.models.is_empty() {
            return Err(ConfigError::Invalid("generation.models is empty".into()));
        }
        if let Some(dup) = first_duplicate(&self.generation.topics) {
            return Err(ConfigError::Invalid(format!(
                "generation.topics lists '{dup}' more than once"
            )));
        }
        if let Some(dup) = first_duplicate(&self.generation.models) {
            return Err(ConfigError::Invalid(format!(
                "generation.models lists '{dup}' more than once"
            )));
        }
        if self.generation.samples_per_model == 0 {
            return Err(ConfigError::Invalid(
                "generation.samples_per_model must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }
        if self.annotation.categories.is_empty() {
            return Err(ConfigError::Invalid("annotation.categories is empty".into()));
        }
        Ok(())
    }

    /// Resolve the endpoint credential from config or environment.
    ///
    /// B_i(api key available) → Result. A blank or unexpanded value counts as missing.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        let key = match &self.endpoint.api_key {
            Some(key) => expand_env_vars(key),
            None => std::env::var(&self.endpoint.api_key_env).unwrap_or_default(),
        };

        // An unexpanded ${VAR} placeholder means the variable is unset
        if key.trim().is_empty() || key.contains("${") {
            return Err(ConfigError::MissingApiKey {
                env_var: self.endpoint.api_key_env.clone(),
            });
        }
        Ok(key)
    }
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .find(|item| !seen.insert(item.as_str()))
        .map(String::as_str)
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };

    re.replace_all(s, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error, out-of-range value
/// - I^B materialized: Missing required credential
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing API key: set {env_var} env var or endpoint.api_key in config")]
    MissingApiKey { env_var: String },

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_original_parameter_space() {
        let config = Config::default();
        assert_eq!(config.generation.topics.len(), 10);
        assert_eq!(config.generation.models.len(), 4);
        assert_eq!(config.annotation.categories.len(), 10);
        assert_eq!(config.endpoint.api_key_env, "LITELLM_API_KEY");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cscorpus.toml");
        std::fs::write(
            &path,
            r#"
[generation]
topics = ["Travel"]
models = ["m1"]
call_delay_ms = 0

[retry]
max_attempts = 1
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.generation.topics, vec!["Travel"]);
        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.initial_backoff_ms, 1000);
        assert_eq!(config.output.prompts_path, PathBuf::from("prompts.json"));
    }

    #[test]
    fn test_rejects_empty_models() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cscorpus.toml");
        std::fs::write(&path, "[generation]\nmodels = []\n").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_repeated_topics_and_models() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cscorpus.toml");

        std::fs::write(&path, "[generation]\ntopics = [\"Travel\", \"Travel\"]\nmodels = [\"m1\"]\n")
            .unwrap();
        match Config::from_file(&path) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("Travel")),
            other => panic!("expected Invalid, got {other:?}"),
        }

        std::fs::write(&path, "[generation]\ntopics = [\"Travel\"]\nmodels = [\"m1\", \"m1\"]\n")
            .unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.generation.samples_per_model, 1);
    }

    #[test]
    fn test_resolve_api_key_missing_and_blank() {
        let mut config = Config::default();
        config.endpoint.api_key_env = "CSCORPUS_TEST_UNSET_KEY_VAR".into();
        assert!(matches!(
            config.resolve_api_key(),
            Err(ConfigError::MissingApiKey { .. })
        ));

        config.endpoint.api_key = Some("   ".into());
        assert!(config.resolve_api_key().is_err());

        config.endpoint.api_key = Some("${CSCORPUS_TEST_UNSET_KEY_VAR}".into());
        assert!(matches!(
            config.resolve_api_key(),
            Err(ConfigError::MissingApiKey { .. })
        ));

        config.endpoint.api_key = Some("sk-test".into());
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_expand_env_vars_leaves_unknown_placeholder() {
        assert_eq!(
            expand_env_vars("${CSCORPUS_TEST_NEVER_SET}/x"),
            "${CSCORPUS_TEST_NEVER_SET}/x"
        );
        assert_eq!(expand_env_vars("plain"), "plain");
    }
}
