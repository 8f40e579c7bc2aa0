//! Layered TOML configuration.
//!
//! Built-in defaults are overridden by the global file
//! (`~/.probe/config.toml`), then the local file (`./probe.toml`), then an
//! explicitly named file. Command-line flags are applied by the caller.

use crate::harness::{HarnessConfig, RetryPolicy};
use probe_abstraction::LogprobParameters;
use probe_scoring::{EmptyTokenPolicy, PrefixScorer, TargetPair};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASELINE_MODEL: &str = "gpt-4.1-nano-2025-04-14";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// One configuration file. Every value is optional so files can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub results_root: Option<PathBuf>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub models: ModelsFile,
    #[serde(default)]
    pub evaluation: EvaluationFile,
    #[serde(default)]
    pub scoring: ScoringFile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsFile {
    pub baseline: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationFile {
    pub max_concurrent: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub call_timeout_secs: Option<u64>,
    pub max_tries: Option<u32>,
    pub top_logprobs: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringFile {
    pub targets: Option<[String; 2]>,
    pub empty_token_policy: Option<EmptyTokenPolicy>,
}

impl ConfigFile {
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub results_root: PathBuf,
    pub data_dir: PathBuf,
    pub log_level: Option<String>,
    pub baseline_model: String,
    pub base_url: Option<String>,
    pub max_concurrent: usize,
    pub request_timeout: Duration,
    pub call_timeout: Duration,
    pub max_tries: u32,
    pub top_logprobs: u8,
    pub targets: [String; 2],
    pub empty_token_policy: EmptyTokenPolicy,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let harness = HarnessConfig::default();
        Self {
            results_root: PathBuf::from("results"),
            data_dir: PathBuf::from("data"),
            log_level: None,
            baseline_model: DEFAULT_BASELINE_MODEL.to_string(),
            base_url: None,
            max_concurrent: harness.max_concurrent,
            request_timeout: harness.parameters.request_timeout,
            call_timeout: harness.call_timeout,
            max_tries: harness.retry.max_tries,
            top_logprobs: harness.parameters.top_logprobs,
            targets: TargetPair::default().into(),
            empty_token_policy: EmptyTokenPolicy::default(),
        }
    }
}

impl ProbeConfig {
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".probe")
            .join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from("probe.toml")
    }

    /// Loads the global and local files when present, then `explicit`.
    ///
    /// Missing global/local files are skipped; a missing explicit file and
    /// any file that fails to parse are errors.
    pub fn discover_and_load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            match ConfigFile::load_from_file(&path) {
                Ok(file) => config.merge(&file),
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(path) = explicit {
            config.merge(&ConfigFile::load_from_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Values present in `file` override values in `self`.
    pub fn merge(&mut self, file: &ConfigFile) {
        if let Some(ref root) = file.results_root {
            self.results_root.clone_from(root);
        }
        if let Some(ref dir) = file.data_dir {
            self.data_dir.clone_from(dir);
        }
        if let Some(ref level) = file.log_level {
            self.log_level = Some(level.clone());
        }
        if let Some(ref baseline) = file.models.baseline {
            self.baseline_model.clone_from(baseline);
        }
        if let Some(ref url) = file.models.base_url {
            self.base_url = Some(url.clone());
        }

        let eval = &file.evaluation;
        if let Some(n) = eval.max_concurrent {
            self.max_concurrent = n;
        }
        if let Some(secs) = eval.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = eval.call_timeout_secs {
            self.call_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = eval.max_tries {
            self.max_tries = n;
        }
        if let Some(k) = eval.top_logprobs {
            self.top_logprobs = k;
        }

        if let Some(ref targets) = file.scoring.targets {
            self.targets.clone_from(targets);
        }
        if let Some(policy) = file.scoring.empty_token_policy {
            self.empty_token_policy = policy;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue("evaluation.max_concurrent must be at least 1".to_string()));
        }
        if self.max_tries == 0 {
            return Err(ConfigError::InvalidValue("evaluation.max_tries must be at least 1".to_string()));
        }
        if self.top_logprobs == 0 || self.top_logprobs > 20 {
            return Err(ConfigError::InvalidValue("evaluation.top_logprobs must be between 1 and 20".to_string()));
        }
        if self.call_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("evaluation timeouts must be positive".to_string()));
        }
        self.target_pair()?;
        Ok(())
    }

    pub fn target_pair(&self) -> ConfigResult<TargetPair> {
        let [first, second] = self.targets.clone();
        TargetPair::new(first, second).map_err(|e| ConfigError::InvalidValue(format!("scoring.targets: {e}")))
    }

    pub fn scorer(&self) -> PrefixScorer {
        PrefixScorer::new(self.empty_token_policy)
    }

    pub fn harness_config(&self) -> HarnessConfig {
        let defaults = RetryPolicy::default();
        HarnessConfig {
            max_concurrent: self.max_concurrent,
            call_timeout: self.call_timeout,
            retry: RetryPolicy { max_tries: self.max_tries, ..defaults },
            parameters: LogprobParameters {
                top_logprobs: self.top_logprobs,
                request_timeout: self.request_timeout,
                ..LogprobParameters::default()
            },
        }
    }
}
