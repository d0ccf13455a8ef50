use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::inference::GenerationParams;

/// Main crewhub configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub inference: InferenceConfig,
    pub session: SessionConfig,
}

/// Log verbosity, overridden by RUST_LOG when set
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL; the model id is appended as the last path segment
    pub base_url: String,
    /// Environment variable holding the API token
    pub token_env: String,
    pub default_model: String,
    /// Models the user may pick from
    pub models: Vec<String>,
    pub max_length: u32,
    pub temperature: f32,
    pub do_sample: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prior exchanges inlined into each prompt
    pub context_exchanges: usize,
    /// Exchanges shown by history views
    pub history_limit: usize,
    /// Where exports go when no directory is given
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            inference: InferenceConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            token_env: "HUGGINGFACE_API_TOKEN".to_string(),
            default_model: "microsoft/DialoGPT-medium".to_string(),
            models: vec![
                "microsoft/DialoGPT-medium".to_string(),
                "gpt2".to_string(),
                "distilgpt2".to_string(),
                "facebook/blenderbot-400M-distill".to_string(),
            ],
            max_length: params.max_length,
            temperature: params.temperature,
            do_sample: params.do_sample,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_exchanges: 2,
            history_limit: 5,
            export_dir: PathBuf::from("."),
        }
    }
}

impl InferenceConfig {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_length: self.max_length,
            temperature: self.temperature,
            do_sample: self.do_sample,
        }
    }

    /// Pick a model from the allow-list; `None` means the default
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<String> {
        let model = requested.unwrap_or(&self.default_model);
        if self.models.iter().any(|m| m == model) {
            Ok(model.to_string())
        } else {
            eyre::bail!("Unknown model: {}. Supported: {}", model, self.models.join(", "))
        }
    }

    /// Token from the command line, else from the configured env var.
    /// A blank value at either source counts as unset.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Option<String> {
        let present = |t: &String| !t.trim().is_empty();
        explicit
            .map(str::to_string)
            .filter(present)
            .or_else(|| std::env::var(&self.token_env).ok().filter(present))
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("CREWHUB_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from CREWHUB_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/crewhub/crewhub.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("crewhub").join("crewhub.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./crewhub.yaml (for development)
        let local_config = PathBuf::from("crewhub.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.inference.models.is_empty() {
            eyre::bail!("inference.models must list at least one model");
        }
        if !self.inference.models.contains(&self.inference.default_model) {
            eyre::bail!(
                "inference.default_model '{}' is not in inference.models",
                self.inference.default_model
            );
        }
        Ok(())
    }

    /// Export directory with ~ and env vars expanded
    pub fn export_dir(&self) -> PathBuf {
        Self::expand_path(&self.session.export_dir)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
