use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_MODELS: [&str; 3] = ["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"];
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 30_000;
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Which note generator answers requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Gemini completion service with model fallback
    #[default]
    Gemini,
    /// Offline note built from the transcript itself
    Simple,
}

/// Language of the recovery hints sent with errors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ko,
}

/// On-disk configuration; every field is optional
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    pub generator: Option<GeneratorKind>,
    pub models: Option<Vec<String>>,
    pub max_transcript_chars: Option<usize>,
    pub completion_timeout_secs: Option<u64>,
    pub lookup_timeout_secs: Option<u64>,
    pub locale: Option<Locale>,
}

impl Config {
    /// Load config from ~/.config/ytnote/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytnote")
        .join("config.toml")
}

/// Resolved, immutable settings handed to the pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub generator: GeneratorKind,
    pub models: Vec<String>,
    pub api_key: Option<String>,
    pub max_transcript_chars: usize,
    pub completion_timeout: Duration,
    pub lookup_timeout: Duration,
    pub locale: Locale,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            generator: GeneratorKind::default(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            api_key: None,
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
            completion_timeout: Duration::from_secs(DEFAULT_COMPLETION_TIMEOUT_SECS),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
            locale: Locale::default(),
        }
    }
}

impl Settings {
    /// Fill defaults from the config file; the API key is passed in by the caller
    pub fn from_config(config: Config, api_key: Option<String>) -> Result<Self> {
        let defaults = Settings::default();

        let models = non_blank_models(config.models.unwrap_or(defaults.models))?;

        let max_transcript_chars = config.max_transcript_chars.unwrap_or(defaults.max_transcript_chars);
        if max_transcript_chars == 0 {
            bail!("max_transcript_chars must be greater than zero");
        }

        Ok(Self {
            bind: config.bind.unwrap_or(defaults.bind),
            generator: config.generator.unwrap_or(defaults.generator),
            models,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_transcript_chars,
            completion_timeout: config
                .completion_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.completion_timeout),
            lookup_timeout: config
                .lookup_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.lookup_timeout),
            locale: config.locale.unwrap_or(defaults.locale),
        })
    }

    /// Replace the fallback chain, e.g. from `--model` flags
    pub fn set_models(&mut self, models: Vec<String>) -> Result<()> {
        self.models = non_blank_models(models)?;
        Ok(())
    }
}

fn non_blank_models(models: Vec<String>) -> Result<Vec<String>> {
    let models: Vec<String> = models
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if models.is_empty() {
        bail!("at least one model identifier must be configured");
    }
    Ok(models)
}
