//! CLI configuration file support and credential lookup.
//!
//! Configuration precedence:
//! 1. CLI arguments (handled by clap)
//! 2. Local config file (./kontext.toml)
//! 3. Global config file (~/.kontext/config.toml)
//! 4. Defaults
//!
//! Credentials are never read from files, only from the environment.

use kontext_remote::ReplicateSettings;
use kontext_remote::batch::{DEFAULT_MODEL_VERSION, DEFAULT_OUTPUT_DIR};
use kontext_training::{PipelineOptions, TrainingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const REPLICATE_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";
pub const SUPABASE_KEY_ENV: &str = "SUPABASE_SERVICE_KEY";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";

pub const DEFAULT_LOG_FILE: &str = "training.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    #[error("{0} is not set; export it before running this command")]
    MissingCredential(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    pub training: TrainingConfig,
    pub pipeline: PipelineSection,
    pub replicate: ReplicateSection,
    pub storage: StorageSection,
    pub generate: GenerateSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Directory holding the source photos.
    pub source_dir: PathBuf,
    /// Where the archive and the run report are written.
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub options: PipelineOptions,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("storage/compressed_images"),
            output_dir: PathBuf::from("."),
            options: PipelineOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplicateSection {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub prediction_timeout_secs: u64,
}

impl Default for ReplicateSection {
    fn default() -> Self {
        let settings = ReplicateSettings::default();
        Self {
            base_url: settings.base_url,
            request_timeout_secs: settings.request_timeout.as_secs(),
            poll_interval_secs: settings.poll_interval.as_secs(),
            prediction_timeout_secs: settings.prediction_timeout.as_secs(),
        }
    }
}

impl ReplicateSection {
    pub fn settings(&self) -> ReplicateSettings {
        ReplicateSettings {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            prediction_timeout: Duration::from_secs(self.prediction_timeout_secs),
        }
    }

    /// Zero intervals would busy-poll or expire every call immediately.
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("prediction_timeout_secs", self.prediction_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(format!("[replicate].{name} must be >= 1")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Project URL; `SUPABASE_URL` takes precedence.
    pub url: Option<String>,
    pub bucket: String,
    pub upload_dir: PathBuf,
    pub stats_file: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            url: None,
            bucket: "generated-images".to_string(),
            upload_dir: PathBuf::from("storage/compressed_images"),
            stats_file: PathBuf::from("storage_stats.json"),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerateSection {
    /// Model used by `generate` and `predict`, `owner/name[:version]`.
    pub model: String,
    pub output_dir: PathBuf,
    pub trigger_word: String,
    pub prompt: String,
    /// Model queried by `version`.
    pub version_model: String,
}

impl Default for GenerateSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL_VERSION.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            trigger_word: "DANI".to_string(),
            prompt: "Close-up photo of DANIELC with a surprised and excited expression, perfect for a YouTube \
                     thumbnail. Dramatic, vibrant studio lighting. Ultra sharp, 8k resolution, incredibly high \
                     detail, professional photography."
                .to_string(),
            version_model: "daniel-carreon/danielcarreong".to_string(),
        }
    }
}

impl CliConfig {
    /// Load a single TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let table = read_table(path)?;
        Self::from_table(table, path)
    }

    fn from_table(table: toml::Table, origin: &Path) -> ConfigResult<Self> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", origin.display(), e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kontext")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from("kontext.toml")
    }

    /// Discover and load configuration files.
    ///
    /// An explicit path must exist. Otherwise the global and then the local
    /// file are read when present; local keys override global keys.
    pub fn discover_and_load(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let mut merged = toml::Table::new();
        for path in [Self::default_global_path(), Self::default_local_path()] {
            match read_table(&path) {
                Ok(table) => merge_tables(&mut merged, table),
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Self::from_table(merged, Path::new("<merged config>"))
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }
}

fn read_table(path: &Path) -> ConfigResult<toml::Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
    content
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Merge `other` into `base`. Nested tables merge key by key; any other
/// value in `other` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => merge_tables(existing, incoming),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Read a required credential from the environment.
pub fn require_env(name: &'static str) -> ConfigResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}
