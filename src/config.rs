//! Configuration management
//!
//! Every setting has a default and can be overridden from the environment.
//! [`Config::from_lookup`] takes the variable source as a closure so tests
//! do not have to touch the process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::storage::ProcessMemory;
use crate::streaming::pipeline;
use crate::streaming::{FailOnLoss, IngestPipeline, LogAndContinue, LossPolicy};

// ============================================================================
// Defaults
// ============================================================================

/// Default CSV source.
pub const DEFAULT_CSV_FILE_PATH: &str = "./data/raw/transactions.csv";

/// Default rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = pipeline::DEFAULT_CHUNK_SIZE;

/// Default requested worker count.
pub const DEFAULT_WORKER_COUNT: usize = pipeline::DEFAULT_WORKERS;

/// Default read buffer in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = pipeline::DEFAULT_BUFFER_SIZE;

/// Default chunks in flight between reader and workers.
pub const DEFAULT_CHANNEL_CAPACITY: usize = pipeline::DEFAULT_CHANNEL_CAPACITY;

/// Default fraction of rows that must parse for a clean run.
pub const DEFAULT_LOSS_THRESHOLD: f64 = pipeline::DEFAULT_LOSS_THRESHOLD;

/// Default durable cache file.
pub const DEFAULT_CACHE_FILE_PATH: &str = "./data/processed/analytics_cache.json";

/// Default memory slot TTL in seconds (24 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Duration-string TTL (`"24h"`, `"90m"`); takes precedence over `CACHE_TTL_SECS`.
pub const CACHE_TTL_VAR: &str = "CACHE_TTL";

/// Default process memory ceiling in MiB.
pub const DEFAULT_CACHE_MAX_MEMORY_MB: u64 = 500;

/// Configuration errors
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub csv: CsvConfig,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

/// Ingest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvConfig {
    pub file_path: PathBuf,
    pub chunk_size: usize,
    pub worker_count: usize,
    pub buffer_size: usize,
    pub channel_capacity: usize,
    pub loss_threshold: f64,
    pub fail_on_data_loss: bool,
}

/// Cache tier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub file_path: PathBuf,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub max_memory_bytes: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Minimum level for emitted log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidValue {
                key: "LOG_LEVEL",
                value: s.to_string(),
            }),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT",
                value: s.to_string(),
            }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv: CsvConfig {
                file_path: PathBuf::from(DEFAULT_CSV_FILE_PATH),
                chunk_size: DEFAULT_CHUNK_SIZE,
                worker_count: DEFAULT_WORKER_COUNT,
                buffer_size: DEFAULT_BUFFER_SIZE,
                channel_capacity: DEFAULT_CHANNEL_CAPACITY,
                loss_threshold: DEFAULT_LOSS_THRESHOLD,
                fail_on_data_loss: false,
            },
            cache: CacheConfig {
                file_path: PathBuf::from(DEFAULT_CACHE_FILE_PATH),
                ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
                max_memory_bytes: DEFAULT_CACHE_MAX_MEMORY_MB * 1024 * 1024,
            },
            log: LogConfig {
                level: LogLevel::default(),
                format: LogFormat::default(),
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment and defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &'static str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = Config {
            csv: CsvConfig {
                file_path: var("CSV_FILE_PATH").map(PathBuf::from).unwrap_or(defaults.csv.file_path),
                chunk_size: parse_or(var("CSV_BATCH_SIZE"), "CSV_BATCH_SIZE", DEFAULT_CHUNK_SIZE)?,
                worker_count: parse_or(var("CSV_WORKER_POOL"), "CSV_WORKER_POOL", DEFAULT_WORKER_COUNT)?,
                buffer_size: parse_or(var("CSV_BUFFER_SIZE"), "CSV_BUFFER_SIZE", DEFAULT_BUFFER_SIZE)?,
                channel_capacity: parse_or(
                    var("CSV_CHANNEL_CAPACITY"),
                    "CSV_CHANNEL_CAPACITY",
                    DEFAULT_CHANNEL_CAPACITY,
                )?,
                loss_threshold: parse_or(
                    var("ANALYTICS_LOSS_THRESHOLD"),
                    "ANALYTICS_LOSS_THRESHOLD",
                    DEFAULT_LOSS_THRESHOLD,
                )?,
                fail_on_data_loss: match var("ANALYTICS_FAIL_ON_DATA_LOSS") {
                    Some(raw) => parse_bool("ANALYTICS_FAIL_ON_DATA_LOSS", &raw)?,
                    None => false,
                },
            },
            cache: CacheConfig {
                file_path: var("CACHE_FILE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.file_path),
                ttl: match var(CACHE_TTL_VAR) {
                    Some(raw) => parse_duration(CACHE_TTL_VAR, raw)?,
                    None => Duration::from_secs(parse_or(
                        var("CACHE_TTL_SECS"),
                        "CACHE_TTL_SECS",
                        DEFAULT_CACHE_TTL_SECS,
                    )?),
                },
                max_memory_bytes: parse_or::<u64>(
                    var("CACHE_MAX_MEMORY_MB"),
                    "CACHE_MAX_MEMORY_MB",
                    DEFAULT_CACHE_MAX_MEMORY_MB,
                )?
                .saturating_mul(1024 * 1024),
            },
            log: LogConfig {
                level: var("LOG_LEVEL").map(|v| v.parse::<LogLevel>()).transpose()?.unwrap_or_default(),
                format: var("LOG_FORMAT").map(|v| v.parse::<LogFormat>()).transpose()?.unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.csv.file_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("CSV file path cannot be empty".to_string()));
        }

        if self.cache.file_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Cache file path cannot be empty".to_string()));
        }

        for (name, value) in [
            ("chunk size", self.csv.chunk_size),
            ("worker count", self.csv.worker_count),
            ("buffer size", self.csv.buffer_size),
            ("channel capacity", self.csv.channel_capacity),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("CSV {name} must be greater than 0")));
            }
        }

        if !(0.0..=1.0).contains(&self.csv.loss_threshold) {
            return Err(ConfigError::Invalid(format!(
                "Loss threshold ({}) must be between 0 and 1",
                self.csv.loss_threshold
            )));
        }

        Ok(())
    }
}

impl CsvConfig {
    /// Ingest pipeline configured from these settings
    pub fn pipeline(&self) -> IngestPipeline {
        let policy: Arc<dyn LossPolicy> = if self.fail_on_data_loss {
            Arc::new(FailOnLoss)
        } else {
            Arc::new(LogAndContinue)
        };

        IngestPipeline::new()
            .with_chunk_size(self.chunk_size)
            .with_workers(self.worker_count)
            .with_buffer_size(self.buffer_size)
            .with_channel_capacity(self.channel_capacity)
            .with_loss_threshold(self.loss_threshold)
            .with_policy(policy)
            .with_memory_probe(Arc::new(ProcessMemory::new()))
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn parse_duration(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    humantime::parse_duration(&value).map_err(|_| ConfigError::InvalidValue { key, value })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
