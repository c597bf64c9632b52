//! Typed configuration.
//!
//! [`EngineConfig`] sizes a run: the fixed worker count and the capacity of
//! both queues. It can be built in code, read from an `[engine]` TOML table,
//! or taken from the environment together with the process-level settings in
//! [`Config`]. Layers (env, file, flags) combine through [`EngineOverrides`];
//! only the final value is validated.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Sizing for one engine run.
///
/// A capacity of `0` makes the queue a rendezvous channel: every send blocks
/// until a receiver takes the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of workers. Fixed for the lifetime of a run.
    pub workers: usize,
    /// Buffered slots in the input queue.
    pub input_capacity: usize,
    /// Buffered slots in the output queue.
    pub output_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            input_capacity: 0,
            output_capacity: 0,
        }
    }
}

/// A partial [`EngineConfig`]: one configuration layer where every field is
/// optional. Present fields replace the layer below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOverrides {
    pub workers: Option<usize>,
    pub input_capacity: Option<usize>,
    pub output_capacity: Option<usize>,
}

/// Top-level TOML wrapper.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineOverrides,
}

impl EngineOverrides {
    /// Parse the `[engine]` table of a TOML document. Keys that are absent
    /// stay `None`; nothing is validated here.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.engine)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity;
        self
    }

    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// Layer `overrides` on top of `self`.
    pub fn merge(self, overrides: EngineOverrides) -> Self {
        Self {
            workers: overrides.workers.unwrap_or(self.workers),
            input_capacity: overrides.input_capacity.unwrap_or(self.input_capacity),
            output_capacity: overrides.output_capacity.unwrap_or(self.output_capacity),
        }
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Parse the `[engine]` table of a TOML document. Missing keys keep
    /// their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Self::default().merge(EngineOverrides::from_toml_str(content)?);
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::default().merge(EngineOverrides::load(path)?);
        config.validate()?;
        Ok(config)
    }
}

/// Process-level configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// Every variable is optional; a present but malformed number is an error.
    /// Engine sizing is not validated here; later layers may still override
    /// it through [`EngineConfig::merge`].
    pub fn from_env() -> Result<Self> {
        let engine = EngineConfig::default().merge(EngineOverrides {
            workers: usize_var("FANREDUCE_WORKERS")?,
            input_capacity: usize_var("FANREDUCE_INPUT_CAPACITY")?,
            output_capacity: usize_var("FANREDUCE_OUTPUT_CAPACITY")?,
        });

        Ok(Self {
            engine,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn usize_var(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            Error::Config(format!(
                "environment variable {name} must be a non-negative integer, got {raw:?}"
            ))
        }),
        Err(_) => Ok(None),
    }
}
