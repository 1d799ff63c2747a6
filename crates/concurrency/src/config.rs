//! Transaction table configuration via `txtable.toml`
//!
//! Holds the reaper schedule, internal wait bounds, the blocking pool shape
//! and the per-cache choice of how a decided commit is pushed to members.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use txtable_core::{TxError, TxResult};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "txtable.toml";

/// How a decided commit is driven on members that hold no local handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Members already prepared: send a plain commit
    #[default]
    TwoPhase,
    /// Members never prepared (pessimistic locking): replay the write-set as a
    /// one-phase prepare
    OnePhase,
}

/// Per-cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheTxConfig {
    /// Remote commit strategy
    #[serde(default)]
    pub commit_mode: CommitMode,
}

/// Transaction table configuration loaded from `txtable.toml`.
///
/// # Example
///
/// ```toml
/// reaper_interval_ms = 60000
/// completion_timeout_ms = 30000
/// blocking_threads = 2
/// max_queue_depth = 4096
///
/// [caches.orders]
/// commit_mode = "one_phase"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxTableConfig {
    /// Fixed delay between reaper passes
    #[serde(default = "default_reaper_interval_ms")]
    pub reaper_interval_ms: u64,
    /// Bound on internal waits for an atomic apply (reaper, completion)
    #[serde(default = "default_completion_timeout_ms")]
    pub completion_timeout_ms: u64,
    /// Worker threads running local commit/rollback
    #[serde(default = "default_blocking_threads")]
    pub blocking_threads: usize,
    /// Queue bound of the blocking pool
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Per-cache overrides
    #[serde(default)]
    pub caches: BTreeMap<String, CacheTxConfig>,
}

fn default_reaper_interval_ms() -> u64 {
    60_000
}

fn default_completion_timeout_ms() -> u64 {
    30_000
}

fn default_blocking_threads() -> usize {
    2
}

fn default_max_queue_depth() -> usize {
    4096
}

impl Default for TxTableConfig {
    fn default() -> Self {
        Self {
            reaper_interval_ms: default_reaper_interval_ms(),
            completion_timeout_ms: default_completion_timeout_ms(),
            blocking_threads: default_blocking_threads(),
            max_queue_depth: default_max_queue_depth(),
            caches: BTreeMap::new(),
        }
    }
}

impl TxTableConfig {
    /// Delay between reaper passes
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_millis(self.reaper_interval_ms)
    }

    /// Bound on internal apply waits
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    /// Commit mode of `cache_name`, defaulting to two-phase
    pub fn commit_mode(&self, cache_name: &str) -> CommitMode {
        self.caches
            .get(cache_name)
            .map(|c| c.commit_mode)
            .unwrap_or_default()
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `TxError::Config` naming the first invalid field.
    pub fn validate(&self) -> TxResult<()> {
        if self.reaper_interval_ms == 0 {
            return Err(TxError::config("reaper_interval_ms must be greater than 0"));
        }
        if self.completion_timeout_ms == 0 {
            return Err(TxError::config("completion_timeout_ms must be greater than 0"));
        }
        if self.blocking_threads == 0 {
            return Err(TxError::config("blocking_threads must be greater than 0"));
        }
        if self.max_queue_depth == 0 {
            return Err(TxError::config("max_queue_depth must be greater than 0"));
        }
        Ok(())
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> TxResult<Self> {
        let config: TxTableConfig = toml::from_str(content)
            .map_err(|e| TxError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> TxResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TxError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            TxError::Config(msg) => TxError::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> TxResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TxError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            TxError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
