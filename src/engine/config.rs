//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::directory::DEFAULT_INDEX_BASE_DIR;
use crate::error::{LucernaError, Result};
use crate::index::writer::IndexWriterConfig;
use crate::storage::StorageConfig;

fn default_index_base_dir() -> String {
    DEFAULT_INDEX_BASE_DIR.to_string()
}

fn default_commit_ms() -> u64 {
    10_000
}

fn default_max_stale_secs() -> f64 {
    60.0
}

fn default_min_stale_secs() -> f64 {
    0.1
}

/// Settings of one [`SearchIndexEngine`](crate::engine::SearchIndexEngine).
///
/// Every field has a default, so a partial JSON object is a valid config:
///
/// ```
/// use lucerna::engine::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "commit_interval_ms": 500 }"#).unwrap();
/// assert_eq!(config.commit_interval_ms, 500);
/// assert_eq!(config.index_base_dir, "luceneIndexes");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory under the storage path that holds one sub-directory per index.
    #[serde(default = "default_index_base_dir")]
    pub index_base_dir: String,

    /// Delay before the first scheduled commit.
    #[serde(default = "default_commit_ms")]
    pub commit_delay_ms: u64,

    /// Interval between scheduled commits.
    #[serde(default = "default_commit_ms")]
    pub commit_interval_ms: u64,

    /// Longest time a write may stay invisible when nobody waits for it.
    #[serde(default = "default_max_stale_secs")]
    pub target_max_stale_secs: f64,

    /// Shortest interval between reopens while someone waits for a generation.
    #[serde(default = "default_min_stale_secs")]
    pub target_min_stale_secs: f64,

    #[serde(default)]
    pub writer: IndexWriterConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            index_base_dir: default_index_base_dir(),
            commit_delay_ms: default_commit_ms(),
            commit_interval_ms: default_commit_ms(),
            target_max_stale_secs: default_max_stale_secs(),
            target_min_stale_secs: default_min_stale_secs(),
            writer: IndexWriterConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_base_dir.is_empty() {
            return Err(LucernaError::invalid_config("index_base_dir must not be empty"));
        }
        if self.commit_interval_ms == 0 {
            return Err(LucernaError::invalid_config("commit_interval_ms must be positive"));
        }
        if !(self.target_min_stale_secs.is_finite() && self.target_min_stale_secs > 0.0) {
            return Err(LucernaError::invalid_config(
                "target_min_stale_secs must be a positive number",
            ));
        }
        if !self.target_max_stale_secs.is_finite()
            || self.target_max_stale_secs < self.target_min_stale_secs
        {
            return Err(LucernaError::invalid_config(
                "target_max_stale_secs must be >= target_min_stale_secs",
            ));
        }
        if Duration::try_from_secs_f64(self.target_max_stale_secs).is_err() {
            return Err(LucernaError::invalid_config(format!(
                "target_max_stale_secs {} is out of range",
                self.target_max_stale_secs
            )));
        }
        if self.writer.max_buffered_docs == 0 {
            return Err(LucernaError::invalid_config("writer.max_buffered_docs must be positive"));
        }
        Ok(())
    }

    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay_ms)
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }

    /// Saturates at [`Duration::MAX`]; [`validate`](Self::validate) rejects
    /// values out of range.
    pub fn max_stale(&self) -> Duration {
        Duration::try_from_secs_f64(self.target_max_stale_secs).unwrap_or(Duration::MAX)
    }

    pub fn min_stale(&self) -> Duration {
        Duration::try_from_secs_f64(self.target_min_stale_secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.index_base_dir, "luceneIndexes");
        assert_eq!(config.commit_delay(), Duration::from_secs(10));
        assert_eq!(config.commit_interval(), Duration::from_secs(10));
        assert_eq!(config.max_stale(), Duration::from_secs(60));
        assert_eq!(config.min_stale(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(
            r#"{ "index_base_dir": "fts", "writer": { "max_buffered_docs": 10 } }"#,
        )
        .unwrap();

        assert_eq!(config.index_base_dir, "fts");
        assert_eq!(config.writer.max_buffered_docs, 10);
        assert_eq!(config.commit_interval_ms, 10_000);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(EngineConfig::from_json(r#"{ "commit_interval_ms": 0 }"#).is_err());
        assert!(EngineConfig::from_json(r#"{ "target_max_stale_secs": 1e20 }"#).is_err());
        assert!(
            EngineConfig::from_json(
                r#"{ "target_max_stale_secs": 0.01, "target_min_stale_secs": 1.0 }"#
            )
            .is_err()
        );
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
