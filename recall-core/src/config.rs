//! Configuration for the recall memory system.
//!
//! Maps directly to `recall.toml`. Every field has a default, so an empty
//! document is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Password for encrypted snapshot export/import. Encryption of
    /// snapshots is unavailable when unset.
    #[serde(default)]
    pub encryption_password: Option<String>,
    /// Soft cap on stored memories. Exceeding it only logs a warning.
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,
    /// Interval between consolidation passes, in milliseconds.
    #[serde(default = "default_consolidation_interval_ms")]
    pub consolidation_interval_ms: u64,
    /// Recorded for callers; the store path keeps content uncompressed.
    #[serde(default = "default_true")]
    pub auto_compress: bool,
    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Consolidation settings.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    /// Compression policy settings.
    #[serde(default)]
    pub compression: CompressionConfig,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            encryption_password: None,
            max_memories: default_max_memories(),
            consolidation_interval_ms: default_consolidation_interval_ms(),
            auto_compress: true,
            store: StoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            consolidation: ConsolidationConfig::default(),
            compression: CompressionConfig::default(),
        }
    }
}

impl RecallConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `RecallError::Configuration` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::RecallError::Configuration(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Consolidation interval as a [`Duration`].
    #[must_use]
    pub fn consolidation_interval(&self) -> Duration {
        Duration::from_millis(self.consolidation_interval_ms)
    }

    /// Builder-style password setter.
    #[must_use]
    pub fn with_encryption_password(mut self, password: impl Into<String>) -> Self {
        self.encryption_password = Some(password.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Log any store call slower than this (ms).
    #[serde(default = "default_50")]
    pub slow_store_ms: u64,
    /// Source tag used by the typed creation helpers.
    #[serde(default = "default_source")]
    pub default_source: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slow_store_ms: 50,
            default_source: default_source(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Page size when a query sets no limit.
    #[serde(default = "default_10")]
    pub default_limit: usize,
    /// Log any query slower than this (ms).
    #[serde(default = "default_100")]
    pub slow_query_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            slow_query_ms: 100,
        }
    }
}

/// Consolidation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Pairs scoring strictly above this get linked.
    #[serde(default = "default_0_7")]
    pub similarity_threshold: f32,
    /// Cap on buffered memories taken per pass. Leftovers wait for the
    /// next pass. Unlimited when unset.
    #[serde(default)]
    pub max_batch_size: Option<usize>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_batch_size: None,
        }
    }
}

/// Automatic compression policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Payloads smaller than this stay uncompressed.
    #[serde(default = "default_1000")]
    pub size_threshold_bytes: usize,
    /// Payloads older than this get semantic (lossy) compression.
    #[serde(default = "default_30")]
    pub semantic_age_days: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            size_threshold_bytes: 1000,
            semantic_age_days: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_source() -> String { crate::memory::DEFAULT_SOURCE.to_string() }
fn default_0_7() -> f32 { 0.7 }
fn default_10() -> usize { 10 }
fn default_30() -> u32 { 30 }
fn default_50() -> u64 { 50 }
fn default_100() -> u64 { 100 }
fn default_1000() -> usize { 1000 }
fn default_max_memories() -> usize { 10_000 }
fn default_consolidation_interval_ms() -> u64 { 300_000 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = RecallConfig::from_toml("").expect("parse");
        assert_eq!(config.consolidation_interval(), Duration::from_secs(300));
        assert_eq!(config.max_memories, 10_000);
        assert_eq!(config.retrieval.default_limit, 10);
        assert!((config.consolidation.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert!(config.encryption_password.is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = RecallConfig::from_toml(
            r#"
            encryption_password = "hunter2"
            consolidation_interval_ms = 1000

            [consolidation]
            max_batch_size = 64
            "#,
        )
        .expect("parse");
        assert_eq!(config.encryption_password.as_deref(), Some("hunter2"));
        assert_eq!(config.consolidation_interval_ms, 1000);
        assert_eq!(config.consolidation.max_batch_size, Some(64));
        assert_eq!(config.compression.size_threshold_bytes, 1000);
    }

    #[test]
    fn invalid_toml_is_a_configuration_error() {
        let err = RecallConfig::from_toml("max_memories = \"lots\"").expect_err("should fail");
        assert!(matches!(err, crate::RecallError::Configuration(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "max_memories = 42").expect("write");
        let config = RecallConfig::from_file(file.path()).expect("load");
        assert_eq!(config.max_memories, 42);
    }
}
