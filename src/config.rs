//! Dataset configuration management.
//!
//! This module provides the unified configuration for building a
//! decompensation dataset, with serialization support for experiment
//! reproducibility.
//!
//! # Features
//!
//! - **Unified Configuration**: window tolerance, labeling, ordering, partitions
//! - **Serialization**: Save/load configurations to TOML or JSON
//! - **Validation**: Ensure configurations are valid before use
//!
//! # Example
//!
//! ```ignore
//! use decompensation_builder::config::DecompensationConfig;
//!
//! let config = DecompensationConfig::default();
//! config.save_toml("decompensation.toml")?;
//!
//! let loaded = DecompensationConfig::load_toml("decompensation.toml")?;
//! let pipeline = PartitionPipeline::from_config(loaded)?;
//! ```

use crate::labeling::LabelConfig;
use crate::timeline::DEFAULT_EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Seed of the training-partition shuffle.
///
/// Changing it changes the order of every `train` manifest built afterwards.
pub const DEFAULT_SHUFFLE_SEED: u64 = 49297;

/// Partitions processed by default, in processing order.
pub const DEFAULT_PARTITIONS: [&str; 2] = ["test", "train"];

/// Unified dataset configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompensationConfig {
    /// Partitions to process, in order
    pub partitions: Vec<String>,

    /// Write `summary.json` next to each manifest
    #[serde(default)]
    pub write_summary: bool,

    /// In-ICU window tolerance
    pub window: WindowConfig,

    /// Horizon and label derivation
    pub labels: LabelConfig,

    /// Manifest ordering per partition
    pub ordering: OrderingConfig,

    /// Experiment metadata (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Tolerance applied around the `[0, los]` window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Tolerance in hours
    pub epsilon: f64,
}

/// How a partition's manifest rows are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingPolicy {
    /// Seeded random permutation
    Shuffle,

    /// Ascending by output file name, then horizon, then label
    Sorted,

    /// Processing order
    Preserve,
}

/// Which partitions are shuffled or sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// Seed for the shuffle generator
    pub shuffle_seed: u64,

    /// Partitions whose rows are shuffled
    pub shuffled_partitions: Vec<String>,

    /// Partitions whose rows are sorted
    pub sorted_partitions: Vec<String>,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Default for DecompensationConfig {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS.iter().map(|p| p.to_string()).collect(),
            write_summary: false,
            window: WindowConfig::default(),
            labels: LabelConfig::default(),
            ordering: OrderingConfig::default(),
            metadata: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            shuffle_seed: DEFAULT_SHUFFLE_SEED,
            shuffled_partitions: vec!["train".to_string()],
            sorted_partitions: vec!["test".to_string()],
        }
    }
}

impl OrderingConfig {
    /// Ordering policy of a partition.
    ///
    /// A partition listed as both shuffled and sorted is rejected by
    /// [`DecompensationConfig::validate`].
    pub fn policy_for(&self, partition: &str) -> OrderingPolicy {
        if self.shuffled_partitions.iter().any(|p| p == partition) {
            OrderingPolicy::Shuffle
        } else if self.sorted_partitions.iter().any(|p| p == partition) {
            OrderingPolicy::Sorted
        } else {
            OrderingPolicy::Preserve
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(p) = self
            .shuffled_partitions
            .iter()
            .find(|p| self.sorted_partitions.contains(p))
        {
            return Err(format!("partition {p:?} cannot be both shuffled and sorted"));
        }
        Ok(())
    }
}

impl DecompensationConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set label configuration.
    pub fn with_labels(mut self, labels: LabelConfig) -> Self {
        self.labels = labels;
        self
    }

    /// Set the partitions to process.
    pub fn with_partitions<S: Into<String>>(
        mut self,
        partitions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.partitions = partitions.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if !self.window.epsilon.is_finite() || self.window.epsilon < 0.0 {
            return Err("window.epsilon must be a finite, non-negative number".to_string());
        }

        self.labels.validate()?;
        self.ordering.validate()?;

        if self.partitions.is_empty() {
            return Err("at least one partition is required".to_string());
        }
        let mut seen = HashSet::new();
        for partition in &self.partitions {
            if partition.is_empty() || partition.contains(['/', '\\']) || partition == ".." {
                return Err(format!("invalid partition name {partition:?}"));
            }
            if !seen.insert(partition.as_str()) {
                return Err(format!("partition {partition:?} listed twice"));
            }
        }

        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DecompensationConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DecompensationConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}
