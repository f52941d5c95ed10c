//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use decompensation_builder::PipelineBuilder;
//!
//! // Defaults: 24h interval and horizon, seed 49297, test then train
//! let builder = PipelineBuilder::new().threads(8).build_dataset()?;
//! builder.run(&DirectorySource::new("data/root"), "data/decompensation")?;
//! ```
//!
//! # Common Configurations
//!
//! ## Shorter prediction interval
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .future_time_interval(12.0)
//!     .max_horizon(12)
//!     .build()?;
//! ```
//!
//! ## Extra partition with a summary
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .partitions(["test", "train", "val"])
//!     .write_summary(true)
//!     .build()?;
//! ```

use crate::batch::BatchConfig;
use crate::config::{DecompensationConfig, ExperimentMetadata};
use crate::error::{DatasetError, Result};
use crate::pipeline::{DatasetBuilder, PartitionPipeline};

/// Fluent builder for creating pipeline configurations.
///
/// Configuration is validated when building.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: DecompensationConfig,
    batch: BatchConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: DecompensationConfig) -> Self {
        Self {
            config,
            batch: BatchConfig::default(),
        }
    }

    // =========================================================================
    // Labeling
    // =========================================================================

    /// Hours after the horizon within which a death counts as decompensation.
    ///
    /// Default: 24.0.
    pub fn future_time_interval(mut self, hours: f64) -> Self {
        self.config.labels.future_time_interval_hours = hours;
        self
    }

    /// Upper bound of the horizon, in hours.
    ///
    /// Default: 24.
    pub fn max_horizon(mut self, hours: u32) -> Self {
        self.config.labels.max_horizon_hours = hours;
        self
    }

    // =========================================================================
    // Windowing and ordering
    // =========================================================================

    /// Tolerance around the in-ICU window, in hours.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.window.epsilon = epsilon;
        self
    }

    /// Seed of the shuffled partitions.
    pub fn shuffle_seed(mut self, seed: u64) -> Self {
        self.config.ordering.shuffle_seed = seed;
        self
    }

    /// Partitions to process, in order.
    pub fn partitions<S: Into<String>>(mut self, partitions: impl IntoIterator<Item = S>) -> Self {
        self.config.partitions = partitions.into_iter().map(Into::into).collect();
        self
    }

    // =========================================================================
    // Output
    // =========================================================================

    pub fn write_summary(mut self, enabled: bool) -> Self {
        self.config.write_summary = enabled;
        self
    }

    pub fn metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    // =========================================================================
    // Parallelism
    // =========================================================================

    /// Worker threads for subject processing.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn threads(mut self, threads: usize) -> Self {
        self.batch = self.batch.with_threads(threads);
        self
    }

    /// Print a progress line per partition.
    pub fn progress(mut self, enabled: bool) -> Self {
        self.batch = self.batch.with_progress(enabled);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Validate and return the configuration.
    pub fn build_config(self) -> std::result::Result<DecompensationConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build a [`PartitionPipeline`].
    pub fn build(self) -> Result<PartitionPipeline> {
        let batch = self.batch.clone();
        let config = self.build_config().map_err(DatasetError::Config)?;
        Ok(PartitionPipeline::from_config(config)?.with_batch_config(batch))
    }

    /// Build a [`DatasetBuilder`] over the configured partitions.
    pub fn build_dataset(self) -> Result<DatasetBuilder> {
        Ok(DatasetBuilder::new(self.build()?))
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "partitions={:?}, interval={}h, max_horizon={}h, epsilon={}, seed={}, threads={}",
            self.config.partitions,
            self.config.labels.future_time_interval_hours,
            self.config.labels.max_horizon_hours,
            self.config.window.epsilon,
            self.config.ordering.shuffle_seed,
            self.batch
                .num_threads
                .map_or_else(|| "auto".to_string(), |n| n.to_string())
        )
    }
}
