//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use decompensation_builder::prelude::*;
//!
//! let pipeline = PartitionPipeline::from_config(DecompensationConfig::default())?;
//! let output = pipeline.run(&DirectorySource::new("data/root"), "test", "data/out")?;
//! ```
//!
//! # What's Included
//!
//! ## Pipeline
//! - [`PipelineBuilder`], [`PartitionPipeline`], [`DatasetBuilder`]
//! - [`DecompensationConfig`] and its sections
//!
//! ## Sources
//! - [`StaySource`] with [`DirectorySource`] and [`MemorySource`]
//!
//! ## Samples
//! - [`SampleTriple`], [`DecompensationLabel`], [`PredictionWindow`]
//! - [`StayOutcome`], [`SkipDiagnostic`], [`SkipReason`]

// ============================================================================
// Pipeline
// ============================================================================

pub use crate::batch::{BatchConfig, BatchOutput, ConsoleProgress, ProgressCallback, ProgressInfo};
pub use crate::builder::PipelineBuilder;
pub use crate::config::{
    DecompensationConfig, ExperimentMetadata, OrderingConfig, OrderingPolicy, WindowConfig,
};
pub use crate::pipeline::{DatasetBuilder, PartitionOutput, PartitionPipeline};

// ============================================================================
// Sources and records
// ============================================================================

pub use crate::source::{DirectorySource, EpisodeRef, MemorySource, StaySource, SubjectStays};
pub use crate::stay::{LabelRecord, Stay, StayId, StayRecord};
pub use crate::timeline::{EventTimeline, EventWindowFilter, TimelineEvent};

// ============================================================================
// Labeling and samples
// ============================================================================

pub use crate::export::{SampleTriple, TimelineExporter};
pub use crate::labeling::{
    DecompensationLabel, LabelConfig, LabelDeriver, LabelStats, PredictionWindow,
};
pub use crate::processor::{SkipDiagnostic, StayOutcome, StayProcessor};

// ============================================================================
// Errors and validation
// ============================================================================

pub use crate::error::{DatasetError, Result, SkipReason};
pub use crate::validation::{validate_samples, validate_window, ValidationResult};
