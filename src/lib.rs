//! Decompensation Builder
//!
//! Builds the in-hospital decompensation prediction dataset from per-subject
//! ICU records.
//!
//! # Overview
//!
//! Each ICU stay with enough in-ICU measurements becomes one sample:
//!
//! - its event timeline, trimmed to the stay's ICU window, is written to the
//!   partition's output directory
//! - a horizon `t = min(24, floor(los), floor(time until death))` is derived
//! - the label says whether the patient died within 24 hours after `t`
//!
//! Samples are listed in a `listfile.csv` manifest per partition. Training
//! manifests are shuffled with a fixed seed; test manifests are sorted.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Decompensation Builder                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  source/     - Typed access to stays, timelines and label files │
//! │  timeline/   - Event timelines and the ICU window filter        │
//! │  labeling/   - Horizon and decompensation label derivation      │
//! │  processor   - One stay: join, window, label, export            │
//! │  batch       - Parallel subject processing                      │
//! │  pipeline    - Ordering, manifest and partition runs            │
//! │  export/     - Timeline files, manifest, summary                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use decompensation_builder::prelude::*;
//!
//! let builder = PipelineBuilder::new().build_dataset()?;
//! let outputs = builder.run(&DirectorySource::new("data/root"), "data/decompensation")?;
//! for output in &outputs {
//!     println!("{}: {} samples", output.partition, output.accepted_count());
//! }
//! ```

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod labeling;
pub mod pipeline;
pub mod prelude;
pub mod processor;
pub mod source;
pub mod stay;
pub mod timeline;
pub mod validation;

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{
    DecompensationConfig, ExperimentMetadata, OrderingConfig, OrderingPolicy, WindowConfig,
    DEFAULT_PARTITIONS, DEFAULT_SHUFFLE_SEED,
};

// Re-exports - Errors
pub use error::{DatasetError, Result, SkipReason};

// Re-exports - Records
pub use source::{DirectorySource, EpisodeRef, MemorySource, StaySource, SubjectStays};
pub use stay::{LabelRecord, Stay, StayId, StayRecord};
pub use timeline::{EventTimeline, EventWindowFilter, TimelineEvent, DEFAULT_EPSILON};

// Re-exports - Labeling
pub use labeling::{
    DecompensationLabel, LabelConfig, LabelDeriver, LabelStats, LabeledWindow, PredictionWindow,
};

// Re-exports - Processing
pub use batch::{BatchConfig, BatchOutput, BatchProcessor, ConsoleProgress, ProgressCallback};
pub use pipeline::{DatasetBuilder, PartitionOutput, PartitionPipeline};
pub use processor::{SkipDiagnostic, StayOutcome, StayProcessor};

// Re-exports - Export
pub use export::{SampleTriple, TimelineExporter, MANIFEST_FILE};

// Re-exports - Validation
pub use validation::{validate_samples, validate_window, ValidationLevel, ValidationResult};
