//! Data Export Module
//!
//! Writes the artifacts of a partition for downstream training code.
//!
//! # Output Layout
//!
//! ```text
//! <output>/<partition>/<subject>_<timeline file>   filtered timelines
//! <output>/<partition>/listfile.csv                manifest
//! <output>/<partition>/summary.json                optional summary
//! ```
//!
//! The manifest has one row per accepted stay:
//!
//! ```text
//! stay,period_length,y_true
//! 10011_episode1_timeseries.csv,24.000000,0
//! ```

use crate::config::{ExperimentMetadata, OrderingPolicy};
use crate::error::{DatasetError, Result};
use crate::labeling::{DecompensationLabel, LabelStats, PredictionWindow};
use crate::timeline::EventTimeline;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Manifest file name inside a partition's output directory.
pub const MANIFEST_FILE: &str = "listfile.csv";

/// Manifest column names.
pub const MANIFEST_HEADER: [&str; 3] = ["stay", "period_length", "y_true"];

/// Summary file name inside a partition's output directory.
pub const SUMMARY_FILE: &str = "summary.json";

/// One dataset sample: filtered timeline file, horizon, and label.
///
/// Ordering compares the file name first, then the horizon, then the label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleTriple {
    /// File name of the filtered timeline, relative to the partition directory.
    pub stay: String,
    pub window: PredictionWindow,
    pub label: DecompensationLabel,
}

impl SampleTriple {
    pub fn new(
        stay: impl Into<String>,
        window: PredictionWindow,
        label: DecompensationLabel,
    ) -> Self {
        Self {
            stay: stay.into(),
            window,
            label,
        }
    }

    /// Manifest fields: file name, horizon with six decimals, integer label.
    pub fn manifest_row(&self) -> [String; 3] {
        [
            self.stay.clone(),
            format!("{:.6}", self.window.period_length()),
            self.label.as_int().to_string(),
        ]
    }
}

/// Writes filtered timelines into a partition's output directory.
#[derive(Debug, Clone)]
pub struct TimelineExporter {
    output_dir: PathBuf,
}

impl TimelineExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `timeline` (header included) as `file_name` and return its path.
    ///
    /// The file handle is closed before returning.
    pub fn export(&self, file_name: &str, timeline: &EventTimeline) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let file = File::create(&path).map_err(|e| DatasetError::io(&path, e))?;
        timeline
            .write_csv(file)
            .map_err(|e| DatasetError::csv(&path, e))?;
        log::debug!("Exported timeline: {} [{} events]", path.display(), timeline.len());
        Ok(path)
    }
}

/// Write a manifest to `path`.
pub fn write_manifest<P: AsRef<Path>>(path: P, samples: &[SampleTriple]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
    writer
        .write_record(MANIFEST_HEADER)
        .map_err(|e| DatasetError::csv(path, e))?;
    for sample in samples {
        writer
            .write_record(sample.manifest_row())
            .map_err(|e| DatasetError::csv(path, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(path, e))?;
    Ok(())
}

/// Read a manifest written by [`write_manifest`].
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<SampleTriple>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::csv(path, e))?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DatasetError::csv(path, e))?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let period: f64 = field(1).parse().map_err(|_| {
            DatasetError::generic(format!("bad period_length {:?} in {}", field(1), path.display()))
        })?;
        let label = field(2)
            .parse::<u8>()
            .ok()
            .and_then(DecompensationLabel::from_int)
            .ok_or_else(|| {
                DatasetError::generic(format!("bad y_true {:?} in {}", field(2), path.display()))
            })?;

        samples.push(SampleTriple::new(
            field(0),
            PredictionWindow::new(period as i64),
            label,
        ));
    }
    Ok(samples)
}

/// Summary of a partition export.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub partition: String,
    pub n_samples: usize,
    pub n_skipped: usize,
    pub skip_counts: BTreeMap<String, usize>,
    pub labels: LabelStats,
    /// Larger class over smaller class; absent when one class is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imbalance_ratio: Option<f64>,
    pub ordering: OrderingPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
    pub export_timestamp: String,
}

/// Write `summary` as pretty JSON into `output_dir`.
pub fn write_summary<P: AsRef<Path>>(
    output_dir: P,
    summary: &PartitionSummary,
) -> Result<PathBuf> {
    let path = output_dir.as_ref().join(SUMMARY_FILE);
    let file = File::create(&path).map_err(|e| DatasetError::io(&path, e))?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(path)
}
