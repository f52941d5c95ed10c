//! Error types for dataset construction.
//!
//! Two kinds of failure exist while building a dataset:
//!
//! - **Fatal** ([`DatasetError`]): I/O failures, malformed tables, unparsable
//!   timestamps. These abort the run and propagate to the caller.
//! - **Per-stay skips** ([`SkipReason`]): a stay lacks the data needed to
//!   produce a sample. These are logged and the run continues.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Fatal errors that abort dataset construction.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// A file or directory could not be read, created, or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV table could not be parsed or written.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A timestamp column held a value that is not a recognised date-time.
    #[error("invalid timestamp {value:?} in column {column}")]
    InvalidTimestamp { column: &'static str, value: String },

    /// The first column of a timeline row is not a number.
    #[error("invalid elapsed-hours value {value:?} on row {row} of {source_name}")]
    InvalidEventTime {
        source_name: String,
        row: usize,
        value: String,
    },

    /// A label file references an ICU stay missing from the stays table.
    #[error("ICU stay {icustay_id} not found in stays table of subject {subject}")]
    UnknownStay { subject: String, icustay_id: u64 },

    /// Serialization of a summary or configuration failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Anything else.
    #[error("{0}")]
    Generic(String),
}

impl DatasetError {
    /// Build a free-form error.
    pub fn generic(msg: impl Into<String>) -> Self {
        DatasetError::Generic(msg.into())
    }

    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wrap a CSV error with the path it concerns.
    pub fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        DatasetError::Csv {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Why a stay was left out of the dataset.
///
/// Skips are never fatal: the stay produces no output file and no manifest
/// row, and a diagnostic naming the subject and timeline file is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum SkipReason {
    /// Length of stay is absent or NaN.
    MissingLengthOfStay,
    /// No events fall inside the ICU window.
    EmptyWindow,
    /// Fewer than two events in the window, or the second event lies after the horizon.
    InsufficientData,
    /// The label file has no rows.
    EmptyLabelRecord,
}

impl SkipReason {
    /// Short diagnostic message.
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::MissingLengthOfStay => "length of stay is missing",
            SkipReason::EmptyWindow => "no events in ICU",
            SkipReason::InsufficientData => "not enough data",
            SkipReason::EmptyLabelRecord => "empty label file",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
