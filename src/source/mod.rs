//! Data sources for per-subject ICU records.
//!
//! The dataset builder never walks directories itself. It asks a
//! [`StaySource`] for the subjects of a partition and loads each table through
//! typed methods, so the same pipeline runs against the on-disk layout
//! ([`DirectorySource`]) or in-memory fixtures ([`MemorySource`]).
//!
//! # On-disk layout
//!
//! ```text
//! <root>/<partition>/<subject>/stays.csv
//!                             /episode1_timeseries.csv
//!                             /episode1.csv            (label file)
//! ```

pub mod directory;
pub mod memory;

pub use directory::DirectorySource;
pub use memory::MemorySource;

use crate::error::Result;
use crate::stay::{LabelRecord, StayRecord};
use crate::timeline::EventTimeline;

/// Marker that identifies timeline files among a subject's files.
pub const TIMESERIES_MARKER: &str = "timeseries";

/// One timeline file of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeRef {
    /// Subject (patient directory) identifier.
    pub subject: String,

    /// Timeline file name, e.g. `episode1_timeseries.csv`.
    pub timeseries_file: String,
}

impl EpisodeRef {
    pub fn new(subject: impl Into<String>, timeseries_file: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            timeseries_file: timeseries_file.into(),
        }
    }

    /// Label file paired with this timeline (`_timeseries` removed).
    pub fn label_file(&self) -> String {
        self.timeseries_file.replace("_timeseries", "")
    }

    /// Name of the filtered timeline in the output directory.
    pub fn output_file_name(&self) -> String {
        format!("{}_{}", self.subject, self.timeseries_file)
    }
}

/// A subject and its timeline files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectStays {
    pub subject: String,
    pub episodes: Vec<EpisodeRef>,
}

/// Typed access to the per-subject tables of a partition.
///
/// Implementations must be shareable across worker threads.
pub trait StaySource: Sync {
    /// Subjects of a partition with their timeline files, in a stable order.
    fn list_stays(&self, partition: &str) -> Result<Vec<SubjectStays>>;

    /// Rows of a subject's stays table.
    fn load_stay_metadata(&self, partition: &str, subject: &str) -> Result<Vec<StayRecord>>;

    /// The raw timeline of an episode.
    fn load_timeline(&self, partition: &str, episode: &EpisodeRef) -> Result<EventTimeline>;

    /// First row of an episode's label file, or `None` if it has no rows.
    fn load_label(&self, partition: &str, episode: &EpisodeRef) -> Result<Option<LabelRecord>>;
}
