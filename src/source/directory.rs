//! Filesystem-backed stay source.

use super::{EpisodeRef, StaySource, SubjectStays, TIMESERIES_MARKER};
use crate::error::{DatasetError, Result};
use crate::stay::{parse_timestamp, LabelRecord, StayRecord};
use crate::timeline::EventTimeline;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of a subject's stays table.
pub const STAYS_FILE: &str = "stays.csv";

#[derive(Debug, Deserialize)]
struct StayRow {
    #[serde(rename = "ICUSTAY_ID")]
    icustay_id: u64,
    #[serde(rename = "INTIME")]
    intime: String,
    #[serde(rename = "DEATHTIME", default)]
    deathtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelRow {
    #[serde(rename = "Icustay")]
    icustay: u64,
    #[serde(rename = "Mortality")]
    mortality: f64,
    #[serde(rename = "Length of Stay", default)]
    length_of_stay: Option<f64>,
}

/// Reads subjects from `<root>/<partition>/<subject>/`.
///
/// Subject directories are recognised by all-digit names; timeline files by
/// the `timeseries` marker in their name. Both are returned sorted by name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn subject_dir(&self, partition: &str, subject: &str) -> PathBuf {
        self.root.join(partition).join(subject)
    }

    fn sorted_names(dir: &Path, keep: impl Fn(&str, &Path) -> bool) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))? {
            let entry = entry.map_err(|e| DatasetError::io(dir, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if keep(&name, &entry.path()) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn is_subject_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

impl StaySource for DirectorySource {
    fn list_stays(&self, partition: &str) -> Result<Vec<SubjectStays>> {
        let partition_dir = self.root.join(partition);
        let subjects =
            Self::sorted_names(&partition_dir, |name, path| is_subject_name(name) && path.is_dir())?;

        subjects
            .into_iter()
            .map(|subject| {
                let dir = partition_dir.join(&subject);
                let episodes = Self::sorted_names(&dir, |name, _| name.contains(TIMESERIES_MARKER))?
                    .into_iter()
                    .map(|file| EpisodeRef::new(subject.clone(), file))
                    .collect();
                Ok(SubjectStays { subject, episodes })
            })
            .collect()
    }

    fn load_stay_metadata(&self, partition: &str, subject: &str) -> Result<Vec<StayRecord>> {
        let path = self.subject_dir(partition, subject).join(STAYS_FILE);
        let mut reader = csv::Reader::from_path(&path).map_err(|e| DatasetError::csv(&path, e))?;

        let mut records = Vec::new();
        for row in reader.deserialize::<StayRow>() {
            let row = row.map_err(|e| DatasetError::csv(&path, e))?;
            let intime = parse_timestamp("INTIME", &row.intime)?.ok_or_else(|| {
                DatasetError::InvalidTimestamp {
                    column: "INTIME",
                    value: row.intime.clone(),
                }
            })?;
            let deathtime = match row.deathtime.as_deref() {
                Some(value) => parse_timestamp("DEATHTIME", value)?,
                None => None,
            };
            records.push(StayRecord::new(row.icustay_id, intime, deathtime));
        }
        Ok(records)
    }

    fn load_timeline(&self, partition: &str, episode: &EpisodeRef) -> Result<EventTimeline> {
        let path = self
            .subject_dir(partition, &episode.subject)
            .join(&episode.timeseries_file);
        EventTimeline::from_path(path)
    }

    fn load_label(&self, partition: &str, episode: &EpisodeRef) -> Result<Option<LabelRecord>> {
        let path = self
            .subject_dir(partition, &episode.subject)
            .join(episode.label_file());
        let mut reader = csv::Reader::from_path(&path).map_err(|e| DatasetError::csv(&path, e))?;

        match reader.deserialize::<LabelRow>().next() {
            None => Ok(None),
            Some(row) => {
                let row = row.map_err(|e| DatasetError::csv(&path, e))?;
                Ok(Some(LabelRecord::new(
                    row.icustay,
                    row.mortality as i64 != 0,
                    row.length_of_stay,
                )))
            }
        }
    }
}
