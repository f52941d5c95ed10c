//! In-memory stay source for tests and programmatic use.

use super::{EpisodeRef, StaySource, SubjectStays};
use crate::error::{DatasetError, Result};
use crate::stay::{LabelRecord, StayRecord};
use crate::timeline::EventTimeline;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct EpisodeData {
    timeline: EventTimeline,
    label: Option<LabelRecord>,
}

#[derive(Debug, Clone, Default)]
struct SubjectData {
    stays: Vec<StayRecord>,
    episodes: BTreeMap<String, EpisodeData>,
}

/// Stay source backed by in-memory tables.
///
/// Subjects and episodes are listed in key order, like [`super::DirectorySource`].
///
/// # Example
///
/// ```ignore
/// let source = MemorySource::new()
///     .with_subject("train", "10", vec![stay_record])
///     .with_episode("train", "10", "episode1_timeseries.csv", timeline, Some(label));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    partitions: BTreeMap<String, BTreeMap<String, SubjectData>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or extend) a subject's stays table.
    pub fn with_subject(
        mut self,
        partition: &str,
        subject: &str,
        stays: Vec<StayRecord>,
    ) -> Self {
        self.subject_mut(partition, subject).stays.extend(stays);
        self
    }

    /// Add an episode. `label: None` models a label file without rows.
    pub fn with_episode(
        mut self,
        partition: &str,
        subject: &str,
        timeseries_file: &str,
        timeline: EventTimeline,
        label: Option<LabelRecord>,
    ) -> Self {
        self.subject_mut(partition, subject)
            .episodes
            .insert(timeseries_file.to_string(), EpisodeData { timeline, label });
        self
    }

    /// Number of episodes across all subjects of a partition.
    pub fn episode_count(&self, partition: &str) -> usize {
        self.partitions
            .get(partition)
            .map(|subjects| subjects.values().map(|s| s.episodes.len()).sum())
            .unwrap_or(0)
    }

    fn subject_mut(&mut self, partition: &str, subject: &str) -> &mut SubjectData {
        self.partitions
            .entry(partition.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default()
    }

    fn subject(&self, partition: &str, subject: &str) -> Result<&SubjectData> {
        self.partitions
            .get(partition)
            .and_then(|subjects| subjects.get(subject))
            .ok_or_else(|| {
                DatasetError::generic(format!("unknown subject {subject} in partition {partition}"))
            })
    }

    fn episode(&self, partition: &str, episode: &EpisodeRef) -> Result<&EpisodeData> {
        self.subject(partition, &episode.subject)?
            .episodes
            .get(&episode.timeseries_file)
            .ok_or_else(|| {
                DatasetError::generic(format!(
                    "unknown timeline {} for subject {}",
                    episode.timeseries_file, episode.subject
                ))
            })
    }
}

impl StaySource for MemorySource {
    fn list_stays(&self, partition: &str) -> Result<Vec<SubjectStays>> {
        let subjects = self
            .partitions
            .get(partition)
            .ok_or_else(|| DatasetError::generic(format!("unknown partition {partition}")))?;

        Ok(subjects
            .iter()
            .map(|(subject, data)| SubjectStays {
                subject: subject.clone(),
                episodes: data
                    .episodes
                    .keys()
                    .map(|file| EpisodeRef::new(subject.clone(), file.clone()))
                    .collect(),
            })
            .collect())
    }

    fn load_stay_metadata(&self, partition: &str, subject: &str) -> Result<Vec<StayRecord>> {
        Ok(self.subject(partition, subject)?.stays.clone())
    }

    fn load_timeline(&self, partition: &str, episode: &EpisodeRef) -> Result<EventTimeline> {
        Ok(self.episode(partition, episode)?.timeline.clone())
    }

    fn load_label(&self, partition: &str, episode: &EpisodeRef) -> Result<Option<LabelRecord>> {
        Ok(self.episode(partition, episode)?.label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineEvent;
    use chrono::NaiveDateTime;

    fn intime() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2150-03-01 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_memory_source_roundtrip() {
        let timeline = EventTimeline::new(["Hours", "HR"])
            .with_events(vec![TimelineEvent::from_values(0.5, &["80"])]);
        let source = MemorySource::new()
            .with_subject("test", "7", vec![StayRecord::new(1, intime(), None)])
            .with_episode(
                "test",
                "7",
                "episode1_timeseries.csv",
                timeline.clone(),
                Some(LabelRecord::new(1, false, Some(1.0))),
            )
            .with_episode("test", "7", "episode2_timeseries.csv", timeline.clone(), None);

        assert_eq!(source.episode_count("test"), 2);
        let subjects = source.list_stays("test").unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].episodes.len(), 2);

        let episode = &subjects[0].episodes[0];
        assert_eq!(source.load_timeline("test", episode).unwrap(), timeline);
        assert!(source.load_label("test", episode).unwrap().is_some());
        assert!(source
            .load_label("test", &subjects[0].episodes[1])
            .unwrap()
            .is_none());
        assert_eq!(source.load_stay_metadata("test", "7").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let source = MemorySource::new();
        assert!(source.list_stays("train").is_err());
        assert!(source.load_stay_metadata("train", "1").is_err());
    }
}
