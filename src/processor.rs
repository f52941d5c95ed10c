//! Per-stay processing: join, window, label, export.
//!
//! # Flow
//!
//! ```text
//! label file ──┐
//!              ├─ join ─> Stay ─> LabelDeriver ─> (t, y)
//! stays.csv ───┘                        │
//! timeline ───────> EventWindowFilter ──┴─> minimum-data rule ─> export
//! ```
//!
//! Every step that lacks data yields a [`SkipReason`]; the stay is logged
//! and processing continues. Anything else is a fatal [`DatasetError`].

use crate::config::DecompensationConfig;
use crate::error::{DatasetError, Result, SkipReason};
use crate::export::{SampleTriple, TimelineExporter};
use crate::labeling::{LabelDeriver, LabeledWindow};
use crate::source::{EpisodeRef, StaySource, SubjectStays};
use crate::stay::{Stay, StayRecord};
use crate::timeline::{EventTimeline, EventWindowFilter};

/// Minimum number of in-window events for a stay to become a sample.
pub const MIN_EVENTS: usize = 2;

/// A stay that did not produce a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipDiagnostic {
    pub subject: String,
    pub timeseries_file: String,
    pub reason: SkipReason,
}

impl SkipDiagnostic {
    fn new(episode: &EpisodeRef, reason: SkipReason) -> Self {
        Self {
            subject: episode.subject.clone(),
            timeseries_file: episode.timeseries_file.clone(),
            reason,
        }
    }
}

/// Outcome of processing one episode.
#[derive(Debug, Clone, PartialEq)]
pub enum StayOutcome {
    Accepted(SampleTriple),
    Skipped(SkipDiagnostic),
}

impl StayOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, StayOutcome::Accepted(_))
    }
}

/// Turns one episode into a sample or a skip.
#[derive(Debug, Clone, Default)]
pub struct StayProcessor {
    filter: EventWindowFilter,
    deriver: LabelDeriver,
}

impl StayProcessor {
    pub fn new(filter: EventWindowFilter, deriver: LabelDeriver) -> Self {
        Self { filter, deriver }
    }

    pub fn from_config(config: &DecompensationConfig) -> Self {
        Self::new(
            EventWindowFilter::new(config.window.epsilon),
            LabelDeriver::new(config.labels.clone()),
        )
    }

    pub fn filter(&self) -> &EventWindowFilter {
        &self.filter
    }

    pub fn deriver(&self) -> &LabelDeriver {
        &self.deriver
    }

    /// Window and label a joined stay without touching the filesystem.
    ///
    /// Applies, in order: length-of-stay check, window filter, label
    /// derivation, minimum-data rule.
    pub fn evaluate(
        &self,
        stay: &Stay,
        timeline: EventTimeline,
    ) -> std::result::Result<(EventTimeline, LabeledWindow), SkipReason> {
        let los = stay
            .length_of_stay_hours()
            .ok_or(SkipReason::MissingLengthOfStay)?;
        let filtered = self.filter.apply(timeline, los)?;
        let labeled = self.deriver.derive(stay)?;
        check_min_data(&filtered, &labeled)?;
        Ok((filtered, labeled))
    }

    /// Process one episode of a subject.
    ///
    /// `stays` is the subject's stays table, loaded once per subject.
    pub fn process_episode<S: StaySource + ?Sized>(
        &self,
        source: &S,
        partition: &str,
        stays: &[StayRecord],
        episode: &EpisodeRef,
        exporter: &TimelineExporter,
    ) -> Result<StayOutcome> {
        let Some(label) = source.load_label(partition, episode)? else {
            return Ok(skipped(episode, SkipReason::EmptyLabelRecord));
        };
        if label.length_of_stay_days.map_or(true, f64::is_nan) {
            return Ok(skipped(episode, SkipReason::MissingLengthOfStay));
        }

        let record = stays
            .iter()
            .find(|record| record.icustay_id == label.icustay_id)
            .ok_or_else(|| DatasetError::UnknownStay {
                subject: episode.subject.clone(),
                icustay_id: label.icustay_id.0,
            })?;
        let stay = Stay::join(&label, record);

        let timeline = source.load_timeline(partition, episode)?;
        let (filtered, labeled) = match self.evaluate(&stay, timeline) {
            Ok(result) => result,
            Err(reason) => return Ok(skipped(episode, reason)),
        };

        let file_name = episode.output_file_name();
        exporter.export(&file_name, &filtered)?;
        log::debug!(
            "Accepted {} (stay {}): t={} y={}",
            file_name,
            stay.id,
            labeled.window,
            labeled.label.as_int()
        );
        Ok(StayOutcome::Accepted(SampleTriple::new(
            file_name,
            labeled.window,
            labeled.label,
        )))
    }

    /// Process every episode of a subject, in listing order.
    pub fn process_subject<S: StaySource + ?Sized>(
        &self,
        source: &S,
        partition: &str,
        subject: &SubjectStays,
        exporter: &TimelineExporter,
    ) -> Result<Vec<StayOutcome>> {
        let stays = source.load_stay_metadata(partition, &subject.subject)?;
        subject
            .episodes
            .iter()
            .map(|episode| self.process_episode(source, partition, &stays, episode, exporter))
            .collect()
    }
}

/// Reject windows with a single event, or whose second event falls after `t`.
fn check_min_data(
    filtered: &EventTimeline,
    labeled: &LabeledWindow,
) -> std::result::Result<(), SkipReason> {
    let events = filtered.events();
    if events.len() < MIN_EVENTS || events[1].elapsed_hours > labeled.window.period_length() {
        return Err(SkipReason::InsufficientData);
    }
    Ok(())
}

fn skipped(episode: &EpisodeRef, reason: SkipReason) -> StayOutcome {
    log::warn!(
        "({}) {} {}",
        reason.message(),
        episode.subject,
        episode.timeseries_file
    );
    StayOutcome::Skipped(SkipDiagnostic::new(episode, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::DecompensationLabel;
    use crate::source::MemorySource;
    use crate::stay::{LabelRecord, StayId};
    use crate::timeline::TimelineEvent;
    use chrono::{Duration, NaiveDateTime};
    use std::fs;
    use tempfile::TempDir;

    fn intime() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2150-03-01 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn timeline(hours: &[f64]) -> EventTimeline {
        EventTimeline::new(["Hours", "HR"]).with_events(
            hours
                .iter()
                .map(|&h| TimelineEvent::from_values(h, &["80"]))
                .collect(),
        )
    }

    fn stay(los_hours: Option<f64>, died_after: Option<i64>, mortality: bool) -> Stay {
        Stay::new(
            StayId(1),
            intime(),
            died_after.map(|h| intime() + Duration::hours(h)),
            los_hours,
            mortality,
        )
    }

    #[test]
    fn test_evaluate_accepts_and_filters() {
        let processor = StayProcessor::default();
        let (filtered, labeled) = processor
            .evaluate(&stay(Some(50.0), Some(10), true), timeline(&[-2.0, 0.5, 3.0, 60.0]))
            .unwrap();
        assert_eq!(filtered.elapsed_hours().collect::<Vec<_>>(), vec![0.5, 3.0]);
        assert_eq!(labeled.window.hours(), 10);
        assert_eq!(labeled.label, DecompensationLabel::Dies);
    }

    #[test]
    fn test_evaluate_skip_reasons() {
        let processor = StayProcessor::default();
        let cases = [
            (stay(None, None, false), timeline(&[0.5, 1.0]), SkipReason::MissingLengthOfStay),
            (stay(Some(f64::NAN), None, false), timeline(&[0.5]), SkipReason::MissingLengthOfStay),
            (stay(Some(5.0), None, false), timeline(&[6.0, 7.0]), SkipReason::EmptyWindow),
            (stay(Some(50.0), None, false), timeline(&[0.5]), SkipReason::InsufficientData),
            // second event at 30h lies after t = 24
            (stay(Some(50.0), None, false), timeline(&[0.5, 30.0]), SkipReason::InsufficientData),
        ];
        for (stay, timeline, expected) in cases {
            assert_eq!(processor.evaluate(&stay, timeline).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_second_event_at_horizon_is_accepted() {
        let processor = StayProcessor::default();
        let (_, labeled) = processor
            .evaluate(&stay(Some(50.0), None, true), timeline(&[0.5, 24.0]))
            .unwrap();
        assert_eq!(labeled.window.hours(), 24);
        assert_eq!(labeled.label, DecompensationLabel::Survives);
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_subject("test", "42", vec![StayRecord::new(7, intime(), None)])
            .with_episode(
                "test",
                "42",
                "episode1_timeseries.csv",
                timeline(&[0.0, 1.0, 30.0]),
                Some(LabelRecord::new(7, false, Some(1.0))),
            )
            .with_episode(
                "test",
                "42",
                "episode2_timeseries.csv",
                timeline(&[0.0, 1.0]),
                None,
            )
    }

    #[test]
    fn test_process_subject() {
        let dir = TempDir::new().unwrap();
        let exporter = TimelineExporter::new(dir.path());
        let source = source();
        let subject = &source.list_stays("test").unwrap()[0];

        let outcomes = StayProcessor::default()
            .process_subject(&source, "test", subject, &exporter)
            .unwrap();
        assert_eq!(
            outcomes[0],
            StayOutcome::Accepted(SampleTriple::new(
                "42_episode1_timeseries.csv",
                crate::labeling::PredictionWindow::new(24),
                DecompensationLabel::Survives,
            ))
        );
        assert_eq!(
            outcomes[1],
            StayOutcome::Skipped(SkipDiagnostic {
                subject: "42".to_string(),
                timeseries_file: "episode2_timeseries.csv".to_string(),
                reason: SkipReason::EmptyLabelRecord,
            })
        );

        let written = fs::read_to_string(dir.path().join("42_episode1_timeseries.csv")).unwrap();
        assert_eq!(written, "Hours,HR\n0,80\n1,80\n");
        assert!(!dir.path().join("42_episode2_timeseries.csv").exists());
    }

    #[test]
    fn test_unknown_stay_is_fatal() {
        let dir = TempDir::new().unwrap();
        let exporter = TimelineExporter::new(dir.path());
        let source = MemorySource::new()
            .with_subject("test", "42", vec![StayRecord::new(7, intime(), None)])
            .with_episode(
                "test",
                "42",
                "episode1_timeseries.csv",
                timeline(&[0.0, 1.0]),
                Some(LabelRecord::new(8, false, Some(1.0))),
            );
        let subject = &source.list_stays("test").unwrap()[0];

        let err = StayProcessor::default()
            .process_subject(&source, "test", subject, &exporter)
            .unwrap_err();
        assert!(matches!(err, DatasetError::UnknownStay { icustay_id: 8, .. }));
    }
}
