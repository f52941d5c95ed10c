//! Dataset Validation Module
//!
//! Checks on the artifacts of a partition, run after the fact so problems in
//! upstream tables surface before they reach training code.
//!
//! # Validation Categories
//!
//! 1. **Manifest**: unique output names, horizons within `[0, max_horizon]`,
//!    label class balance
//! 2. **Timelines**: every written event inside the ICU window, event order,
//!    minimum event count
//!
//! # Usage
//!
//! ```ignore
//! use decompensation_builder::validation::validate_samples;
//!
//! let result = validate_samples(&samples, 24);
//! if !result.is_valid() {
//!     for warning in result.warnings() {
//!         log::warn!("{}", warning);
//!     }
//! }
//! ```

use crate::export::SampleTriple;
use crate::labeling::LabelStats;
use crate::processor::MIN_EVENTS;
use crate::timeline::{EventTimeline, EventWindowFilter};
use std::collections::HashSet;
use std::fmt;

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data has serious issues (errors)
    Error(String),
}

impl ValidationLevel {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation result.
    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    /// Warnings as `check: message`.
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    /// Errors as `check: message`.
    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Check a partition's samples.
///
/// Errors: duplicate output names, horizons outside `[0, max_horizon]`.
/// Warning: every sample carries the same label.
pub fn validate_samples(samples: &[SampleTriple], max_horizon: u32) -> ValidationResult {
    let mut result = ValidationResult::new();

    let mut seen = HashSet::with_capacity(samples.len());
    let duplicates: Vec<&str> = samples
        .iter()
        .filter(|s| !seen.insert(s.stay.as_str()))
        .map(|s| s.stay.as_str())
        .collect();
    result.add(
        "unique_outputs",
        if duplicates.is_empty() {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!(
                "{} duplicate output names (first: {})",
                duplicates.len(),
                duplicates[0]
            ))
        },
    );

    let max_horizon = i64::from(max_horizon);
    let out_of_bounds: Vec<&SampleTriple> = samples
        .iter()
        .filter(|s| !(0..=max_horizon).contains(&s.window.hours()))
        .collect();
    result.add(
        "horizon_bounds",
        match out_of_bounds.first() {
            None => ValidationLevel::Valid,
            Some(first) => ValidationLevel::Error(format!(
                "{} horizons outside [0, {}] (first: {} at {})",
                out_of_bounds.len(),
                max_horizon,
                first.stay,
                first.window
            )),
        },
    );

    let stats = LabelStats::from_labels(samples.iter().map(|s| s.label));
    result.add(
        "label_classes",
        if stats.total > 0 && (stats.positive_count == 0 || stats.negative_count == 0) {
            ValidationLevel::Warning(format!(
                "all {} samples are {}",
                stats.total,
                stats.majority_class().name()
            ))
        } else {
            ValidationLevel::Valid
        },
    );

    result
}

/// Check a written timeline against the window of a stay of `los` hours.
///
/// Errors: events outside `(-epsilon, los + epsilon)`, fewer than the
/// minimum number of events. Warning: elapsed hours decrease somewhere.
pub fn validate_window(timeline: &EventTimeline, los: f64, epsilon: f64) -> ValidationResult {
    let mut result = ValidationResult::new();
    let filter = EventWindowFilter::new(epsilon);

    let outside = timeline
        .elapsed_hours()
        .filter(|&h| !filter.contains(h, los))
        .count();
    result.add(
        "window_bounds",
        if outside == 0 {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!("{outside} events outside (0, {los}) hours"))
        },
    );

    result.add(
        "min_events",
        if timeline.len() >= MIN_EVENTS {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Error(format!(
                "{} events, at least {} required",
                timeline.len(),
                MIN_EVENTS
            ))
        },
    );

    let hours: Vec<f64> = timeline.elapsed_hours().collect();
    result.add(
        "event_order",
        if hours.windows(2).all(|w| w[0] <= w[1]) {
            ValidationLevel::Valid
        } else {
            ValidationLevel::Warning("elapsed hours are not non-decreasing".to_string())
        },
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::{DecompensationLabel, PredictionWindow};
    use crate::timeline::TimelineEvent;

    fn sample(stay: &str, hours: i64, label: DecompensationLabel) -> SampleTriple {
        SampleTriple::new(stay, PredictionWindow::new(hours), label)
    }

    fn timeline(hours: &[f64]) -> EventTimeline {
        EventTimeline::new(["Hours", "HR"]).with_events(
            hours
                .iter()
                .map(|&h| TimelineEvent::from_values(h, &["80"]))
                .collect(),
        )
    }

    #[test]
    fn test_valid_samples() {
        let samples = vec![
            sample("1_episode1_timeseries.csv", 24, DecompensationLabel::Survives),
            sample("2_episode1_timeseries.csv", 10, DecompensationLabel::Dies),
        ];
        let result = validate_samples(&samples, 24);
        assert!(result.is_valid(), "{result}");
        assert_eq!(result.check_count(), 3);
    }

    #[test]
    fn test_duplicate_and_out_of_bounds() {
        let samples = vec![
            sample("1_episode1_timeseries.csv", 24, DecompensationLabel::Survives),
            sample("1_episode1_timeseries.csv", 25, DecompensationLabel::Dies),
            sample("2_episode1_timeseries.csv", -3, DecompensationLabel::Dies),
        ];
        let result = validate_samples(&samples, 24);
        assert!(result.has_errors());
        let errors = result.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("unique_outputs"));
        assert!(errors[1].contains("2 horizons outside [0, 24]"));
    }

    #[test]
    fn test_single_class_is_warning() {
        let samples = vec![sample("1_episode1_timeseries.csv", 24, DecompensationLabel::Survives)];
        let result = validate_samples(&samples, 24);
        assert!(!result.has_errors());
        assert_eq!(result.warnings(), vec!["label_classes: all 1 samples are Survives"]);

        assert!(validate_samples(&[], 24).is_valid());
    }

    #[test]
    fn test_validate_window() {
        assert!(validate_window(&timeline(&[0.0, 1.0, 48.0]), 48.5, 1e-6).is_valid());

        let result = validate_window(&timeline(&[-1.0, 3.0, 2.0]), 48.0, 1e-6);
        assert!(result.has_errors());
        assert!(result.has_warnings());
        assert_eq!(result.passed_count(), 1);

        let result = validate_window(&timeline(&[1.0]), 48.0, 1e-6);
        assert_eq!(result.errors(), vec!["min_events: 1 events, at least 2 required"]);
    }
}
