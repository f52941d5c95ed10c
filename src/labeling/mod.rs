//! Label Generation for Decompensation Prediction
//!
//! Converts a stay's admission and death timestamps into a supervised target:
//! given measurements up to hour `t`, does the patient die within the next
//! `future_time_interval` hours?
//!
//! # Overview
//!
//! ```text
//! admission            t                      t + interval
//!     |----------------|--------------------------|
//!      observation      death here → label 1
//! ```
//!
//! The horizon `t` is truncated so that it never exceeds the maximum
//! observation window (24h by default), the length of stay, or the time until
//! death. See [`LabelDeriver`] for the exact rules.
//!
//! # Example
//!
//! ```
//! use decompensation_builder::labeling::{DecompensationLabel, LabelConfig, LabelDeriver};
//!
//! let deriver = LabelDeriver::new(LabelConfig::default());
//!
//! // Died 10 hours after admission, stayed 50 hours on record.
//! let window = deriver.horizon(50.0, 10.0);
//! assert_eq!(window.hours(), 10);
//! assert_eq!(deriver.label(true, 10.0, window), DecompensationLabel::Dies);
//! ```

pub mod decompensation;

pub use decompensation::{hours_between, LabelDeriver, LabeledWindow, DEATH_SENTINEL_HOURS};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Core Types
// ============================================================================

/// Binary decompensation outcome at the prediction horizon.
///
/// # Example
///
/// ```
/// use decompensation_builder::labeling::DecompensationLabel;
///
/// assert_eq!(DecompensationLabel::Dies.as_int(), 1);
/// assert_eq!(DecompensationLabel::from_int(0), Some(DecompensationLabel::Survives));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DecompensationLabel {
    /// No death within the future interval after the horizon.
    Survives = 0,

    /// Death occurs within the future interval after the horizon.
    Dies = 1,
}

impl DecompensationLabel {
    /// Integer representation written to the manifest.
    #[inline]
    pub fn as_int(&self) -> u8 {
        *self as u8
    }

    /// Create from integer representation.
    pub fn from_int(value: u8) -> Option<Self> {
        match value {
            0 => Some(DecompensationLabel::Survives),
            1 => Some(DecompensationLabel::Dies),
            _ => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, DecompensationLabel::Dies)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DecompensationLabel::Survives => "Survives",
            DecompensationLabel::Dies => "Dies",
        }
    }
}

impl From<bool> for DecompensationLabel {
    fn from(dies: bool) -> Self {
        if dies {
            DecompensationLabel::Dies
        } else {
            DecompensationLabel::Survives
        }
    }
}

impl fmt::Display for DecompensationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Prediction horizon: whole hours since admission at which a sample is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredictionWindow {
    hours: i64,
}

impl PredictionWindow {
    pub fn new(hours: i64) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> i64 {
        self.hours
    }

    /// Horizon as the manifest's `period_length` value.
    pub fn period_length(&self) -> f64 {
        self.hours as f64
    }
}

impl fmt::Display for PredictionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours)
    }
}

/// Configuration for label derivation.
///
/// # Example
///
/// ```
/// use decompensation_builder::labeling::LabelConfig;
///
/// let config = LabelConfig::default();
/// assert_eq!(config.future_time_interval_hours, 24.0);
/// assert_eq!(config.max_horizon_hours, 24);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Width of the look-ahead interval after the horizon, in hours.
    pub future_time_interval_hours: f64,

    /// Upper bound on the horizon, in hours.
    pub max_horizon_hours: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            future_time_interval_hours: 24.0,
            max_horizon_hours: 24,
        }
    }
}

impl LabelConfig {
    pub fn new(future_time_interval_hours: f64, max_horizon_hours: u32) -> Self {
        Self {
            future_time_interval_hours,
            max_horizon_hours,
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !self.future_time_interval_hours.is_finite() || self.future_time_interval_hours <= 0.0
        {
            return Err("future_time_interval_hours must be a positive number".to_string());
        }
        if self.max_horizon_hours == 0 {
            return Err("max_horizon_hours must be > 0".to_string());
        }
        Ok(())
    }
}

/// Label statistics for a set of samples.
///
/// Decompensation datasets are heavily skewed toward survival; these numbers
/// are logged per partition so the skew is visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelStats {
    /// Total number of labels.
    pub total: usize,

    /// Number of `Dies` labels.
    pub positive_count: usize,

    /// Number of `Survives` labels.
    pub negative_count: usize,
}

impl LabelStats {
    /// Count labels.
    pub fn from_labels<I: IntoIterator<Item = DecompensationLabel>>(labels: I) -> Self {
        let mut stats = Self::default();
        for label in labels {
            stats.total += 1;
            if label.is_positive() {
                stats.positive_count += 1;
            } else {
                stats.negative_count += 1;
            }
        }
        stats
    }

    /// Fraction of positive labels in `[0.0, 1.0]`.
    pub fn positive_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.positive_count as f64 / self.total as f64
        }
    }

    /// Get the majority class.
    pub fn majority_class(&self) -> DecompensationLabel {
        if self.positive_count > self.negative_count {
            DecompensationLabel::Dies
        } else {
            DecompensationLabel::Survives
        }
    }

    /// Ratio of the larger class to the smaller one.
    ///
    /// Infinite when one class is absent.
    pub fn imbalance_ratio(&self) -> f64 {
        let max = self.positive_count.max(self.negative_count) as f64;
        let min = self.positive_count.min(self.negative_count) as f64;
        if min == 0.0 {
            f64::INFINITY
        } else {
            max / min
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
