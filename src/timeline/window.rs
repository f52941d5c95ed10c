//! Trimming a timeline to the in-ICU window.
//!
//! An event is kept when its elapsed time lies strictly inside
//! `(-ε, los + ε)`. The tolerance absorbs rounding in the upstream export,
//! where an admission-time measurement may be stored as `-0.0000001`.

use super::EventTimeline;
use crate::error::SkipReason;

/// Default tolerance around the window bounds, in hours.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Keeps only events recorded while the patient was in the ICU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWindowFilter {
    epsilon: f64,
}

impl Default for EventWindowFilter {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl EventWindowFilter {
    /// Create a filter with the given tolerance in hours.
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Whether an elapsed time falls inside the window for a stay of `los` hours.
    #[inline]
    pub fn contains(&self, elapsed_hours: f64, los: f64) -> bool {
        -self.epsilon < elapsed_hours && elapsed_hours < los + self.epsilon
    }

    /// Drop events outside the window.
    ///
    /// Relative order and row contents are preserved. Returns
    /// [`SkipReason::EmptyWindow`] when nothing survives.
    pub fn apply(
        &self,
        mut timeline: EventTimeline,
        los: f64,
    ) -> Result<EventTimeline, SkipReason> {
        timeline.retain(|event| self.contains(event.elapsed_hours, los));
        if timeline.is_empty() {
            Err(SkipReason::EmptyWindow)
        } else {
            Ok(timeline)
        }
    }
}
