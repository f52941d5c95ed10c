//! Horizon and outcome derivation for one stay.
//!
//! # Rules
//!
//! ```text
//! time_until_death = deathtime - intime            (hours, or 1e18 if alive)
//! t                = min(max_horizon, floor(los), floor(time_until_death))
//! label            = 0                             if mortality == 0
//!                  = [time_until_death - t < interval]  otherwise
//! ```
//!
//! Timestamp differences go through chrono's `TimeDelta`, a fixed-precision
//! seconds + nanoseconds value, so no epoch arithmetic can overflow.

use super::{DecompensationLabel, LabelConfig, PredictionWindow};
use crate::error::SkipReason;
use crate::stay::Stay;
use chrono::NaiveDateTime;

/// Time until death used when no death is recorded, in hours.
pub const DEATH_SENTINEL_HOURS: f64 = 1e18;

const MICROS_PER_HOUR: f64 = 3_600_000_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hours from `start` to `end` (negative if `end` precedes `start`).
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end.signed_duration_since(start);
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / MICROS_PER_HOUR,
        // Spans beyond ~292k years overflow microseconds.
        None => delta.num_milliseconds() as f64 / MILLIS_PER_HOUR,
    }
}

/// Horizon and label for one stay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledWindow {
    pub window: PredictionWindow,
    pub label: DecompensationLabel,

    /// Hours between admission and death, or the sentinel.
    pub time_until_death_hours: f64,
}

/// Derives the prediction horizon and decompensation label of a stay.
#[derive(Debug, Clone, Default)]
pub struct LabelDeriver {
    config: LabelConfig,
}

impl LabelDeriver {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Hours between admission and death, or [`DEATH_SENTINEL_HOURS`] when alive.
    pub fn time_until_death(admitted_at: NaiveDateTime, died_at: Option<NaiveDateTime>) -> f64 {
        match died_at {
            Some(died_at) => hours_between(admitted_at, died_at),
            None => DEATH_SENTINEL_HOURS,
        }
    }

    /// Truncated horizon `min(max_horizon, floor(los), floor(time_until_death))`.
    pub fn horizon(&self, los: f64, time_until_death: f64) -> PredictionWindow {
        let hours = f64::from(self.config.max_horizon_hours)
            .min(los.floor())
            .min(time_until_death.floor());
        PredictionWindow::new(hours as i64)
    }

    /// Outcome at `window`.
    pub fn label(
        &self,
        mortality: bool,
        time_until_death: f64,
        window: PredictionWindow,
    ) -> DecompensationLabel {
        if !mortality {
            return DecompensationLabel::Survives;
        }
        let remaining = time_until_death - window.period_length();
        DecompensationLabel::from(remaining < self.config.future_time_interval_hours)
    }

    /// Horizon and label from raw stay attributes.
    ///
    /// Fails with [`SkipReason::MissingLengthOfStay`] when `los` is absent or NaN.
    pub fn derive_from(
        &self,
        admitted_at: NaiveDateTime,
        died_at: Option<NaiveDateTime>,
        los: Option<f64>,
        mortality: bool,
    ) -> Result<LabeledWindow, SkipReason> {
        let los = los
            .filter(|los| !los.is_nan())
            .ok_or(SkipReason::MissingLengthOfStay)?;
        let time_until_death = Self::time_until_death(admitted_at, died_at);
        let window = self.horizon(los, time_until_death);
        Ok(LabeledWindow {
            window,
            label: self.label(mortality, time_until_death, window),
            time_until_death_hours: time_until_death,
        })
    }

    /// Horizon and label of a stay.
    pub fn derive(&self, stay: &Stay) -> Result<LabeledWindow, SkipReason> {
        self.derive_from(
            stay.admitted_at,
            stay.died_at,
            stay.length_of_stay_hours(),
            stay.mortality,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn admission() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2150-03-01 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_hours_between() {
        let start = admission();
        assert_eq!(hours_between(start, start + Duration::hours(10)), 10.0);
        assert_eq!(hours_between(start, start + Duration::minutes(90)), 1.5);
        assert_eq!(hours_between(start, start - Duration::minutes(30)), -0.5);
    }

    #[test]
    fn test_hours_between_far_apart() {
        let start = NaiveDateTime::parse_from_str("1800-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let end = NaiveDateTime::parse_from_str("2200-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let hours = hours_between(start, end);
        assert!((hours / 24.0 - 146_097.0).abs() < 1e-6);
    }

    #[test]
    fn test_death_within_horizon() {
        // los=50h, died 10h after admission, interval 24h → t=10, label 1
        let deriver = LabelDeriver::default();
        let result = deriver
            .derive_from(
                admission(),
                Some(admission() + Duration::hours(10)),
                Some(50.0),
                true,
            )
            .unwrap();
        assert_eq!(result.window.hours(), 10);
        assert_eq!(result.label, DecompensationLabel::Dies);
        assert_eq!(result.time_until_death_hours, 10.0);
    }

    #[test]
    fn test_no_death_recorded() {
        // los=50h, no deathtime, mortality=1 → t=24, label 0
        let deriver = LabelDeriver::default();
        let result = deriver
            .derive_from(admission(), None, Some(50.0), true)
            .unwrap();
        assert_eq!(result.window.hours(), 24);
        assert_eq!(result.label, DecompensationLabel::Survives);
        assert_eq!(result.time_until_death_hours, DEATH_SENTINEL_HOURS);
    }

    #[test]
    fn test_survivor_always_negative() {
        let deriver = LabelDeriver::default();
        let result = deriver
            .derive_from(
                admission(),
                Some(admission() + Duration::hours(3)),
                Some(50.0),
                false,
            )
            .unwrap();
        assert_eq!(result.window.hours(), 3);
        assert_eq!(result.label, DecompensationLabel::Survives);
    }

    #[test]
    fn test_horizon_truncated_by_length_of_stay() {
        let deriver = LabelDeriver::default();
        assert_eq!(deriver.horizon(7.9, DEATH_SENTINEL_HOURS).hours(), 7);
        assert_eq!(deriver.horizon(100.0, 30.2).hours(), 24);
        assert_eq!(deriver.horizon(100.0, 12.7).hours(), 12);
    }

    #[test]
    fn test_death_far_after_horizon() {
        // Died 60h in, horizon 24h → 36h remain, outside the 24h interval.
        let deriver = LabelDeriver::default();
        let result = deriver
            .derive_from(
                admission(),
                Some(admission() + Duration::hours(60)),
                Some(70.0),
                true,
            )
            .unwrap();
        assert_eq!(result.window.hours(), 24);
        assert_eq!(result.label, DecompensationLabel::Survives);

        // Died 47h in → 23h remain → positive.
        let result = deriver
            .derive_from(
                admission(),
                Some(admission() + Duration::hours(47)),
                Some(70.0),
                true,
            )
            .unwrap();
        assert_eq!(result.label, DecompensationLabel::Dies);
    }

    #[test]
    fn test_missing_length_of_stay() {
        let deriver = LabelDeriver::default();
        assert_eq!(
            deriver.derive_from(admission(), None, None, true),
            Err(SkipReason::MissingLengthOfStay)
        );
        assert_eq!(
            deriver.derive_from(admission(), None, Some(f64::NAN), true),
            Err(SkipReason::MissingLengthOfStay)
        );
    }

    #[test]
    fn test_custom_interval() {
        let deriver = LabelDeriver::new(LabelConfig::new(48.0, 12));
        let result = deriver
            .derive_from(
                admission(),
                Some(admission() + Duration::hours(50)),
                Some(80.0),
                true,
            )
            .unwrap();
        assert_eq!(result.window.hours(), 12);
        assert_eq!(result.label, DecompensationLabel::Dies);
    }
}
