//! ICU stay records.
//!
//! A [`Stay`] joins two upstream tables for one ICU episode: the subject's
//! stays table (admission and death timestamps) and the episode's label file
//! (mortality flag and length of stay).

use crate::error::{DatasetError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ICU stay identifier (`ICUSTAY_ID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StayId(pub u64);

impl fmt::Display for StayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a subject's stays table.
#[derive(Debug, Clone, PartialEq)]
pub struct StayRecord {
    pub icustay_id: StayId,
    pub intime: NaiveDateTime,
    pub deathtime: Option<NaiveDateTime>,
}

impl StayRecord {
    pub fn new(icustay_id: u64, intime: NaiveDateTime, deathtime: Option<NaiveDateTime>) -> Self {
        Self {
            icustay_id: StayId(icustay_id),
            intime,
            deathtime,
        }
    }
}

/// First row of an episode's label file.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRecord {
    pub icustay_id: StayId,

    /// In-hospital mortality for the whole admission.
    pub mortality: bool,

    /// Length of stay in days, as recorded upstream.
    pub length_of_stay_days: Option<f64>,
}

impl LabelRecord {
    pub fn new(icustay_id: u64, mortality: bool, length_of_stay_days: Option<f64>) -> Self {
        Self {
            icustay_id: StayId(icustay_id),
            mortality,
            length_of_stay_days,
        }
    }
}

/// One ICU episode, ready for windowing and labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct Stay {
    pub id: StayId,
    pub admitted_at: NaiveDateTime,
    pub died_at: Option<NaiveDateTime>,
    pub mortality: bool,
    length_of_stay_hours: Option<f64>,
}

impl Stay {
    pub fn new(
        id: StayId,
        admitted_at: NaiveDateTime,
        died_at: Option<NaiveDateTime>,
        length_of_stay_hours: Option<f64>,
        mortality: bool,
    ) -> Self {
        Self {
            id,
            admitted_at,
            died_at,
            mortality,
            length_of_stay_hours,
        }
    }

    /// Join a label record with the matching stays-table row.
    ///
    /// Length of stay is converted from days to hours.
    pub fn join(label: &LabelRecord, record: &StayRecord) -> Self {
        Self {
            id: record.icustay_id,
            admitted_at: record.intime,
            died_at: record.deathtime,
            mortality: label.mortality,
            length_of_stay_hours: label.length_of_stay_days.map(|days| days * 24.0),
        }
    }

    /// Length of stay in hours, or `None` when absent or NaN.
    pub fn length_of_stay_hours(&self) -> Option<f64> {
        self.length_of_stay_hours.filter(|los| !los.is_nan())
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp column value.
///
/// Empty values (and `NaT`/`nan` markers) are null. Date-only values are
/// taken as midnight.
pub fn parse_timestamp(column: &'static str, value: &str) -> Result<Option<NaiveDateTime>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("nat") || value.eq_ignore_ascii_case("nan")
    {
        return Ok(None);
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(ts));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight));
    }

    Err(DatasetError::InvalidTimestamp {
        column,
        value: value.to_string(),
    })
}
