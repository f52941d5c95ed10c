//! Per-stay event timelines.
//!
//! A timeline file is a CSV table whose first column is the elapsed time in
//! hours since ICU admission, followed by arbitrary measurement columns:
//!
//! ```text
//! Hours,Capillary refill rate,Diastolic blood pressure,...
//! 0.25,,61.0,...
//! 1.25,,58.0,...
//! ```
//!
//! The header is kept as schema metadata. Parsed timelines also keep the
//! original text of every line, so a filtered timeline is written back byte
//! for byte: quoting and line endings survive along with the values.

pub mod window;

pub use window::{EventWindowFilter, DEFAULT_EPSILON};

use crate::error::{DatasetError, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// One measurement row of a timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    /// Hours since admission, parsed from the first field.
    pub elapsed_hours: f64,

    /// All fields of the row, including the elapsed-hours field as written.
    pub fields: Vec<String>,

    /// Source text of the row with its line terminator, when parsed.
    pub raw_line: Option<String>,
}

impl TimelineEvent {
    /// Create an event from already-split fields.
    ///
    /// The first field must hold the elapsed hours.
    pub fn from_fields(fields: Vec<String>, source_name: &str, row: usize) -> Result<Self> {
        let raw = fields.first().map(String::as_str).unwrap_or("");
        let elapsed_hours = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| DatasetError::InvalidEventTime {
                source_name: source_name.to_string(),
                row,
                value: raw.to_string(),
            })?;
        Ok(Self {
            elapsed_hours,
            fields,
            raw_line: None,
        })
    }

    /// Create an event from a time offset and its measurement values.
    pub fn from_values(elapsed_hours: f64, values: &[&str]) -> Self {
        let mut fields = Vec::with_capacity(values.len() + 1);
        fields.push(elapsed_hours.to_string());
        fields.extend(values.iter().map(|v| v.to_string()));
        Self {
            elapsed_hours,
            fields,
            raw_line: None,
        }
    }
}

/// Header plus ordered events for one ICU stay.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventTimeline {
    header: Vec<String>,
    events: Vec<TimelineEvent>,
    raw_header: Option<String>,
}

impl EventTimeline {
    /// Create an empty timeline with the given header.
    pub fn new<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            events: Vec::new(),
            raw_header: None,
        }
    }

    /// Replace the events of this timeline.
    pub fn with_events(mut self, events: Vec<TimelineEvent>) -> Self {
        self.events = events;
        self
    }

    /// Append one event.
    pub fn push(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Elapsed hours of every event, in timeline order.
    pub fn elapsed_hours(&self) -> impl Iterator<Item = f64> + '_ {
        self.events.iter().map(|e| e.elapsed_hours)
    }

    /// Keep only events matching the predicate, preserving order.
    pub fn retain<F: FnMut(&TimelineEvent) -> bool>(&mut self, f: F) {
        self.events.retain(f);
    }

    /// Parse a timeline from CSV text.
    ///
    /// `source_name` is used in error messages only. An input without any
    /// rows (not even a header) yields an empty timeline.
    pub fn from_reader<R: Read>(mut reader: R, source_name: &str) -> Result<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| DatasetError::io(source_name, e))?;
        Self::parse(&text, source_name)
    }

    fn parse(text: &str, source_name: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header: Vec<String> = csv_reader
            .headers()
            .map_err(|e| DatasetError::csv(source_name, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut starts = Vec::new();
        let mut events = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| DatasetError::csv(source_name, e))?;
            let position = record.position().map_or(text.len(), |p| p.byte() as usize);
            // The reader can stop between the CR and LF of a terminator.
            let terminator = text.as_bytes().get(position..).map_or(0, |rest| {
                rest.iter().take_while(|&&b| b == b'\r' || b == b'\n').count()
            });
            starts.push(position + terminator);
            let fields = record.iter().map(str::to_string).collect();
            // Row numbers are 1-based and count the header.
            events.push(TimelineEvent::from_fields(fields, source_name, index + 2)?);
        }

        // A row's text runs up to the start of the next row.
        let header_end = starts.first().copied().unwrap_or(text.len());
        let ends = starts.iter().skip(1).copied().chain(std::iter::once(text.len()));
        for ((event, start), end) in events.iter_mut().zip(starts.iter().copied()).zip(ends) {
            event.raw_line = text.get(start..end).map(str::to_string);
        }

        Ok(Self {
            header,
            events,
            raw_header: text.get(..header_end).map(str::to_string),
        })
    }

    /// Read a timeline file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
        Self::from_reader(file, &path.to_string_lossy())
    }

    /// Write header and events.
    ///
    /// A parsed timeline is written from its source text. Timelines holding
    /// constructed events are serialized as CSV.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::result::Result<(), csv::Error> {
        if let Some(raw_header) = &self.raw_header {
            let raw_lines: Option<Vec<&str>> =
                self.events.iter().map(|e| e.raw_line.as_deref()).collect();
            if let Some(lines) = raw_lines {
                writer.write_all(raw_header.as_bytes())?;
                for line in lines {
                    writer.write_all(line.as_bytes())?;
                    if !line.ends_with('\n') {
                        writer.write_all(b"\n")?;
                    }
                }
                writer.flush()?;
                return Ok(());
            }
        }

        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);
        if !self.header.is_empty() {
            csv_writer.write_record(&self.header)?;
        }
        for event in &self.events {
            csv_writer.write_record(&event.fields)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Hours,Heart Rate,Glucose\n\
                          -0.5,80,\n\
                          0.25,82,110\n\
                          3.0,,115\n";

    #[test]
    fn test_parse_timeline() {
        let timeline = EventTimeline::from_reader(SAMPLE.as_bytes(), "sample").unwrap();
        assert_eq!(timeline.header(), &["Hours", "Heart Rate", "Glucose"]);
        assert_eq!(timeline.len(), 3);
        let hours: Vec<f64> = timeline.elapsed_hours().collect();
        assert_eq!(hours, vec![-0.5, 0.25, 3.0]);
        assert_eq!(timeline.events()[2].fields, vec!["3.0", "", "115"]);
    }

    #[test]
    fn test_parse_empty_input() {
        let timeline = EventTimeline::from_reader("".as_bytes(), "empty").unwrap();
        assert!(timeline.is_empty());
        assert!(timeline.header().is_empty());
    }

    #[test]
    fn test_parse_invalid_event_time() {
        let err = EventTimeline::from_reader("Hours,HR\nabc,80\n".as_bytes(), "bad.csv")
            .unwrap_err();
        match err {
            DatasetError::InvalidEventTime {
                source_name,
                row,
                value,
            } => {
                assert_eq!(source_name, "bad.csv");
                assert_eq!(row, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_preserves_fields() {
        let timeline = EventTimeline::from_reader(SAMPLE.as_bytes(), "sample").unwrap();
        let mut out = Vec::new();
        timeline.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SAMPLE);
    }

    #[test]
    fn test_write_keeps_source_text() {
        let text = "Hours,GCS,HR\r\n-1.0,,70\r\n0.5,\"4 Spontaneously\",80\r\n2.0,,\"81\"\r\n";
        let mut timeline = EventTimeline::from_reader(text.as_bytes(), "crlf").unwrap();
        assert_eq!(timeline.events()[1].fields, vec!["0.5", "4 Spontaneously", "80"]);

        timeline.retain(|e| e.elapsed_hours > 0.0);
        let mut out = Vec::new();
        timeline.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Hours,GCS,HR\r\n0.5,\"4 Spontaneously\",80\r\n2.0,,\"81\"\r\n"
        );
    }

    #[test]
    fn test_write_terminates_last_line() {
        let timeline = EventTimeline::from_reader("Hours,HR\n0.5,80\n1.5,81".as_bytes(), "tail")
            .unwrap();
        assert_eq!(timeline.events()[1].raw_line.as_deref(), Some("1.5,81"));
        let mut out = Vec::new();
        timeline.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hours,HR\n0.5,80\n1.5,81\n");
    }

    #[test]
    fn test_write_constructed_events() {
        let mut timeline = EventTimeline::from_reader("Hours,HR\r\n0.5,80\r\n".as_bytes(), "mixed")
            .unwrap();
        timeline.push(TimelineEvent::from_values(2.0, &["82"]));
        let mut out = Vec::new();
        timeline.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hours,HR\n0.5,80\n2,82\n");
    }

    #[test]
    fn test_from_values() {
        let event = TimelineEvent::from_values(1.5, &["80", ""]);
        assert_eq!(event.elapsed_hours, 1.5);
        assert_eq!(event.fields, vec!["1.5", "80", ""]);
    }
}
