//! Session record state machine.
//!
//! A record is opened by a marker line, filled in by the `StartedAt` and
//! `DataLength` lines that follow it and emitted by its `FinishedAt` line.
//! The state is a plain value threaded through the parse loop: every call to
//! [`SessionRecordBuilder::step`] consumes the previous state and returns the
//! next one.
//!
//! Two anomalies are resolved here rather than reported as errors:
//! - a field line with no open record is ignored;
//! - a marker arriving while a record is still open discards the open record
//!   and starts the new one (the unfinished session never reaches the index).

use std::fmt;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::core::{SessionRecord, decode_ddmmyy};

use super::classify::LogLine;

/// Accepted marker filename conventions, tried in configured order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MarkerPattern {
    /// `DDMMYY_PPP.000`, exactly three device digits
    Legacy,
    /// `DDMMYY_P….000`, any number of device digits
    Revised,
}

pub(crate) const DEFAULT_MARKER_PATTERNS: &[MarkerPattern] =
    &[MarkerPattern::Legacy, MarkerPattern::Revised];

impl MarkerPattern {
    fn accepts_device(self, device: &str) -> bool {
        let digits = device.bytes().all(|b| b.is_ascii_digit());
        match self {
            MarkerPattern::Legacy => digits && device.len() == 3,
            MarkerPattern::Revised => digits && !device.is_empty(),
        }
    }
}

/// Fields decoded from a marker filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MarkerName {
    pub(crate) date: NaiveDate,
    pub(crate) device_id: String,
    pub(crate) pattern: MarkerPattern,
}

/// Decode `DDMMYY_<device>.000` against the first pattern that accepts it
pub(crate) fn decode_marker_name(filename: &str, patterns: &[MarkerPattern]) -> Option<MarkerName> {
    let stem = filename.strip_suffix(".000")?;
    let (date, device) = stem.split_once('_')?;
    let date = decode_ddmmyy(date)?;
    let pattern = patterns.iter().copied().find(|p| p.accepts_device(device))?;
    Some(MarkerName {
        date,
        device_id: device.to_string(),
        pattern,
    })
}

/// Split a device path into (directory, filename). Both separators count,
/// since logs written on one platform are read on another.
pub(crate) fn split_marker_path(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// A record that has seen its marker but not yet its finish line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingRecord {
    date: NaiveDate,
    device_id: String,
    base_path: String,
    base_filename: String,
    size_bytes: u64,
    started_at: Option<String>,
}

impl PendingRecord {
    pub(crate) fn base_filename(&self) -> &str {
        &self.base_filename
    }

    fn finish(self, finished_at: &str) -> SessionRecord {
        SessionRecord {
            date: self.date,
            device_id: self.device_id,
            base_path: self.base_path,
            base_filename: self.base_filename,
            size_bytes: self.size_bytes,
            started_at: self.started_at,
            finished_at: finished_at.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum BuilderState {
    #[default]
    Idle,
    Open(PendingRecord),
}

/// Structural oddities noticed while stepping. None of them stop a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Anomaly {
    UndecodableMarker { filename: String },
    DiscardedUnfinished { base_filename: String },
    OrphanField { kind: &'static str },
    InvalidDataLength { raw: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::UndecodableMarker { filename } => {
                write!(f, "marker filename {filename:?} does not match any accepted pattern")
            }
            Anomaly::DiscardedUnfinished { base_filename } => {
                write!(f, "session {base_filename} never finished; discarded")
            }
            Anomaly::OrphanField { kind } => write!(f, "{kind} outside of a session; ignored"),
            Anomaly::InvalidDataLength { raw } => {
                write!(f, "DataLength {raw:?} is not a number; using 0")
            }
        }
    }
}

/// Result of feeding one line to the builder
#[derive(Debug)]
pub(crate) struct Step {
    pub(crate) state: BuilderState,
    pub(crate) emitted: Option<SessionRecord>,
    pub(crate) anomaly: Option<Anomaly>,
}

impl Step {
    fn to(state: BuilderState) -> Self {
        Self {
            state,
            emitted: None,
            anomaly: None,
        }
    }

    fn with_anomaly(mut self, anomaly: Anomaly) -> Self {
        self.anomaly = Some(anomaly);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionRecordBuilder<'p> {
    patterns: &'p [MarkerPattern],
}

impl Default for SessionRecordBuilder<'static> {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_PATTERNS)
    }
}

impl<'p> SessionRecordBuilder<'p> {
    pub(crate) fn new(patterns: &'p [MarkerPattern]) -> Self {
        Self { patterns }
    }

    pub(crate) fn step(&self, state: BuilderState, line: LogLine<'_>) -> Step {
        match (state, line) {
            (state, LogLine::Marker(path)) => self.open(state, path),

            (BuilderState::Open(mut pending), LogLine::StartedAt(value)) => {
                pending.started_at = Some(value.to_string());
                Step::to(BuilderState::Open(pending))
            }

            (BuilderState::Open(mut pending), LogLine::DataLength(raw)) => {
                match raw.trim().parse::<u64>() {
                    Ok(size) => {
                        pending.size_bytes = size;
                        Step::to(BuilderState::Open(pending))
                    }
                    Err(_) => {
                        pending.size_bytes = 0;
                        Step::to(BuilderState::Open(pending)).with_anomaly(
                            Anomaly::InvalidDataLength {
                                raw: raw.to_string(),
                            },
                        )
                    }
                }
            }

            (BuilderState::Open(pending), LogLine::FinishedAt(value)) => Step {
                state: BuilderState::Idle,
                emitted: Some(pending.finish(value)),
                anomaly: None,
            },

            (
                BuilderState::Idle,
                line @ (LogLine::StartedAt(_) | LogLine::DataLength(_) | LogLine::FinishedAt(_)),
            ) => Step::to(BuilderState::Idle).with_anomaly(Anomaly::OrphanField { kind: line.kind() }),

            (state, LogLine::Unrecognized) => Step::to(state),
        }
    }

    fn open(&self, state: BuilderState, path: &str) -> Step {
        let (dir, filename) = split_marker_path(path);
        let Some(name) = decode_marker_name(filename, self.patterns) else {
            return Step::to(state).with_anomaly(Anomaly::UndecodableMarker {
                filename: filename.to_string(),
            });
        };

        let pending = PendingRecord {
            date: name.date,
            device_id: name.device_id,
            base_path: dir.to_string(),
            base_filename: filename.strip_suffix(".000").unwrap_or(filename).to_string(),
            size_bytes: 0,
            started_at: None,
        };
        let step = Step::to(BuilderState::Open(pending));
        match state {
            BuilderState::Open(previous) => step.with_anomaly(Anomaly::DiscardedUnfinished {
                base_filename: previous.base_filename,
            }),
            BuilderState::Idle => step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn run(lines: &[LogLine<'_>]) -> (BuilderState, Vec<SessionRecord>, Vec<Anomaly>) {
        let builder = SessionRecordBuilder::default();
        let mut state = BuilderState::Idle;
        let mut records = Vec::new();
        let mut anomalies = Vec::new();
        for line in lines {
            let step = builder.step(state, *line);
            state = step.state;
            records.extend(step.emitted);
            anomalies.extend(step.anomaly);
        }
        (state, records, anomalies)
    }

    #[test]
    fn decodes_legacy_and_revised_names() {
        let legacy = decode_marker_name("010122_055.000", DEFAULT_MARKER_PATTERNS).unwrap();
        assert_eq!(legacy.date, d(2022, 1, 1));
        assert_eq!(legacy.device_id, "055");
        assert_eq!(legacy.pattern, MarkerPattern::Legacy);

        let revised = decode_marker_name("271124_12345.000", DEFAULT_MARKER_PATTERNS).unwrap();
        assert_eq!(revised.device_id, "12345");
        assert_eq!(revised.pattern, MarkerPattern::Revised);
    }

    #[test]
    fn legacy_only_rejects_variable_width_device() {
        let legacy_only = [MarkerPattern::Legacy];
        assert!(decode_marker_name("271124_7.000", &legacy_only).is_none());
        assert!(decode_marker_name("271124_007.000", &legacy_only).is_some());
    }

    #[test]
    fn rejects_malformed_names() {
        for name in [
            "010122_055.001",
            "010122055.000",
            "0101_055.000",
            "010122_.000",
            "010122_05x.000",
            "320122_055.000",
            "abcdef_055.000",
        ] {
            assert!(decode_marker_name(name, DEFAULT_MARKER_PATTERNS).is_none(), "{name}");
        }
    }

    #[test]
    fn splits_either_separator() {
        assert_eq!(split_marker_path("D:/das/010122_055.000"), ("D:/das", "010122_055.000"));
        assert_eq!(
            split_marker_path("C:\\!shu_fd\\das\\010122_055.000"),
            ("C:\\!shu_fd\\das", "010122_055.000")
        );
        assert_eq!(split_marker_path("010122_055.000"), ("", "010122_055.000"));
    }

    #[test]
    fn full_sequence_emits_one_record() {
        let (state, records, anomalies) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::StartedAt("09:00:00"),
            LogLine::DataLength("104857600"),
            LogLine::FinishedAt("09:45:00"),
        ]);
        assert_eq!(state, BuilderState::Idle);
        assert!(anomalies.is_empty());
        assert_eq!(
            records,
            vec![SessionRecord {
                date: d(2022, 1, 1),
                device_id: "055".to_string(),
                base_path: "D:/das".to_string(),
                base_filename: "010122_055".to_string(),
                size_bytes: 104_857_600,
                started_at: Some("09:00:00".to_string()),
                finished_at: "09:45:00".to_string(),
            }]
        );
    }

    #[test]
    fn later_field_values_win() {
        let (_, records, _) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::StartedAt("09:00:00"),
            LogLine::DataLength("10"),
            LogLine::StartedAt("09:01:00"),
            LogLine::DataLength("20"),
            LogLine::FinishedAt("09:45:00"),
        ]);
        assert_eq!(records[0].started_at.as_deref(), Some("09:01:00"));
        assert_eq!(records[0].size_bytes, 20);
    }

    #[test]
    fn bad_data_length_defaults_to_zero() {
        let (_, records, anomalies) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::DataLength("99"),
            LogLine::DataLength("notanumber"),
            LogLine::FinishedAt("09:45:00"),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size_bytes, 0);
        assert_eq!(
            anomalies,
            vec![Anomaly::InvalidDataLength {
                raw: "notanumber".to_string()
            }]
        );
    }

    #[test]
    fn finish_without_start_line_still_completes() {
        let (_, records, _) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::FinishedAt("09:45:00"),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].started_at, None);
    }

    #[test]
    fn fields_while_idle_are_ignored() {
        let (state, records, anomalies) = run(&[
            LogLine::StartedAt("09:00:00"),
            LogLine::DataLength("5"),
            LogLine::FinishedAt("09:45:00"),
        ]);
        assert_eq!(state, BuilderState::Idle);
        assert!(records.is_empty());
        assert_eq!(anomalies.len(), 3);
        assert!(anomalies.iter().all(|a| matches!(a, Anomaly::OrphanField { .. })));
    }

    #[test]
    fn second_marker_discards_unfinished_record() {
        let (_, records, anomalies) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::StartedAt("09:00:00"),
            LogLine::Marker("D:/das/020122_056.000"),
            LogLine::StartedAt("10:00:00"),
            LogLine::FinishedAt("10:30:00"),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].base_filename, "020122_056");
        assert_eq!(records[0].started_at.as_deref(), Some("10:00:00"));
        assert_eq!(
            anomalies,
            vec![Anomaly::DiscardedUnfinished {
                base_filename: "010122_055".to_string()
            }]
        );
    }

    #[test]
    fn undecodable_marker_keeps_current_state() {
        let (state, records, anomalies) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::Marker("D:/das/garbage.000"),
        ]);
        assert!(records.is_empty());
        assert!(matches!(anomalies[0], Anomaly::UndecodableMarker { .. }));
        match state {
            BuilderState::Open(pending) => assert_eq!(pending.base_filename(), "010122_055"),
            BuilderState::Idle => panic!("open record was dropped"),
        }
    }

    #[test]
    fn unfinished_record_stays_open() {
        let (state, records, _) = run(&[
            LogLine::Marker("D:/das/010122_055.000"),
            LogLine::StartedAt("09:00:00"),
            LogLine::Unrecognized,
        ]);
        assert!(records.is_empty());
        assert!(matches!(state, BuilderState::Open(_)));
    }
}
