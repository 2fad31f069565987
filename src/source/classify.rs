//! Recognizes the handful of line shapes a session log is made of.
//!
//! Everything else in the log (firmware banners, channel tables, blank
//! lines) is `Unrecognized` and simply passed over by the parser.

const MARKER_SUFFIX: &str = ".000";
const STARTED_AT: &str = "StartedAt=";
const FINISHED_AT: &str = "FinishedAt=";
const DATA_LENGTH: &str = "DataLength=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogLine<'a> {
    /// `[<path>.000]`, announcing a new session. Holds the bracketed path.
    Marker(&'a str),
    StartedAt(&'a str),
    FinishedAt(&'a str),
    /// Raw value of `DataLength=<value>:<unit>`, unit dropped
    DataLength(&'a str),
    Unrecognized,
}

impl LogLine<'_> {
    /// Short name used in diagnostics
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            LogLine::Marker(_) => "marker",
            LogLine::StartedAt(_) => "StartedAt",
            LogLine::FinishedAt(_) => "FinishedAt",
            LogLine::DataLength(_) => "DataLength",
            LogLine::Unrecognized => "unrecognized",
        }
    }
}

/// Classify one line. Surrounding whitespace is ignored.
pub(crate) fn classify(line: &str) -> LogLine<'_> {
    let line = line.trim();

    if let Some(payload) = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        && payload.ends_with(MARKER_SUFFIX)
    {
        return LogLine::Marker(payload);
    }

    if let Some(value) = line.strip_prefix(STARTED_AT) {
        return LogLine::StartedAt(value);
    }
    if let Some(value) = line.strip_prefix(FINISHED_AT) {
        return LogLine::FinishedAt(value);
    }
    if let Some(value) = line.strip_prefix(DATA_LENGTH) {
        let raw = value.split(':').next().unwrap_or(value);
        return LogLine::DataLength(raw);
    }

    LogLine::Unrecognized
}
