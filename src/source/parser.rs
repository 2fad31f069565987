//! Session log parser
//!
//! Drives the line classifier and the record builder over a whole log
//! stream. Records come out lazily, in log order; a record still open when
//! the stream ends is dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::core::SessionRecord;
use crate::error::LogError;

use super::builder::{Anomaly, BuilderState, MarkerPattern, SessionRecordBuilder};
use super::classify::{LogLine, classify};

/// Counters describing one pass over a log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParseStats {
    pub(crate) lines: usize,
    pub(crate) records: usize,
    pub(crate) unrecognized: usize,
    pub(crate) anomalies: usize,
    /// Sessions that had a marker but no finish line, including one open at EOF
    pub(crate) unfinished: usize,
    /// Marker filenames that no accepted pattern could decode
    pub(crate) undecodable: Vec<String>,
}

/// Iterator over the completed records of one log stream.
///
/// Reading stops at the first I/O error; [`Records::finish`] reports it.
pub(crate) struct Records<'p, R> {
    reader: R,
    source: PathBuf,
    builder: SessionRecordBuilder<'p>,
    state: BuilderState,
    buf: Vec<u8>,
    stats: ParseStats,
    error: Option<LogError>,
    done: bool,
}

impl<'p, R: BufRead> Records<'p, R> {
    pub(crate) fn new(reader: R, source: impl Into<PathBuf>, patterns: &'p [MarkerPattern]) -> Self {
        Self {
            reader,
            source: source.into(),
            builder: SessionRecordBuilder::new(patterns),
            state: BuilderState::Idle,
            buf: Vec::new(),
            stats: ParseStats::default(),
            error: None,
            done: false,
        }
    }

    /// Stats for the records pulled so far, or the read error that ended the stream
    pub(crate) fn finish(self) -> Result<ParseStats, LogError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.stats),
        }
    }

    fn end_of_stream(&mut self) {
        self.done = true;
        if let BuilderState::Open(pending) = std::mem::take(&mut self.state) {
            self.stats.unfinished += 1;
            debug!(
                log = %self.source.display(),
                session = pending.base_filename(),
                "log ended inside an unfinished session; discarded"
            );
        }
    }

    fn note(&mut self, anomaly: &Anomaly) {
        self.stats.anomalies += 1;
        match anomaly {
            Anomaly::DiscardedUnfinished { .. } => self.stats.unfinished += 1,
            Anomaly::UndecodableMarker { filename } => {
                self.stats.undecodable.push(filename.clone());
            }
            _ => {}
        }
        debug!(
            log = %self.source.display(),
            line = self.stats.lines,
            "{anomaly}"
        );
    }
}

impl<R: BufRead> Iterator for Records<'_, R> {
    type Item = SessionRecord;

    fn next(&mut self) -> Option<SessionRecord> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.end_of_stream(),
                Ok(_) => {
                    self.stats.lines += 1;
                    let text = String::from_utf8_lossy(&self.buf);
                    let line = classify(&text);
                    if line == LogLine::Unrecognized {
                        self.stats.unrecognized += 1;
                        trace!(line = self.stats.lines, text = %text.trim(), "unrecognized line");
                        continue;
                    }

                    let step = self.builder.step(std::mem::take(&mut self.state), line);
                    self.state = step.state;
                    if let Some(anomaly) = step.anomaly {
                        self.note(&anomaly);
                    }
                    if let Some(record) = step.emitted {
                        self.stats.records += 1;
                        return Some(record);
                    }
                }
                Err(source) => {
                    self.done = true;
                    self.error = Some(LogError::Read {
                        path: self.source.clone(),
                        line: self.stats.lines + 1,
                        source,
                    });
                }
            }
        }
        None
    }
}

/// Everything recovered from one log file
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedLog {
    pub(crate) records: Vec<SessionRecord>,
    pub(crate) stats: ParseStats,
}

/// Parse a whole stream. A read error discards everything parsed so far.
pub(crate) fn parse_reader<R: BufRead>(
    reader: R,
    source: impl Into<PathBuf>,
    patterns: &[MarkerPattern],
) -> Result<ParsedLog, LogError> {
    let mut iter = Records::new(reader, source, patterns);
    let records: Vec<SessionRecord> = iter.by_ref().collect();
    let stats = iter.finish()?;
    Ok(ParsedLog { records, stats })
}

pub(crate) fn parse_log_file(path: &Path, patterns: &[MarkerPattern]) -> Result<ParsedLog, LogError> {
    let file = File::open(path).map_err(|source| LogError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_reader(BufReader::new(file), path, patterns)
}
