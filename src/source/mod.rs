//! Session log parsing
//!
//! A volume's log is a line-oriented text file. Each session in it is a
//! bracketed marker line naming the session's `.000` file, followed by
//! `StartedAt=`, `DataLength=` and `FinishedAt=` lines. This module turns
//! those lines into [`SessionRecord`](crate::core::SessionRecord)s, one
//! volume at a time.

pub(crate) mod builder;
pub(crate) mod classify;
pub(crate) mod loader;
pub(crate) mod parser;
pub(crate) mod scanner;

pub(crate) use builder::{DEFAULT_MARKER_PATTERNS, MarkerPattern};
pub(crate) use loader::{ScanReport, scan_volumes};
pub(crate) use scanner::{VolumeOutcome, VolumeScanner};
