//! Finds and parses the session log of a single volume

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::{SessionRecord, VolumeTag};

use super::builder::MarkerPattern;
use super::parser::{ParseStats, parse_log_file};

/// What happened when a volume was scanned
#[derive(Debug)]
pub(crate) enum VolumeOutcome {
    Parsed { log_path: PathBuf, stats: ParseStats },
    /// The root exists but none of the candidate logs do
    NoLog,
    /// The root itself is missing or not a directory
    Unreachable,
    /// Every candidate that exists failed to read
    Unreadable { errors: Vec<String> },
}

#[derive(Debug)]
pub(crate) struct VolumeScan {
    pub(crate) volume: VolumeTag,
    pub(crate) records: Vec<SessionRecord>,
    pub(crate) outcome: VolumeOutcome,
}

impl VolumeScan {
    fn empty(volume: &VolumeTag, outcome: VolumeOutcome) -> Self {
        Self {
            volume: volume.clone(),
            records: Vec::new(),
            outcome,
        }
    }
}

/// Probes an ordered list of log locations under a volume root
#[derive(Debug, Clone, Copy)]
pub(crate) struct VolumeScanner<'a> {
    candidates: &'a [PathBuf],
    patterns: &'a [MarkerPattern],
}

impl<'a> VolumeScanner<'a> {
    pub(crate) fn new(candidates: &'a [PathBuf], patterns: &'a [MarkerPattern]) -> Self {
        Self {
            candidates,
            patterns,
        }
    }

    pub(crate) fn candidate_paths(&self, root: &Path) -> impl Iterator<Item = PathBuf> + '_ {
        let root = root.to_path_buf();
        self.candidates.iter().map(move |rel| root.join(rel))
    }

    pub(crate) fn scan(&self, volume: &VolumeTag) -> VolumeScan {
        if !volume.root.is_dir() {
            warn!(
                volume = volume.volume_id,
                root = %volume.root.display(),
                "volume root is not reachable"
            );
            return VolumeScan::empty(volume, VolumeOutcome::Unreachable);
        }

        let mut errors = Vec::new();
        for log_path in self.candidate_paths(&volume.root) {
            if !log_path.is_file() {
                continue;
            }
            match parse_log_file(&log_path, self.patterns) {
                Ok(parsed) => {
                    info!(
                        volume = volume.volume_id,
                        log = %log_path.display(),
                        records = parsed.records.len(),
                        unfinished = parsed.stats.unfinished,
                        "parsed session log"
                    );
                    return VolumeScan {
                        volume: volume.clone(),
                        records: parsed.records,
                        outcome: VolumeOutcome::Parsed {
                            log_path,
                            stats: parsed.stats,
                        },
                    };
                }
                Err(err) => {
                    warn!(volume = volume.volume_id, "{err}; trying next candidate");
                    errors.push(err.to_string());
                }
            }
        }

        if errors.is_empty() {
            info!(
                volume = volume.volume_id,
                root = %volume.root.display(),
                "no session log found"
            );
            VolumeScan::empty(volume, VolumeOutcome::NoLog)
        } else {
            VolumeScan::empty(volume, VolumeOutcome::Unreadable { errors })
        }
    }
}
