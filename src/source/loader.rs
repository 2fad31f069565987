//! Scans every configured volume, one worker per volume

use rayon::prelude::*;
use std::time::Instant;

use tracing::info;

use crate::core::{SessionRecord, VolumeTag};

use super::scanner::{VolumeOutcome, VolumeScan, VolumeScanner};

/// Per-volume results, in the order the volumes were given
#[derive(Debug, Default)]
pub(crate) struct ScanReport {
    pub(crate) volumes: Vec<VolumeScan>,
    pub(crate) elapsed_ms: f64,
}

impl ScanReport {
    pub(crate) fn records_found(&self) -> usize {
        self.volumes.iter().map(|v| v.records.len()).sum()
    }

    pub(crate) fn missing_logs(&self) -> impl Iterator<Item = &VolumeTag> {
        self.volumes
            .iter()
            .filter(|v| matches!(v.outcome, VolumeOutcome::NoLog))
            .map(|v| &v.volume)
    }

    pub(crate) fn unavailable(&self) -> impl Iterator<Item = &VolumeScan> {
        self.volumes.iter().filter(|v| {
            matches!(
                v.outcome,
                VolumeOutcome::Unreachable | VolumeOutcome::Unreadable { .. }
            )
        })
    }

    /// Record sets ready for merging into a session index
    pub(crate) fn record_sets(&self) -> impl Iterator<Item = (&VolumeTag, &[SessionRecord])> {
        self.volumes
            .iter()
            .map(|v| (&v.volume, v.records.as_slice()))
    }
}

/// Scan all volumes in parallel. Scans share nothing; the result keeps the
/// caller's volume order so the later merge is deterministic.
pub(crate) fn scan_volumes(volumes: &[VolumeTag], scanner: &VolumeScanner<'_>) -> ScanReport {
    let start = Instant::now();
    let scans: Vec<VolumeScan> = volumes.par_iter().map(|v| scanner.scan(v)).collect();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let report = ScanReport {
        volumes: scans,
        elapsed_ms,
    };
    info!(
        volumes = volumes.len(),
        records = report.records_found(),
        "scanned volumes ({:.2}ms)",
        elapsed_ms
    );
    report
}
