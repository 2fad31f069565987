use std::fmt::Write;

use serde::Serialize;

use crate::core::SessionIndex;
use crate::output::format::format_number;
use crate::source::{ScanReport, VolumeOutcome};

#[derive(Debug, Serialize)]
pub(crate) struct UnavailableVolume {
    pub(crate) volume_id: u32,
    pub(crate) root: String,
    pub(crate) reason: String,
}

/// Where a volume's sessions came from
#[derive(Debug, Serialize)]
pub(crate) struct ParsedVolume {
    pub(crate) volume_id: u32,
    pub(crate) log_path: String,
    pub(crate) lines: usize,
    pub(crate) records: usize,
    pub(crate) unrecognized: usize,
    pub(crate) anomalies: usize,
    pub(crate) unfinished: usize,
    /// Marker filenames skipped because their name could not be decoded
    pub(crate) undecodable_markers: Vec<String>,
}

/// Counts shown after every scan
#[derive(Debug, Serialize)]
pub(crate) struct ScanSummary {
    pub(crate) volumes_scanned: usize,
    pub(crate) records_found: usize,
    pub(crate) sessions_indexed: usize,
    pub(crate) duplicate_keys: usize,
    pub(crate) parsed: Vec<ParsedVolume>,
    pub(crate) missing_logs: Vec<u32>,
    pub(crate) unavailable: Vec<UnavailableVolume>,
    pub(crate) elapsed_ms: f64,
}

impl ScanSummary {
    pub(crate) fn new(report: &ScanReport, index: &SessionIndex) -> Self {
        let unavailable = report
            .unavailable()
            .map(|scan| UnavailableVolume {
                volume_id: scan.volume.volume_id,
                root: scan.volume.root.display().to_string(),
                reason: match &scan.outcome {
                    VolumeOutcome::Unreadable { errors } => errors.join("; "),
                    _ => "volume root not reachable".to_string(),
                },
            })
            .collect();

        let parsed = report
            .volumes
            .iter()
            .filter_map(|scan| match &scan.outcome {
                VolumeOutcome::Parsed { log_path, stats } => Some(ParsedVolume {
                    volume_id: scan.volume.volume_id,
                    log_path: log_path.display().to_string(),
                    lines: stats.lines,
                    records: stats.records,
                    unrecognized: stats.unrecognized,
                    anomalies: stats.anomalies,
                    unfinished: stats.unfinished,
                    undecodable_markers: stats.undecodable.clone(),
                }),
                _ => None,
            })
            .collect();

        Self {
            volumes_scanned: report.volumes.len(),
            records_found: report.records_found(),
            sessions_indexed: index.len(),
            duplicate_keys: index.collisions(),
            parsed,
            missing_logs: report.missing_logs().map(|v| v.volume_id).collect(),
            unavailable,
            elapsed_ms: report.elapsed_ms,
        }
    }
}

pub(crate) fn render_scan_summary(summary: &ScanSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {} records found on {} volumes ({} indexed, {:.0}ms)",
        format_number(summary.records_found),
        summary.volumes_scanned,
        format_number(summary.sessions_indexed),
        summary.elapsed_ms
    );
    if summary.duplicate_keys > 0 {
        let _ = writeln!(
            out,
            "  {} duplicate keys replaced by later records",
            summary.duplicate_keys
        );
    }
    let anomalies: usize = summary.parsed.iter().map(|p| p.anomalies).sum();
    let unfinished: usize = summary.parsed.iter().map(|p| p.unfinished).sum();
    if anomalies + unfinished > 0 {
        let _ = writeln!(
            out,
            "  {anomalies} malformed entries skipped, {unfinished} unfinished sessions dropped"
        );
    }
    for volume in summary.parsed.iter().filter(|p| !p.undecodable_markers.is_empty()) {
        let _ = writeln!(
            out,
            "  Volume {} sessions with unreadable names: {}",
            volume.volume_id,
            volume.undecodable_markers.join(", ")
        );
    }
    if !summary.missing_logs.is_empty() {
        let ids: Vec<String> = summary.missing_logs.iter().map(u32::to_string).collect();
        let _ = writeln!(out, "  No log found on volumes: {}", ids.join(", "));
    }
    for volume in &summary.unavailable {
        let _ = writeln!(
            out,
            "  Volume {} ({}) unavailable: {}",
            volume.volume_id, volume.root, volume.reason
        );
    }
    out
}
