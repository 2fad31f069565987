use std::fmt::Write;

use crate::files::{BulkMode, BulkSummary, ProgressEvent};
use crate::output::format::to_json;

/// Turns bulk progress events into status lines
#[derive(Debug, Default)]
pub(crate) struct ProgressPrinter {
    total: usize,
    seen: usize,
}

impl ProgressPrinter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(&mut self, event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::Started { mode, total } => {
                self.total = *total;
                self.seen = 0;
                format!("{} {} files", mode.verb(), total)
            }
            ProgressEvent::FileDone { path } => {
                self.seen += 1;
                format!("[{}/{}] {}", self.seen, self.total, path.display())
            }
            ProgressEvent::FileFailed { path, reason } => {
                self.seen += 1;
                format!(
                    "[{}/{}] FAILED {}: {}",
                    self.seen,
                    self.total,
                    path.display(),
                    reason
                )
            }
            ProgressEvent::Stopped { remaining } => {
                format!("Stopped; {remaining} files left untouched")
            }
        }
    }
}

pub(crate) fn render_bulk_summary(summary: &BulkSummary) -> String {
    let done = match summary.mode {
        BulkMode::Copy => "copied",
        BulkMode::Delete => "deleted",
    };
    let mut out = format!(
        "\n  {} of {} files {}, {} failed",
        summary.succeeded,
        summary.attempted,
        done,
        summary.failed.len()
    );
    if summary.skipped > 0 {
        let _ = write!(out, ", {} skipped", summary.skipped);
    }
    out.push('\n');
    for failure in &summary.failed {
        let _ = writeln!(out, "    {}: {}", failure.path.display(), failure.reason);
    }
    out
}

pub(crate) fn output_bulk_json(summary: &BulkSummary) -> String {
    to_json(summary)
}
