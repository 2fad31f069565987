mod files;
mod format;
mod progress;
mod sessions;
mod summary;

pub(crate) use files::{output_artifact_json, render_artifact_table};
pub(crate) use progress::{ProgressPrinter, output_bulk_json, render_bulk_summary};
pub(crate) use sessions::{SessionTableOptions, output_list_json, render_session_table};
pub(crate) use summary::{ScanSummary, render_scan_summary};
