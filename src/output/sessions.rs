use comfy_table::{Cell, Color};
use serde::Serialize;

use crate::cli::SortOrder;
use crate::core::IndexedSession;
use crate::output::summary::ScanSummary;
use crate::output::format::{
    create_styled_table, format_date, format_number, format_size_gb, header_cell, right_cell,
    styled_cell, to_json,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionTableOptions {
    pub(crate) order: SortOrder,
    pub(crate) use_color: bool,
}

fn sorted<'a>(sessions: &[&'a IndexedSession], order: SortOrder) -> Vec<&'a IndexedSession> {
    let mut sorted = sessions.to_vec();
    match order {
        SortOrder::Asc => sorted.sort_by(|a, b| a.key.cmp(&b.key)),
        SortOrder::Desc => sorted.sort_by(|a, b| b.key.cmp(&a.key)),
    }
    sorted
}

pub(crate) fn render_session_table(
    sessions: &[&IndexedSession],
    options: SessionTableOptions,
) -> String {
    let use_color = options.use_color;
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Session", use_color),
        header_cell("Date", use_color),
        header_cell("Device", use_color),
        header_cell("Volume", use_color),
        header_cell("Start", use_color),
        header_cell("End", use_color),
        header_cell("Size", use_color),
    ]);

    let mut total_bytes = 0u64;
    for session in sorted(sessions, options.order) {
        let record = &session.record;
        total_bytes = total_bytes.saturating_add(record.size_bytes);
        table.add_row(vec![
            Cell::new(session.key.to_string()),
            Cell::new(format_date(record.date)),
            Cell::new(&record.device_id),
            right_cell(&session.volume.volume_id.to_string(), None, false),
            Cell::new(record.started_at.as_deref().unwrap_or("-")),
            Cell::new(&record.finished_at),
            right_cell(&format_size_gb(record.size_bytes), None, false),
        ]);
    }

    let cyan = if use_color { Some(Color::Cyan) } else { None };
    table.add_row(vec![
        styled_cell("TOTAL", cyan, true),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        right_cell(&format_size_gb(total_bytes), cyan, true),
    ]);

    format!(
        "\n  Flight Sessions\n\n{table}\n\n  {} sessions\n",
        format_number(sessions.len())
    )
}

#[derive(Serialize)]
struct SessionJson<'a> {
    key: String,
    date: String,
    date_display: String,
    device_id: &'a str,
    volume_id: u32,
    volume_root: String,
    base_path: &'a str,
    base_filename: &'a str,
    size_bytes: u64,
    size_display: String,
    started_at: Option<&'a str>,
    finished_at: &'a str,
}

impl<'a> From<&'a IndexedSession> for SessionJson<'a> {
    fn from(session: &'a IndexedSession) -> Self {
        let record = &session.record;
        Self {
            key: session.key.to_string(),
            date: record.date.to_string(),
            date_display: format_date(record.date),
            device_id: &record.device_id,
            volume_id: session.volume.volume_id,
            volume_root: session.volume.root.display().to_string(),
            base_path: &record.base_path,
            base_filename: &record.base_filename,
            size_bytes: record.size_bytes,
            size_display: format_size_gb(record.size_bytes),
            started_at: record.started_at.as_deref(),
            finished_at: &record.finished_at,
        }
    }
}

#[derive(Serialize)]
struct ListJson<'a> {
    scan: &'a ScanSummary,
    sessions: Vec<SessionJson<'a>>,
}

/// Scan summary plus the listed sessions
pub(crate) fn output_list_json(
    summary: &ScanSummary,
    sessions: &[&IndexedSession],
    order: SortOrder,
) -> String {
    to_json(&ListJson {
        scan: summary,
        sessions: sorted(sessions, order)
            .into_iter()
            .map(SessionJson::from)
            .collect(),
    })
}
