use comfy_table::{Cell, Color};

use crate::files::ArtifactSet;
use crate::output::format::{create_styled_table, format_number, header_cell, styled_cell, to_json};

/// One row per file, grouped under the session that owns it
pub(crate) fn render_artifact_table(sets: &[ArtifactSet], use_color: bool) -> String {
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("Session", use_color),
        header_cell("Directory", use_color),
        header_cell("File", use_color),
    ]);

    let dim = if use_color { Some(Color::DarkGrey) } else { None };
    let mut total = 0;
    for set in sets {
        let dir = set
            .dir
            .as_ref()
            .map_or_else(|| "-".to_string(), |d| d.display().to_string());
        if set.is_empty() {
            table.add_row(vec![
                Cell::new(set.key.to_string()),
                Cell::new(&dir),
                styled_cell("(no files)", dim, false),
            ]);
            continue;
        }
        for (i, file) in set.files.iter().enumerate() {
            let name = file
                .file_name()
                .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
            let (key, dir) = if i == 0 {
                (set.key.to_string(), dir.clone())
            } else {
                (String::new(), String::new())
            };
            table.add_row(vec![Cell::new(key), Cell::new(dir), Cell::new(name)]);
        }
        total += set.files.len();
    }

    format!(
        "\n{table}\n\n  {} files in {} sessions\n",
        format_number(total),
        sets.len()
    )
}

pub(crate) fn output_artifact_json(sets: &[ArtifactSet]) -> String {
    to_json(&sets)
}
