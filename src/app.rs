use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::cli::{Action, Cli, FileAction, Selection, SortOrder};
use crate::config::{Config, VolumeConfig};
use crate::core::{DateFilter, IndexedSession, SessionCatalog, SessionIndex, SessionKey, VolumeTag};
use crate::error::AppError;
use crate::files::{
    ArtifactResolver, ArtifactSet, BulkFileOperation, BulkMode, BulkSummary, ProgressEvent,
    spawn,
};
use crate::output::{
    ProgressPrinter, ScanSummary, SessionTableOptions, output_artifact_json, output_bulk_json,
    output_list_json, render_artifact_table, render_bulk_summary, render_scan_summary,
    render_session_table,
};
use crate::source::{ScanReport, VolumeScanner, scan_volumes};
use crate::utils::parse_date;

pub(crate) struct CommandContext<'a> {
    pub(crate) cli: &'a Cli,
    pub(crate) filter: DateFilter,
}

impl CommandContext<'_> {
    fn order(&self) -> SortOrder {
        self.cli.order
    }

    fn device(&self) -> Option<&str> {
        self.cli.device.as_deref()
    }
}

/// Volumes to scan: `--volume` overrides replace the configured list, then
/// `--only` narrows it
pub(crate) fn resolve_volumes(cli: &Cli, config: &Config) -> Result<Vec<VolumeTag>, AppError> {
    let mut volumes = if cli.volumes.is_empty() {
        config.volume_tags()
    } else {
        cli.volumes
            .iter()
            .map(|raw| VolumeConfig::parse_override(raw).map(|v| VolumeTag::new(v.root, v.id)))
            .collect::<Result<Vec<_>, _>>()?
    };
    if !cli.only.is_empty() {
        volumes.retain(|v| cli.only.contains(&v.volume_id));
    }
    Ok(volumes)
}

pub(crate) fn date_filter(cli: &Cli) -> Result<DateFilter, AppError> {
    let since = cli.since.as_deref().map(parse_date).transpose()?;
    let until = cli.until.as_deref().map(parse_date).transpose()?;
    Ok(DateFilter::new(since, until))
}

fn scan(volumes: &[VolumeTag], config: &Config, catalog: &SessionCatalog) -> ScanReport {
    let scanner = VolumeScanner::new(&config.log_candidates, &config.marker_patterns);
    let report = scan_volumes(volumes, &scanner);
    catalog.rebuild(report.record_sets());
    report
}

/// Scan, index, and run the requested action
pub(crate) fn run(cli: &Cli, config: &Config, action: Action) -> Result<(), AppError> {
    let ctx = CommandContext {
        cli,
        filter: date_filter(cli)?,
    };
    let volumes = resolve_volumes(cli, config)?;
    debug!(volumes = volumes.len(), "scanning volumes");

    let catalog = SessionCatalog::new();
    let report = scan(&volumes, config, &catalog);
    let index = catalog.snapshot();

    match action {
        Action::List => handle_list(&ctx, &report, &index),
        Action::Files { selection, action } => {
            let sessions = select_sessions(&index, &selection, &ctx)?;
            let resolver =
                ArtifactResolver::new(&config.artifact_dir, config.recorded_roots.clone());
            let sets: Vec<ArtifactSet> = sessions.iter().map(|s| resolver.resolve(s)).collect();
            match action {
                FileAction::Show => handle_files(&ctx, &sets),
                FileAction::Copy { dest } => handle_bulk(&ctx, sets, BulkMode::Copy, dest, true),
                FileAction::Delete { assume_yes } => {
                    handle_bulk(&ctx, sets, BulkMode::Delete, None, assume_yes)
                }
            }
        }
    }
}

fn handle_list(
    ctx: &CommandContext<'_>,
    report: &ScanReport,
    index: &SessionIndex,
) -> Result<(), AppError> {
    let sessions: Vec<&IndexedSession> = index.filtered(ctx.filter, ctx.device()).collect();
    let summary = ScanSummary::new(report, index);

    if ctx.cli.json {
        println!("{}", output_list_json(&summary, &sessions, ctx.order()));
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions found.");
    } else {
        print!(
            "{}",
            render_session_table(
                &sessions,
                SessionTableOptions {
                    order: ctx.order(),
                    use_color: ctx.cli.use_color(),
                },
            )
        );
    }
    println!("{}", render_scan_summary(&summary));
    Ok(())
}

/// Sessions named by key, or every filtered session with `--all`
fn select_sessions<'a>(
    index: &'a SessionIndex,
    selection: &Selection,
    ctx: &CommandContext<'_>,
) -> Result<Vec<&'a IndexedSession>, AppError> {
    if selection.all {
        return Ok(index.filtered(ctx.filter, ctx.device()).collect());
    }
    if selection.keys.is_empty() {
        return Err(AppError::NothingSelected);
    }

    let mut seen = BTreeSet::new();
    let mut sessions = Vec::new();
    for raw in &selection.keys {
        let key: SessionKey = raw.parse()?;
        let session = index
            .lookup(&key)
            .ok_or_else(|| AppError::UnknownSession { key: raw.clone() })?;
        if seen.insert(key) {
            sessions.push(session);
        }
    }
    Ok(sessions)
}

fn handle_files(ctx: &CommandContext<'_>, sets: &[ArtifactSet]) -> Result<(), AppError> {
    if ctx.cli.json {
        println!("{}", output_artifact_json(sets));
    } else if sets.is_empty() {
        println!("No sessions selected.");
    } else {
        print!("{}", render_artifact_table(sets, ctx.cli.use_color()));
    }
    Ok(())
}

fn handle_bulk(
    ctx: &CommandContext<'_>,
    sets: Vec<ArtifactSet>,
    mode: BulkMode,
    dest: Option<PathBuf>,
    assume_yes: bool,
) -> Result<(), AppError> {
    let op = BulkFileOperation::new(mode, dest);
    op.preflight()?;

    let session_count = sets.len();
    let batches: Vec<Vec<PathBuf>> = sets
        .into_iter()
        .filter(|set| !set.is_empty())
        .map(|set| set.files)
        .collect();
    let total: usize = batches.iter().map(Vec::len).sum();

    if total == 0 {
        info!(sessions = session_count, "no files to process");
        if ctx.cli.json {
            println!("{}", output_bulk_json(&BulkSummary::new(mode)));
        } else {
            println!("No files found for the selected sessions.");
        }
        return Ok(());
    }

    if mode == BulkMode::Delete && !assume_yes {
        let prompt = format!("Delete {total} files from {session_count} sessions?");
        let stdin = io::stdin();
        let confirmed = prompt_confirm(&prompt, &mut stdin.lock(), &mut io::stderr())
            .map_err(AppError::Prompt)?;
        if !confirmed {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let handle = spawn(op, batches);
    let mut printer = ProgressPrinter::new();
    for event in handle.events.iter() {
        if ctx.cli.fail_fast && matches!(event, ProgressEvent::FileFailed { .. }) {
            handle.stop.request_stop();
        }
        eprintln!("{}", printer.line(&event));
    }
    let summary = handle.join()?;

    if ctx.cli.json {
        println!("{}", output_bulk_json(&summary));
    } else {
        print!("{}", render_bulk_summary(&summary));
    }
    Ok(())
}

/// Ask a y/N question until answered. End of input counts as "no".
fn prompt_confirm<R: BufRead, W: Write>(
    prompt: &str,
    input: &mut R,
    out: &mut W,
) -> io::Result<bool> {
    let mut line = String::new();

    loop {
        line.clear();
        write!(out, "{prompt} (y/N): ")?;
        out.flush()?;

        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }

        match line.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" | "" => return Ok(false),
            _ => continue,
        }
    }
}
