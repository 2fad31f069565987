//! Best-effort copy or delete of resolved session files.
//!
//! Files of one session are processed in order; separate sessions run in
//! parallel. A failing file is recorded and the run moves on. Progress goes
//! out as [`ProgressEvent`]s through a [`ProgressReporter`], which may be the
//! sending half of a channel read by another thread.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BulkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BulkMode {
    Copy,
    Delete,
}

impl BulkMode {
    pub(crate) fn verb(self) -> &'static str {
        match self {
            BulkMode::Copy => "Copying",
            BulkMode::Delete => "Deleting",
        }
    }
}

/// Cooperative stop request, checked between files
#[derive(Debug, Clone, Default)]
pub(crate) struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProgressEvent {
    Started { mode: BulkMode, total: usize },
    FileDone { path: PathBuf },
    FileFailed { path: PathBuf, reason: String },
    /// Files left untouched because a stop was requested
    Stopped { remaining: usize },
}

pub(crate) trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event
pub(crate) struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl ProgressReporter for Sender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A receiver that went away only stops the progress display.
        let _ = self.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct FileFailure {
    pub(crate) path: PathBuf,
    pub(crate) reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct BulkSummary {
    pub(crate) mode: BulkMode,
    pub(crate) attempted: usize,
    pub(crate) succeeded: usize,
    pub(crate) failed: Vec<FileFailure>,
    pub(crate) skipped: usize,
}

impl BulkSummary {
    pub(crate) fn new(mode: BulkMode) -> Self {
        Self {
            mode,
            attempted: 0,
            succeeded: 0,
            failed: Vec::new(),
            skipped: 0,
        }
    }

    fn merge(mut self, other: BulkSummary) -> Self {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
        self.skipped += other.skipped;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BulkFileOperation {
    mode: BulkMode,
    destination: Option<PathBuf>,
    stop: StopSignal,
}

impl BulkFileOperation {
    pub(crate) fn new(mode: BulkMode, destination: Option<PathBuf>) -> Self {
        Self {
            mode,
            destination,
            stop: StopSignal::new(),
        }
    }

    pub(crate) fn copy_to(destination: impl Into<PathBuf>) -> Self {
        Self::new(BulkMode::Copy, Some(destination.into()))
    }

    pub(crate) fn delete() -> Self {
        Self::new(BulkMode::Delete, None)
    }

    pub(crate) fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Reject runs that could not succeed for any file. Delete has no
    /// preconditions.
    pub(crate) fn preflight(&self) -> Result<(), BulkError> {
        if self.mode == BulkMode::Delete {
            return Ok(());
        }
        let dest = self.destination.as_ref().ok_or(BulkError::MissingDestination)?;
        let meta = fs::metadata(dest).map_err(|source| BulkError::DestinationUnavailable {
            path: dest.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(BulkError::DestinationNotDirectory { path: dest.clone() });
        }
        if meta.permissions().readonly() {
            return Err(BulkError::DestinationReadOnly { path: dest.clone() });
        }
        Ok(())
    }

    /// Process one list of files in order
    pub(crate) fn apply(
        &self,
        artifacts: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Result<BulkSummary, BulkError> {
        self.apply_sessions(&[artifacts], reporter)
    }

    /// Process several sessions' file lists, sessions in parallel
    pub(crate) fn apply_sessions<S>(
        &self,
        sessions: &[S],
        reporter: &dyn ProgressReporter,
    ) -> Result<BulkSummary, BulkError>
    where
        S: AsRef<[PathBuf]> + Sync,
    {
        self.preflight()?;

        let total = sessions.iter().map(|files| files.as_ref().len()).sum();
        reporter.report(ProgressEvent::Started {
            mode: self.mode,
            total,
        });

        let summary = sessions
            .par_iter()
            .map(|files| self.run_session(files.as_ref(), reporter))
            .reduce(|| BulkSummary::new(self.mode), BulkSummary::merge);

        if summary.skipped > 0 {
            reporter.report(ProgressEvent::Stopped {
                remaining: summary.skipped,
            });
        }
        Ok(summary)
    }

    fn run_session(&self, files: &[PathBuf], reporter: &dyn ProgressReporter) -> BulkSummary {
        let mut summary = BulkSummary::new(self.mode);
        for (done, path) in files.iter().enumerate() {
            if self.stop.is_stopped() {
                summary.skipped = files.len() - done;
                break;
            }
            summary.attempted += 1;
            match self.process_file(path) {
                Ok(()) => {
                    summary.succeeded += 1;
                    reporter.report(ProgressEvent::FileDone { path: path.clone() });
                }
                Err(err) => {
                    warn!(path = %path.display(), "{} failed: {err}", self.mode.verb());
                    let reason = err.to_string();
                    reporter.report(ProgressEvent::FileFailed {
                        path: path.clone(),
                        reason: reason.clone(),
                    });
                    summary.failed.push(FileFailure {
                        path: path.clone(),
                        reason,
                    });
                }
            }
        }
        summary
    }

    fn process_file(&self, path: &Path) -> io::Result<()> {
        match self.mode {
            BulkMode::Delete => fs::remove_file(path),
            BulkMode::Copy => {
                let dest_dir = self
                    .destination
                    .as_deref()
                    .ok_or_else(|| io::Error::other("no destination"))?;
                let name = path
                    .file_name()
                    .ok_or_else(|| io::Error::other("path has no file name"))?;
                let target = dest_dir.join(name);
                copy_new(path, &target)
            }
        }
    }
}

/// Copy `from` to a `to` that must not exist yet. Sessions copied in
/// parallel can share a filename; the second one fails instead of
/// overwriting the first.
fn copy_new(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from)?;
    let mut target = File::options()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ),
            _ => err,
        })?;
    io::copy(&mut source, &mut target)?;

    if let Err(err) = source.metadata().and_then(|meta| {
        target.set_permissions(meta.permissions())?;
        target.set_modified(meta.modified()?)
    }) {
        debug!(path = %to.display(), "could not preserve metadata: {err}");
    }
    Ok(())
}

/// A bulk operation running on its own thread
pub(crate) struct BulkHandle {
    pub(crate) events: Receiver<ProgressEvent>,
    pub(crate) stop: StopSignal,
    worker: JoinHandle<Result<BulkSummary, BulkError>>,
}

impl BulkHandle {
    pub(crate) fn join(self) -> Result<BulkSummary, BulkError> {
        self.worker
            .join()
            .unwrap_or(Err(BulkError::WorkerPanicked))
    }
}

/// Start `op` over `sessions` on a worker thread. Events arrive on
/// `handle.events` until the worker finishes.
pub(crate) fn spawn(op: BulkFileOperation, sessions: Vec<Vec<PathBuf>>) -> BulkHandle {
    let (tx, rx) = mpsc::channel();
    let stop = op.stop_signal();
    let worker = thread::spawn(move || op.apply_sessions(&sessions, &tx));
    BulkHandle {
        events: rx,
        stop,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl ProgressReporter for Recorder {
        fn report(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn make_files(dir: &Path, count: usize) -> Vec<PathBuf> {
        (1..=count)
            .map(|i| {
                let path = dir.join(format!("010122_055.{i:03}"));
                fs::write(&path, format!("payload {i}")).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn delete_isolates_a_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        let files = make_files(dir.path(), 5);
        // A directory cannot be removed with remove_file.
        fs::remove_file(&files[2]).unwrap();
        fs::create_dir(&files[2]).unwrap();

        let recorder = Recorder::default();
        let summary = BulkFileOperation::delete().apply(&files, &recorder).unwrap();

        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.succeeded, 4);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].path, files[2]);
        assert!(!summary.failed[0].reason.is_empty());
        for (i, f) in files.iter().enumerate() {
            assert_eq!(f.exists(), i == 2);
        }

        let events = recorder.0.lock().unwrap();
        assert_eq!(
            events[0],
            ProgressEvent::Started {
                mode: BulkMode::Delete,
                total: 5
            }
        );
        assert!(matches!(events[3], ProgressEvent::FileFailed { .. }));
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn copy_duplicates_files_and_keeps_sources() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let files = make_files(src.path(), 3);

        let summary = BulkFileOperation::copy_to(dest.path())
            .apply(&files, &SilentReporter)
            .unwrap();

        assert_eq!(summary.succeeded, 3);
        assert!(summary.failed.is_empty());
        for f in &files {
            assert!(f.exists());
            let copied = dest.path().join(f.file_name().unwrap());
            assert_eq!(fs::read(f).unwrap(), fs::read(&copied).unwrap());
            assert_eq!(
                fs::metadata(f).unwrap().modified().unwrap(),
                fs::metadata(&copied).unwrap().modified().unwrap()
            );
        }
    }

    #[test]
    fn copy_never_overwrites_a_shared_filename() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let vol_a = src.path().join("61");
        let vol_b = src.path().join("62");
        fs::create_dir_all(&vol_a).unwrap();
        fs::create_dir_all(&vol_b).unwrap();
        let a = vol_a.join("010122_055.000");
        let b = vol_b.join("010122_055.000");
        fs::write(&a, "from 61").unwrap();
        fs::write(&b, "from 62").unwrap();

        let summary = BulkFileOperation::copy_to(dest.path())
            .apply_sessions(&[vec![a.clone()], vec![b.clone()]], &SilentReporter)
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].reason.contains("already exists"));

        let copied = fs::read_to_string(dest.path().join("010122_055.000")).unwrap();
        let winner = if summary.failed[0].path == a { "from 62" } else { "from 61" };
        assert_eq!(copied, winner);
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 1);
    }

    #[test]
    fn copy_records_missing_source_and_continues() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let mut files = make_files(src.path(), 2);
        files.insert(1, src.path().join("010122_055.gone"));

        let summary = BulkFileOperation::copy_to(dest.path())
            .apply(&files, &SilentReporter)
            .unwrap();
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed[0].path, files[1]);
    }

    #[test]
    fn copy_without_usable_destination_aborts_early() {
        let src = tempfile::tempdir().unwrap();
        let files = make_files(src.path(), 1);

        let missing = BulkFileOperation::new(BulkMode::Copy, None).apply(&files, &SilentReporter);
        assert!(matches!(missing, Err(BulkError::MissingDestination)));

        let not_dir = BulkFileOperation::copy_to(&files[0]).apply(&files, &SilentReporter);
        assert!(matches!(not_dir, Err(BulkError::DestinationNotDirectory { .. })));

        let gone = BulkFileOperation::copy_to(src.path().join("nope")).apply(&files, &SilentReporter);
        assert!(matches!(gone, Err(BulkError::DestinationUnavailable { .. })));
    }

    #[test]
    fn read_only_destination_aborts_early() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let files = make_files(src.path(), 1);

        let mut perms = fs::metadata(dest.path()).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(dest.path(), perms.clone()).unwrap();

        let result = BulkFileOperation::copy_to(dest.path()).apply(&files, &SilentReporter);

        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(dest.path(), perms).unwrap();

        assert!(matches!(result, Err(BulkError::DestinationReadOnly { .. })));
        assert!(files[0].exists());
    }

    #[test]
    fn destination_is_ignored_for_delete() {
        let dir = tempfile::tempdir().unwrap();
        let files = make_files(dir.path(), 1);
        let op = BulkFileOperation::new(BulkMode::Delete, Some(dir.path().join("nope")));
        let summary = op.apply(&files, &SilentReporter).unwrap();
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn stop_before_start_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let files = make_files(dir.path(), 4);
        let op = BulkFileOperation::delete();
        op.stop_signal().request_stop();

        let recorder = Recorder::default();
        let summary = op.apply(&files, &recorder).unwrap();
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.skipped, 4);
        assert!(files.iter().all(|f| f.exists()));
        assert_eq!(
            recorder.0.lock().unwrap().last(),
            Some(&ProgressEvent::Stopped { remaining: 4 })
        );
    }

    /// Raises the stop signal on the first failed file
    struct StopOnFailure {
        stop: StopSignal,
        events: Recorder,
    }

    impl ProgressReporter for StopOnFailure {
        fn report(&self, event: ProgressEvent) {
            if matches!(event, ProgressEvent::FileFailed { .. }) {
                self.stop.request_stop();
            }
            self.events.report(event);
        }
    }

    #[test]
    fn stop_after_a_failure_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let files = make_files(dir.path(), 5);
        fs::remove_file(&files[1]).unwrap();
        fs::create_dir(&files[1]).unwrap();

        let op = BulkFileOperation::delete();
        let reporter = StopOnFailure {
            stop: op.stop_signal(),
            events: Recorder::default(),
        };
        let summary = op.apply(&files, &reporter).unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.skipped, 3);
        assert!(!files[0].exists());
        assert!(files[2..].iter().all(|f| f.exists()));
        assert_eq!(
            reporter.events.0.lock().unwrap().last(),
            Some(&ProgressEvent::Stopped { remaining: 3 })
        );
    }

    #[test]
    fn sessions_run_on_a_worker_and_report_through_channel() {
        let dir = tempfile::tempdir().unwrap();
        let a_dir = dir.path().join("a");
        let b_dir = dir.path().join("b");
        fs::create_dir_all(&a_dir).unwrap();
        fs::create_dir_all(&b_dir).unwrap();
        let a = make_files(&a_dir, 2);
        let b = make_files(&b_dir, 3);

        let handle = spawn(BulkFileOperation::delete(), vec![a.clone(), b.clone()]);
        let events: Vec<ProgressEvent> = handle.events.iter().collect();
        let summary = handle.join().unwrap();

        assert_eq!(summary.succeeded, 5);
        assert_eq!(events.len(), 6);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::FileDone { .. }))
                .count(),
            5
        );
        assert!(a.iter().chain(&b).all(|f| !f.exists()));
    }
}
