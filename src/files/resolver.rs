//! Finds the on-disk files that belong to a session.
//!
//! A session's files live in one directory and share a filename prefix.
//! The directory is taken from the first usable candidate:
//!
//! 1. the log's base path with a recorded device root (e.g. `D:/`) rewritten
//!    to the volume root the log was found on;
//! 2. the log's base path as written, when it is an absolute, existing path;
//! 3. the configured artifact directory under the volume root, matched with
//!    the simplified `DDMMYY_device` prefix.
//!
//! Nothing is cached: every call looks at the filesystem again.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{IndexedSession, SessionKey};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Files resolved for one session. An empty `files` list is a normal result.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ArtifactSet {
    pub(crate) key: SessionKey,
    /// Directory that was searched, if any candidate existed
    pub(crate) dir: Option<PathBuf>,
    pub(crate) prefix: String,
    pub(crate) files: Vec<PathBuf>,
}

impl ArtifactSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ArtifactResolver {
    artifact_dir: PathBuf,
    recorded_roots: Vec<String>,
}

impl ArtifactResolver {
    pub(crate) fn new(artifact_dir: impl Into<PathBuf>, recorded_roots: Vec<String>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            recorded_roots,
        }
    }

    pub(crate) fn resolve(&self, session: &IndexedSession) -> ArtifactSet {
        let Some((dir, prefix)) = self.search_dir(session) else {
            info!(key = %session.key, "no artifact directory exists for session");
            return ArtifactSet {
                key: session.key.clone(),
                dir: None,
                prefix: session.record.base_filename.clone(),
                files: Vec::new(),
            };
        };

        let files = matching_files(&dir, &prefix);
        info!(
            key = %session.key,
            dir = %dir.display(),
            prefix = %prefix,
            files = files.len(),
            "resolved artifacts"
        );
        ArtifactSet {
            key: session.key.clone(),
            dir: Some(dir),
            prefix,
            files,
        }
    }

    fn search_dir(&self, session: &IndexedSession) -> Option<(PathBuf, String)> {
        let record = &session.record;
        let root = &session.volume.root;

        if let Some(dir) = self.rebase(&record.base_path, root)
            && dir.is_dir()
        {
            return Some((dir, record.base_filename.clone()));
        }

        let recorded = Path::new(&record.base_path);
        if recorded.is_absolute() && recorded.is_dir() {
            return Some((recorded.to_path_buf(), record.base_filename.clone()));
        }

        let fallback = root.join(&self.artifact_dir);
        debug!(
            key = %session.key,
            base_path = %record.base_path,
            fallback = %fallback.display(),
            "recorded base path not usable; using artifact directory"
        );
        fallback
            .is_dir()
            .then(|| (fallback, session.key.simplified()))
    }

    /// Rewrite a recorded device root to the volume root
    fn rebase(&self, base_path: &str, root: &Path) -> Option<PathBuf> {
        let normalized = base_path.replace('\\', "/");
        self.recorded_roots.iter().find_map(|recorded| {
            let recorded = recorded.replace('\\', "/");
            let rest = strip_prefix_ignore_case(&normalized, &recorded)?;
            let mut dir = root.to_path_buf();
            dir.extend(rest.split('/').filter(|part| !part.is_empty()));
            Some(dir)
        })
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

/// Regular files directly inside `dir` whose name starts with `prefix`,
/// in filename order. A digit right after the prefix means another device
/// id (`010122_5` must not take `010122_55.000`).
pub(crate) fn matching_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{}*",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(prefix)
    );
    let entries = match glob::glob_with(&pattern, MATCH_OPTIONS) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(pattern = %pattern, "invalid artifact pattern: {err}");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("skipping unreadable artifact: {err}");
                None
            }
        })
        .filter(|path| ends_prefix(path, prefix) && path.is_file())
        .collect();
    files.sort();
    files
}

fn ends_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix(prefix))
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{VolumeTag, sample_record};
    use std::fs;

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    fn session_on(root: &Path, base_path: &str) -> IndexedSession {
        let mut record = sample_record((2022, 1, 1), "055");
        record.base_path = base_path.to_string();
        IndexedSession::new(record, VolumeTag::new(root, 61))
    }

    fn resolver() -> ArtifactResolver {
        ArtifactResolver::new("!shu_fd/das", vec!["D:/".to_string()])
    }

    fn names_of(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn names(set: &ArtifactSet) -> Vec<String> {
        names_of(&set.files)
    }

    #[test]
    fn resolves_exactly_the_prefixed_files() {
        let vol = tempfile::tempdir().unwrap();
        let das = vol.path().join("das");
        touch(
            &das,
            &[
                "010122_055.000",
                "010122_055.001",
                "010122_055.idx",
                "010122_056.000",
                "020122_055.000",
            ],
        );

        let set = resolver().resolve(&session_on(vol.path(), "D:/das"));
        assert_eq!(set.dir.as_deref(), Some(das.as_path()));
        assert_eq!(names(&set), vec!["010122_055.000", "010122_055.001", "010122_055.idx"]);
    }

    #[test]
    fn shorter_device_id_does_not_take_longer_ones() {
        let vol = tempfile::tempdir().unwrap();
        let das = vol.path().join("das");
        touch(
            &das,
            &["010122_5.000", "010122_5.001", "010122_55.000", "010122_55.001", "010122_555.000"],
        );

        assert_eq!(
            names_of(&matching_files(&das, "010122_5")),
            vec!["010122_5.000", "010122_5.001"]
        );
        assert_eq!(
            names_of(&matching_files(&das, "010122_55")),
            vec!["010122_55.000", "010122_55.001"]
        );
    }

    #[test]
    fn matching_is_case_preserving_and_not_recursive() {
        let vol = tempfile::tempdir().unwrap();
        let das = vol.path().join("das");
        touch(&das, &["010122_055.000", "010122_055.DAT"]);
        touch(&das.join("010122_055.sub"), &["010122_055.002"]);

        let set = resolver().resolve(&session_on(vol.path(), "d:\\das"));
        assert_eq!(names(&set), vec!["010122_055.000", "010122_055.DAT"]);
    }

    #[test]
    fn falls_back_to_artifact_dir_with_simplified_prefix() {
        let vol = tempfile::tempdir().unwrap();
        let das = vol.path().join("!shu_fd").join("das");
        touch(&das, &["010122_055.000", "010122_055.001", "other.000"]);

        let set = resolver().resolve(&session_on(vol.path(), "E:/elsewhere"));
        assert_eq!(set.dir.as_deref(), Some(das.as_path()));
        assert_eq!(set.prefix, "010122_055");
        assert_eq!(set.files.len(), 2);
    }

    #[test]
    fn absolute_recorded_path_is_used_as_is() {
        let vol = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        touch(elsewhere.path(), &["010122_055.000"]);

        let base = elsewhere.path().to_string_lossy().into_owned();
        let set = resolver().resolve(&session_on(vol.path(), &base));
        assert_eq!(set.files.len(), 1);
    }

    #[test]
    fn nothing_matching_is_an_empty_set() {
        let vol = tempfile::tempdir().unwrap();
        touch(&vol.path().join("das"), &["999999_1.000"]);
        let set = resolver().resolve(&session_on(vol.path(), "D:/das"));
        assert!(set.is_empty());
        assert!(set.dir.is_some());

        let bare = tempfile::tempdir().unwrap();
        let set = resolver().resolve(&session_on(bare.path(), "E:/nowhere"));
        assert!(set.is_empty());
        assert!(set.dir.is_none());
    }

    #[test]
    fn glob_metacharacters_in_names_are_literal() {
        let vol = tempfile::tempdir().unwrap();
        let dir = vol.path().join("[das]");
        touch(&dir, &["010122_055.000"]);
        assert_eq!(matching_files(&dir, "010122_055").len(), 1);
        assert!(matching_files(&dir, "010122_05?").is_empty());
    }

    #[test]
    fn resolution_is_stable() {
        let vol = tempfile::tempdir().unwrap();
        touch(
            &vol.path().join("das"),
            &["010122_055.003", "010122_055.001", "010122_055.002"],
        );
        let session = session_on(vol.path(), "D:/das");
        let first = resolver().resolve(&session);
        let second = resolver().resolve(&session);
        assert_eq!(first.files, second.files);
        assert_eq!(
            names(&first),
            vec!["010122_055.001", "010122_055.002", "010122_055.003"]
        );
    }
}
