use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Invalid date \"{input}\" (expected YYYYMMDD or YYYY-MM-DD)")]
    InvalidDate { input: String },

    #[error("Invalid volume \"{input}\" (expected ROOT=ID, e.g. Y:/=62)")]
    InvalidVolume { input: String },

    #[error("Failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("{0}")]
    Key(#[from] KeyParseError),

    #[error("No session matches {key}")]
    UnknownSession { key: String },

    #[error("No sessions selected (pass one or more keys, or --all)")]
    NothingSelected,

    #[error("Failed to read confirmation: {0}")]
    Prompt(std::io::Error),

    #[error("{0}")]
    Bulk(#[from] BulkError),
}

#[derive(Debug, Error)]
#[error("Invalid session key \"{input}\": {reason}")]
pub(crate) struct KeyParseError {
    pub(crate) input: String,
    pub(crate) reason: String,
}

/// A log stream that could not be turned into records at all
#[derive(Debug, Error)]
pub(crate) enum LogError {
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read line {line} of {}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: usize,
        source: std::io::Error,
    },
}

/// Conditions that stop a bulk operation before any file is touched
#[derive(Debug, Error)]
pub(crate) enum BulkError {
    #[error("Copy needs a destination directory")]
    MissingDestination,

    #[error("Destination {} is not usable: {source}", path.display())]
    DestinationUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Destination {} is not a directory", path.display())]
    DestinationNotDirectory { path: PathBuf },

    #[error("Destination {} is read-only", path.display())]
    DestinationReadOnly { path: PathBuf },

    #[error("Bulk file worker stopped unexpectedly")]
    WorkerPanicked,
}
