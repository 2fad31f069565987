//! Session files on disk: finding them and copying or deleting them

pub(crate) mod bulk;
pub(crate) mod resolver;

pub(crate) use bulk::{BulkFileOperation, BulkMode, BulkSummary, FileFailure, ProgressEvent, spawn};
pub(crate) use resolver::{ArtifactResolver, ArtifactSet};
