//! Keyed view over the sessions of every scanned volume.
//!
//! An index is built in one pass and never edited afterwards. A rescan
//! builds a fresh index and [`SessionCatalog`] swaps it in, so readers only
//! ever hold a complete generation.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::core::types::{DateFilter, IndexedSession, SessionKey, SessionRecord, VolumeTag};

#[derive(Debug, Default)]
pub(crate) struct SessionIndex {
    sessions: BTreeMap<SessionKey, IndexedSession>,
    collisions: usize,
}

impl SessionIndex {
    /// Merge per-volume record sets. Volumes are taken in the given order and
    /// records in log order; a later record replaces an earlier one with the
    /// same key.
    pub(crate) fn build_from<'a, I>(record_sets: I) -> Self
    where
        I: IntoIterator<Item = (&'a VolumeTag, &'a [SessionRecord])>,
    {
        let mut sessions = BTreeMap::new();
        let mut collisions = 0;

        for (volume, records) in record_sets {
            for record in records {
                let session = IndexedSession::new(record.clone(), volume.clone());
                let key = session.key.clone();
                if let Some(previous) = sessions.insert(key, session) {
                    collisions += 1;
                    debug!(
                        key = %previous.key,
                        replaced = previous.record.base_filename,
                        "duplicate session key; keeping the later record"
                    );
                }
            }
        }

        Self {
            sessions,
            collisions,
        }
    }

    pub(crate) fn lookup(&self, key: &SessionKey) -> Option<&IndexedSession> {
        self.sessions.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of records that were replaced by a later record with the same key
    pub(crate) fn collisions(&self) -> usize {
        self.collisions
    }

    /// Sessions in key order
    pub(crate) fn iter(&self) -> impl Iterator<Item = &IndexedSession> {
        self.sessions.values()
    }

    pub(crate) fn filtered<'s, 'f>(
        &'s self,
        filter: DateFilter,
        device: Option<&'f str>,
    ) -> impl Iterator<Item = &'s IndexedSession> + use<'s, 'f> {
        self.iter().filter(move |s| {
            filter.contains(s.key.date) && device.is_none_or(|d| d == s.key.device_id)
        })
    }
}

/// Holder of the current index generation
#[derive(Debug, Default)]
pub(crate) struct SessionCatalog {
    current: RwLock<Arc<SessionIndex>>,
}

impl SessionCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The current generation. Holding it does not block a rebuild.
    pub(crate) fn snapshot(&self) -> Arc<SessionIndex> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Build a new generation off-lock and swap it in
    pub(crate) fn rebuild<'a, I>(&self, record_sets: I) -> Arc<SessionIndex>
    where
        I: IntoIterator<Item = (&'a VolumeTag, &'a [SessionRecord])>,
    {
        let next = Arc::new(SessionIndex::build_from(record_sets));
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        next
    }
}
