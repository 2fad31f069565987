//! Core module - session data model and the keyed session index

mod index;
mod types;

pub(crate) use index::{SessionCatalog, SessionIndex};
#[cfg(test)]
pub(crate) use types::sample_record;
pub(crate) use types::{
    DateFilter, IndexedSession, SessionKey, SessionRecord, VolumeTag, decode_ddmmyy,
};
