//! Ordered, versioned entry storage.
//!
//! Storage hands out entries by key only: a cursor remembers the key it last
//! returned and asks for its neighbour on the next step, so any page may be
//! evicted and reloaded between two cursor calls.

pub mod evictor;
pub mod mem;
mod page;

use crate::Result;
use bytes::Bytes;

/// How `Storage::seek` picks an entry relative to a packed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekMode {
    First,
    Last,
    Exact(Bytes),
    AtOrAfter(Bytes),
    After(Bytes),
    AtOrBefore(Bytes),
    Before(Bytes),
}

/// One update of a key. `value == None` is a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub txn_id: u64,
    pub value: Option<Bytes>,
}

impl Version {
    pub fn put(txn_id: u64, value: Bytes) -> Self {
        Self {
            txn_id,
            value: Some(value),
        }
    }

    pub fn tombstone(txn_id: u64) -> Self {
        Self { txn_id, value: None }
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// A stored key with its update chain, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: Bytes,
    pub versions: Vec<Version>,
}

pub trait Storage: Send + Sync {
    /// Returns the entry `mode` selects, or `None` past either end of the
    /// table.
    fn seek(&self, mode: &SeekMode) -> Result<Option<Candidate>>;

    /// Pushes `version` onto the front of `key`'s update chain, creating the
    /// entry if needed.
    fn append(&self, key: Bytes, version: Version) -> Result<()>;

    /// Hint that the caller is done with the page holding `key`.
    fn release(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }
}
