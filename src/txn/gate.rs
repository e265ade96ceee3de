use super::{Transaction, TxnManager, TxnState};
use crate::storage::Version;
use bytes::Bytes;

/// How one update looks to a reading transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Invisible,
    /// Written by another transaction that is prepared but not resolved.
    ForeignPrepared,
}

/// Decides which updates a transaction may read.
pub trait TransactionGate: Send + Sync {
    fn classify(&self, version: &Version, reader: &Transaction) -> Visibility;
}

impl TransactionGate for TxnManager {
    fn classify(&self, version: &Version, reader: &Transaction) -> Visibility {
        if reader.id() != 0 && version.txn_id == reader.id() {
            return Visibility::Visible;
        }
        match self.state_of(version.txn_id) {
            TxnState::Prepared => Visibility::ForeignPrepared,
            TxnState::Committed if reader.snapshot().sees(version.txn_id) => Visibility::Visible,
            _ => Visibility::Invisible,
        }
    }
}

/// The outcome of reading one key's update chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolved {
    Value(Bytes),
    /// No visible update, or the visible update is a removal.
    Hidden,
    Conflict,
}

/// Walks `versions` newest first and returns what `reader` reads.
pub(crate) fn resolve<G: TransactionGate + ?Sized>(
    gate: &G,
    versions: &[Version],
    reader: &Transaction,
) -> Resolved {
    for version in versions {
        match gate.classify(version, reader) {
            Visibility::Visible => {
                return match &version.value {
                    Some(value) => Resolved::Value(value.clone()),
                    None => Resolved::Hidden,
                }
            }
            Visibility::ForeignPrepared if !reader.ignore_prepare() => return Resolved::Conflict,
            Visibility::ForeignPrepared | Visibility::Invisible => {}
        }
    }
    Resolved::Hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TxnOptions;
    use slog::{o, Logger};

    fn manager() -> TxnManager {
        TxnManager::new(Logger::root(slog::Discard, o!()))
    }

    fn put(id: u64, v: &'static [u8]) -> Version {
        Version::put(id, Bytes::from_static(v))
    }

    #[test]
    fn test_committed_before_snapshot_is_visible() {
        let m = manager();
        let w = m.begin(TxnOptions::default());
        m.commit(&w).unwrap();
        let r = m.begin(TxnOptions::default());
        let versions = vec![put(w.id(), b"v")];
        assert_eq!(Resolved::Value(Bytes::from_static(b"v")), resolve(&m, &versions, &r));
    }

    #[test]
    fn test_concurrent_commit_is_invisible() {
        let m = manager();
        let w = m.begin(TxnOptions::default());
        let r = m.begin(TxnOptions::default());
        m.commit(&w).unwrap();
        let versions = vec![put(w.id(), b"new")];
        assert_eq!(Resolved::Hidden, resolve(&m, &versions, &r));
        assert_eq!(
            Resolved::Value(Bytes::from_static(b"new")),
            resolve(&m, &versions, &m.implicit())
        );
    }

    #[test]
    fn test_foreign_prepared() {
        let m = manager();
        let old = m.begin(TxnOptions::default());
        m.commit(&old).unwrap();
        let w = m.begin(TxnOptions::default());
        m.prepare(&w).unwrap();
        let versions = vec![put(w.id(), b"prepared"), put(old.id(), b"old")];

        let r = m.begin(TxnOptions::default());
        assert_eq!(Resolved::Conflict, resolve(&m, &versions, &r));
        let r = m.begin(TxnOptions { ignore_prepare: true });
        assert_eq!(Resolved::Value(Bytes::from_static(b"old")), resolve(&m, &versions, &r));
        assert_eq!(Visibility::Visible, m.classify(&versions[0], &w));
    }

    #[test]
    fn test_tombstone_and_aborted() {
        let m = manager();
        let a = m.begin(TxnOptions::default());
        m.commit(&a).unwrap();
        let b = m.begin(TxnOptions::default());
        m.rollback(&b).unwrap();
        let c = m.begin(TxnOptions::default());
        m.commit(&c).unwrap();

        let r = m.implicit();
        let versions = vec![put(b.id(), b"aborted"), put(a.id(), b"a")];
        assert_eq!(Resolved::Value(Bytes::from_static(b"a")), resolve(&m, &versions, &r));
        let versions = vec![Version::tombstone(c.id()), put(a.id(), b"a")];
        assert_eq!(Resolved::Hidden, resolve(&m, &versions, &r));
        assert_eq!(Resolved::Hidden, resolve(&m, &[], &r));
    }
}
