/// The set of transactions a reader can see: every transaction that had
/// started before the snapshot was taken and was no longer running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    snap_max: u64,
    /// Ids below `snap_max` still active or prepared when the snapshot was
    /// taken. Sorted.
    concurrent: Vec<u64>,
}

impl Snapshot {
    pub fn new(snap_max: u64, mut concurrent: Vec<u64>) -> Self {
        concurrent.sort_unstable();
        concurrent.dedup();
        Self {
            snap_max,
            concurrent,
        }
    }

    #[inline]
    pub fn sees(&self, txn_id: u64) -> bool {
        txn_id < self.snap_max && self.concurrent.binary_search(&txn_id).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sees() {
        let snapshot = Snapshot::new(10, vec![7, 3, 7]);
        let tests = vec![
            (1, true),
            (3, false),
            (5, true),
            (7, false),
            (9, true),
            (10, false),
            (11, false),
        ];
        for (id, expected) in tests {
            assert_eq!(expected, snapshot.sees(id), "txn {}", id);
        }
        assert!(!Snapshot::default().sees(0));
    }
}
