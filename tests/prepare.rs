mod common;

use boundkv::{BoundSide, CursorOptions, Direction, Error, Position, TxnOptions};
use common::{drain, index_of, key, populated, FORMATS};

#[test]
fn test_own_prepared_transaction_blocks_positioning() {
    for format in FORMATS {
        let table = populated(format, false);
        let txn = table.begin_transaction(TxnOptions::default());
        table.insert(Some(&txn), &key(format, 61), "mine").unwrap();
        table.prepare(&txn).unwrap();

        let mut cursor = table.open_cursor(CursorOptions::default());
        cursor.set_transaction(Some(txn.clone()));
        cursor.set_key(&key(format, 45)).unwrap();

        for op in vec!["next", "prev", "search", "search_near"] {
            let res = match op {
                "next" => cursor.next().map(|e| e.is_some()),
                "prev" => cursor.prev().map(|e| e.is_some()),
                "search" => cursor.search().map(|e| e.is_some()),
                _ => cursor.search_near().map(|e| e.is_some()),
            };
            match res {
                Err(Error::PreparedTransaction(name)) => assert_eq!(op, name),
                other => panic!("{} in a prepared transaction returned {:?}", op, other),
            }
            assert_eq!(&Position::Unpositioned, cursor.position());
        }
        let err = cursor.next().unwrap_err();
        assert_eq!("next not permitted in a prepared transaction", err.to_string());

        // bound configuration is still allowed
        cursor.bound("bound=lower").unwrap();
        cursor.bound("action=clear").unwrap();
        cursor.set_bound(BoundSide::Upper, &key(format, 50), true).unwrap();

        table.commit(&txn).unwrap();
        assert_eq!(
            (40..51).collect::<Vec<_>>(),
            drain(&mut cursor, Direction::Forward)
        );
    }
}

#[test]
fn test_own_prepare_mid_traversal_keeps_position() {
    let table = populated("S", true);
    let txn = table.begin_transaction(TxnOptions::default());
    let mut cursor = table.open_cursor(CursorOptions::default());
    cursor.set_transaction(Some(txn.clone()));
    assert_eq!(40, index_of(&cursor.next().unwrap().unwrap().key));
    assert_eq!(41, index_of(&cursor.next().unwrap().unwrap().key));

    table.prepare(&txn).unwrap();
    assert!(cursor.next().is_err());
    assert_eq!(41, index_of(&cursor.get_key().unwrap()));

    table.rollback(&txn).unwrap();
    assert_eq!(42, index_of(&cursor.next().unwrap().unwrap().key));
}

#[test]
fn test_foreign_prepared_update_conflicts() {
    for format in FORMATS {
        for evict in vec![false, true] {
            let table = populated(format, evict);
            let writer = table.begin_transaction(TxnOptions::default());
            table.insert(Some(&writer), &key(format, 45), "prepared").unwrap();
            table.prepare(&writer).unwrap();

            let mut cursor = table.open_cursor(CursorOptions::default());
            for i in 40..45 {
                assert_eq!(i, index_of(&cursor.next().unwrap().unwrap().key));
            }
            for _ in 0..2 {
                match cursor.next() {
                    Err(Error::PreparedConflict(_)) => {}
                    other => panic!("expected a prepared conflict, got {:?}", other),
                }
                // the failed call leaves the cursor where it was
                assert_eq!(44, index_of(&cursor.get_key().unwrap()));
            }

            cursor.set_key(&key(format, 45)).unwrap();
            assert!(matches!(cursor.search(), Err(Error::PreparedConflict(_))));
            assert!(matches!(cursor.search_near(), Err(Error::PreparedConflict(_))));

            table.commit(&writer).unwrap();
            let entry = cursor.search().unwrap().unwrap();
            assert_eq!(&b"prepared"[..], &entry.value[..]);
            assert_eq!(
                (46..60).collect::<Vec<_>>(),
                drain(&mut cursor, Direction::Forward),
                "format {} evict {}",
                format,
                evict
            );
        }
    }
}

#[test]
fn test_foreign_prepared_backward() {
    let table = populated("q", false);
    let writer = table.begin_transaction(TxnOptions::default());
    table.remove(Some(&writer), &key("q", 57)).unwrap();
    table.prepare(&writer).unwrap();

    let mut cursor = table.open_cursor(CursorOptions::default());
    assert_eq!(59, index_of(&cursor.prev().unwrap().unwrap().key));
    assert_eq!(58, index_of(&cursor.prev().unwrap().unwrap().key));
    assert!(matches!(cursor.prev(), Err(Error::PreparedConflict(_))));

    table.commit(&writer).unwrap();
    assert_eq!(56, index_of(&cursor.prev().unwrap().unwrap().key));
}

#[test]
fn test_ignore_prepare_reads_past_prepared_updates() {
    for format in FORMATS {
        let table = populated(format, false);
        let writer = table.begin_transaction(TxnOptions::default());
        table.insert(Some(&writer), &key(format, 45), "prepared").unwrap();
        table.insert(Some(&writer), &key(format, 70), "new").unwrap();
        table.prepare(&writer).unwrap();

        let reader = table.begin_transaction(TxnOptions {
            ignore_prepare: true,
        });
        let mut cursor = table.open_cursor(CursorOptions::default());
        cursor.set_transaction(Some(reader));
        assert_eq!(
            (40..60).collect::<Vec<_>>(),
            drain(&mut cursor, Direction::Forward)
        );

        cursor.set_key(&key(format, 45)).unwrap();
        let entry = cursor.search().unwrap().unwrap();
        assert_eq!(common::value(45).as_bytes(), &entry.value[..]);
        cursor.set_key(&key(format, 70)).unwrap();
        assert!(cursor.search().unwrap().is_none());
        assert!(table.stats().cursor_next_skip >= 1);
    }
}

#[test]
fn test_prepared_key_outside_bounds_is_not_read() {
    for format in FORMATS {
        let table = populated(format, false);
        let writer = table.begin_transaction(TxnOptions::default());
        table.insert(Some(&writer), &key(format, 50), "prepared").unwrap();
        table.insert(Some(&writer), &key(format, 41), "prepared").unwrap();
        table.prepare(&writer).unwrap();

        let mut cursor = table.open_cursor(CursorOptions::default());
        cursor.set_bound(BoundSide::Lower, &key(format, 41), false).unwrap();
        cursor.set_bound(BoundSide::Upper, &key(format, 50), false).unwrap();
        assert_eq!(
            (42..50).collect::<Vec<_>>(),
            drain(&mut cursor, Direction::Forward)
        );
        assert_eq!(
            (42..50).rev().collect::<Vec<_>>(),
            drain(&mut cursor, Direction::Backward)
        );
    }
}

#[test]
fn test_rolled_back_prepare_is_invisible() {
    let table = populated("iSru", true);
    let writer = table.begin_transaction(TxnOptions::default());
    table.insert(Some(&writer), &key("iSru", 45), "gone").unwrap();
    table.remove(Some(&writer), &key("iSru", 46)).unwrap();
    table.prepare(&writer).unwrap();
    table.rollback(&writer).unwrap();

    let mut cursor = table.open_cursor(CursorOptions::default());
    assert_eq!(20, drain(&mut cursor, Direction::Forward).len());
    cursor.set_key(&key("iSru", 45)).unwrap();
    let entry = cursor.search().unwrap().unwrap();
    assert_eq!(common::value(45).as_bytes(), &entry.value[..]);
}

#[test]
fn test_snapshot_isolation() {
    let table = populated("S", false);
    let reader = table.begin_transaction(TxnOptions::default());
    table.insert(None, &key("S", 60), "late").unwrap();
    table.remove(None, &key("S", 41)).unwrap();

    let mut snapshot_cursor = table.open_cursor(CursorOptions::default());
    snapshot_cursor.set_transaction(Some(reader.clone()));
    assert_eq!(
        (40..60).collect::<Vec<_>>(),
        drain(&mut snapshot_cursor, Direction::Forward)
    );

    let mut latest = table.open_cursor(CursorOptions::default());
    let mut want: Vec<i64> = (40..61).collect();
    want.retain(|k| *k != 41);
    assert_eq!(want, drain(&mut latest, Direction::Forward));

    let stats = table.stats();
    assert!(stats.cursor_next_skip >= 2);

    // a finished transaction stops pinning its snapshot
    table.commit(&reader).unwrap();
    assert_eq!(want, drain(&mut snapshot_cursor, Direction::Forward));
}

#[test]
fn test_own_writes_are_visible() {
    let table = populated("q", false);
    let txn = table.begin_transaction(TxnOptions::default());
    table.insert(Some(&txn), &key("q", 61), "mine").unwrap();
    table.remove(Some(&txn), &key("q", 40)).unwrap();

    let mut own = table.open_cursor(CursorOptions::default());
    own.set_transaction(Some(txn.clone()));
    let mut want: Vec<i64> = (41..60).collect();
    want.push(61);
    assert_eq!(want, drain(&mut own, Direction::Forward));

    let mut other = table.open_cursor(CursorOptions::default());
    assert_eq!(
        (40..60).collect::<Vec<_>>(),
        drain(&mut other, Direction::Forward)
    );
}

#[test]
fn test_backward_walk_counts_skipped_keys() {
    for format in FORMATS {
        let table = populated(format, true);
        table.remove(None, &key(format, 57)).unwrap();
        let writer = table.begin_transaction(TxnOptions::default());
        table.insert(Some(&writer), &key(format, 65), "uncommitted").unwrap();
        table.remove(Some(&writer), &key(format, 53)).unwrap();

        let before = table.stats();
        let mut cursor = table.open_cursor(CursorOptions::default());
        cursor.set_bound(BoundSide::Lower, &key(format, 50), true).unwrap();
        let mut want: Vec<i64> = (50..60).rev().collect();
        want.retain(|k| *k != 57);
        assert_eq!(want, drain(&mut cursor, Direction::Backward));

        // 65 has only an uncommitted insert and 57 is removed; the
        // uncommitted removal of 53 hides nothing
        let after = table.stats();
        assert_eq!(before.cursor_prev_skip + 2, after.cursor_prev_skip, "format {}", format);
        assert_eq!(before.cursor_next_skip, after.cursor_next_skip);
        table.rollback(&writer).unwrap();
    }
}

#[test]
fn test_autocommit_writes_leave_no_transactions_behind() {
    let table = populated("q", false);
    for i in 0..1_000 {
        table.insert(None, &key("q", 100 + i), "v").unwrap();
        table.remove(None, &key("q", 100 + i)).unwrap();
    }
    let reader = table.begin_transaction(TxnOptions::default());
    assert_eq!(1, table.txn_manager().tracked());
    table.commit(&reader).unwrap();
    assert_eq!(0, table.txn_manager().tracked());

    let mut cursor = table.open_cursor(CursorOptions::default());
    assert_eq!(
        (40..60).collect::<Vec<_>>(),
        drain(&mut cursor, Direction::Forward)
    );
}
