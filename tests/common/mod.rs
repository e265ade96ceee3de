#![allow(dead_code)]

use boundkv::{Cursor, Direction, Key, Table, TableOptions};
use slog::{o, Logger};
use std::sync::Arc;

/// Key formats exercised by every scenario: string, both integer spellings,
/// record number, fixed width, raw, and tuples.
pub const FORMATS: &[&str] = &["S", "q", "r", "2s", "u", "qS", "iSru"];

pub fn open(format: &str) -> Arc<Table> {
    let mut options = TableOptions::new(format);
    options.page_capacity = 4;
    options.logger = Some(Logger::root(slog::Discard, o!()));
    Table::open(options).unwrap()
}

/// The key standing for `i` in `format`. Two-digit numbers order the same
/// way in every format.
pub fn key(format: &str, i: i64) -> Key {
    let text = i.to_string();
    match format {
        "S" => Key::Str(text),
        "q" | "i" => Key::Int(i),
        "r" => Key::Recno(i as u64),
        "2s" => Key::Fixed(text.into_bytes()),
        "u" => Key::Raw(text.into_bytes()),
        "qS" => Key::Tuple(vec![Key::Int(i), Key::Str(text)]),
        "iSru" => Key::Tuple(vec![
            Key::Int(i),
            Key::Str(text.clone()),
            Key::Recno(i as u64),
            Key::Raw(text.into_bytes()),
        ]),
        other => panic!("no test keys for format {}", other),
    }
}

/// Inverse of `key`.
pub fn index_of(key: &Key) -> i64 {
    match key {
        Key::Str(s) => s.parse().unwrap(),
        Key::Int(i) => *i,
        Key::Recno(r) => *r as i64,
        Key::Fixed(b) | Key::Raw(b) => std::str::from_utf8(b).unwrap().parse().unwrap(),
        Key::Tuple(fields) => index_of(&fields[0]),
    }
}

pub fn value(i: i64) -> String {
    format!("value{}", i)
}

/// A table holding keys 40..=59, optionally with every page evicted.
pub fn populated(format: &str, evict: bool) -> Arc<Table> {
    let table = open(format);
    // out of order so pages split in the middle as well as at the ends
    for i in (40..60).rev().step_by(2).chain((40..60).step_by(2)) {
        table.insert(None, &key(format, i), value(i)).unwrap();
    }
    if evict {
        table.evict_all().unwrap();
    }
    table
}

/// Steps in `dir` until not-found and returns the keys seen.
pub fn drain(cursor: &mut Cursor, dir: Direction) -> Vec<i64> {
    let mut seen = vec![];
    loop {
        let entry = match dir {
            Direction::Forward => cursor.next(),
            Direction::Backward => cursor.prev(),
        }
        .unwrap();
        match entry {
            Some(entry) => seen.push(index_of(&entry.key)),
            None => return seen,
        }
    }
}
