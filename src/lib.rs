mod cursor;
mod error;
mod key;
mod options;
mod stats;
pub mod storage;
mod table;
pub mod txn;
mod util;

pub use cursor::bound::{Bound, BoundSet, BoundSide};
pub use cursor::{Cursor, Direction, Entry, NearMatch, Position};
pub use error::{Error, Result};
pub use key::{FieldType, Key, KeyFormat};
pub use options::{
    BoundAction, BoundConfig, CompressionType, CursorOptions, TableOptions, TxnOptions,
    DEFAULT_PAGE_CAPACITY,
};
pub use stats::{Stats, StatsSnapshot};
pub use table::Table;
pub use txn::{Transaction, TxnManager, TxnState};
pub use util::comparator::{BytewiseComparator, Comparator, KeyComparator};
