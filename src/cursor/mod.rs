pub mod bound;

use self::bound::{BoundSet, BoundSide};
use crate::key::Key;
use crate::options::{BoundAction, BoundConfig, CursorOptions};
use crate::stats::bump;
use crate::storage::{SeekMode, Storage};
use crate::table::Table;
use crate::txn::gate::{resolve, Resolved};
use crate::txn::Transaction;
use crate::util::comparator::{Comparator, KeyComparator};
use crate::{Error, Result};
use bytes::Bytes;
use slog::{debug, o, trace, Logger};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Where a cursor stands between calls. Only packed keys are kept, so the
/// storage pages behind them may come and go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Unpositioned,
    Positioned(Bytes),
    /// A bound stopped the last walk in `direction`. `last` is the key
    /// returned before that, if any.
    Exhausted {
        direction: Direction,
        last: Option<Bytes>,
    },
}

/// A key/value pair returned by a cursor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Bytes,
}

/// Where `search_near` landed relative to the searched key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearMatch {
    Smaller,
    Exact,
    Larger,
}

/// A bounded cursor over one table.
///
/// The bound set and the position are separate slots. Bound mutations never
/// touch an earlier result; they only shape the next positioning call, and
/// they reopen a cursor stopped by a bound.
pub struct Cursor {
    id: u64,
    table: Arc<Table>,
    options: CursorOptions,
    bounds: BoundSet<KeyComparator>,
    position: Position,
    staged: Option<Bytes>,
    current: Option<(Bytes, Bytes)>,
    /// The entry held when a bound stopped the cursor, restored on reopen.
    parked: Option<(Bytes, Bytes)>,
    txn: Option<Arc<Transaction>>,
    logger: Logger,
}

impl Cursor {
    pub(crate) fn new(table: Arc<Table>, id: u64, options: CursorOptions) -> Self {
        let bounds = BoundSet::new(table.key_format().clone(), table.comparator().clone());
        let logger = table.logger().new(o!("cursor" => id));
        Self {
            id,
            table,
            options,
            bounds,
            position: Position::Unpositioned,
            staged: None,
            current: None,
            parked: None,
            txn: None,
            logger,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[inline]
    pub fn bounds(&self) -> &BoundSet<KeyComparator> {
        &self.bounds
    }

    /// Reads through `txn` while it is running. Without one, or once it has
    /// finished, every call reads a fresh snapshot.
    pub fn set_transaction(&mut self, txn: Option<Arc<Transaction>>) {
        self.txn = txn;
    }

    /// Stages `key` for `search`, `search_near` and setting bounds.
    pub fn set_key(&mut self, key: &Key) -> Result<()> {
        self.staged = Some(self.table.key_format().pack(key)?);
        Ok(())
    }

    pub fn get_key(&self) -> Result<Key> {
        match &self.current {
            Some((key, _)) => self.table.key_format().unpack(key),
            None => Err(Error::KeyNotSet),
        }
    }

    pub fn get_value(&self) -> Result<Bytes> {
        match &self.current {
            Some((_, value)) => Ok(value.clone()),
            None => Err(Error::KeyNotSet),
        }
    }

    /// Applies a bound config string such as `"bound=lower,inclusive=false"`
    /// or `"action=clear"`. Setting uses the staged key.
    pub fn bound(&mut self, config: &str) -> Result<()> {
        let config: BoundConfig = config.parse()?;
        self.apply_bound(&config)
    }

    pub fn apply_bound(&mut self, config: &BoundConfig) -> Result<()> {
        match config.action {
            BoundAction::Set => {
                let side = config.bound.ok_or_else(|| {
                    Error::InvalidArgument("setting a bound requires a side".to_owned())
                })?;
                let key = self.staged.clone().ok_or(Error::KeyNotSet)?;
                self.bounds.set_packed(side, key, config.inclusive)?;
            }
            BoundAction::Clear => self.bounds.clear_bound(config.bound),
        }
        self.bound_changed(config);
        Ok(())
    }

    pub fn set_bound(&mut self, side: BoundSide, key: &Key, inclusive: bool) -> Result<()> {
        self.bounds.set_bound(side, key, inclusive)?;
        self.bound_changed(&BoundConfig::set(side, inclusive));
        Ok(())
    }

    pub fn clear_bound(&mut self, side: Option<BoundSide>) {
        self.bounds.clear_bound(side);
        self.bound_changed(&BoundConfig::clear(side));
    }

    fn bound_changed(&mut self, config: &BoundConfig) {
        debug!(self.logger, "bound changed"; "action" => ?config.action, "side" => ?config.bound);
        if let Position::Exhausted { last, .. } = &self.position {
            self.position = match last {
                Some(key) => Position::Positioned(key.clone()),
                None => Position::Unpositioned,
            };
            self.current = self.parked.take();
        }
    }

    /// Clears both bounds, the position and the staged key.
    pub fn reset(&mut self) {
        self.bounds.clear();
        self.unposition();
        self.staged = None;
    }

    pub fn close(mut self) {
        self.reset();
        debug!(self.logger, "cursor closed");
    }

    pub fn next(&mut self) -> Result<Option<Entry>> {
        self.step(Direction::Forward)
    }

    pub fn prev(&mut self) -> Result<Option<Entry>> {
        self.step(Direction::Backward)
    }

    fn step(&mut self, dir: Direction) -> Result<Option<Entry>> {
        self.check_prepared(match dir {
            Direction::Forward => "next",
            Direction::Backward => "prev",
        })?;
        let table = self.table.clone();
        let stats = table.stats_ref();
        let txn = self.read_txn();

        let (mut mode, last) = match &self.position {
            Position::Exhausted { direction, .. } if *direction == dir => {
                trace!(self.logger, "cursor exhausted"; "direction" => ?dir);
                return Ok(None);
            }
            // Past the bound on the other side: start over from this side.
            Position::Exhausted { last, .. } => (self.seed(dir), last.clone()),
            Position::Unpositioned => (self.seed(dir), None),
            Position::Positioned(key) => {
                let mode = if self.behind_bound(dir, key) {
                    self.seed(dir)
                } else {
                    step_from(dir, key.clone())
                };
                (mode, Some(key.clone()))
            }
        };

        loop {
            let candidate = match table.storage().seek(&mode)? {
                Some(candidate) => candidate,
                None => {
                    self.unposition();
                    return Ok(None);
                }
            };
            let admitted = match dir {
                Direction::Forward => self.bounds.admits_forward(&candidate.key),
                Direction::Backward => self.bounds.admits_backward(&candidate.key),
            };
            if !admitted {
                bump(&stats.cursor_bound_early_exit);
                debug!(self.logger, "bound reached";
                    "direction" => ?dir,
                    "key" => table.key_format().describe(&candidate.key));
                self.position = Position::Exhausted {
                    direction: dir,
                    last,
                };
                if self.current.is_some() {
                    self.parked = self.current.take();
                }
                return Ok(None);
            }
            match resolve(table.txn_manager(), &candidate.versions, &txn) {
                Resolved::Value(value) => return self.land(candidate.key, value).map(Some),
                Resolved::Hidden => {
                    bump(match dir {
                        Direction::Forward => &stats.cursor_next_skip,
                        Direction::Backward => &stats.cursor_prev_skip,
                    });
                    mode = step_from(dir, candidate.key);
                }
                Resolved::Conflict => return Err(self.conflict(&candidate.key)),
            }
        }
    }

    /// Positions on the staged key if it exists, is visible and lies within
    /// the bounds.
    pub fn search(&mut self) -> Result<Option<Entry>> {
        self.check_prepared("search")?;
        let key = self.staged.clone().ok_or(Error::KeyNotSet)?;
        if !self.bounds.admits(&key) {
            self.unposition();
            return Ok(None);
        }
        let table = self.table.clone();
        let txn = self.read_txn();
        let candidate = match table.storage().seek(&SeekMode::Exact(key))? {
            Some(candidate) => candidate,
            None => {
                self.unposition();
                return Ok(None);
            }
        };
        match resolve(table.txn_manager(), &candidate.versions, &txn) {
            Resolved::Value(value) => self.land(candidate.key, value).map(Some),
            Resolved::Hidden => {
                self.unposition();
                Ok(None)
            }
            Resolved::Conflict => Err(self.conflict(&candidate.key)),
        }
    }

    /// Positions on the staged key, or failing that the nearest visible key
    /// within the bounds, preferring larger keys.
    ///
    /// With `prefix_search` on a string or raw key format only keys starting
    /// with the staged key qualify, and the search gives up at the first
    /// larger key that does not.
    pub fn search_near(&mut self) -> Result<Option<(NearMatch, Entry)>> {
        self.check_prepared("search_near")?;
        let key = self.staged.clone().ok_or(Error::KeyNotSet)?;
        let table = self.table.clone();
        let stats = table.stats_ref();
        let format = table.key_format();
        let txn = self.read_txn();
        let prefix = if self.options.prefix_search {
            format.prefix_field(&key)
        } else {
            None
        };

        let mut mode = match self.bounds.lower() {
            Some(lower) if !self.bounds.admits_backward(&key) => {
                seed_at(Direction::Forward, lower.key(), lower.inclusive())
            }
            _ => SeekMode::AtOrAfter(key.clone()),
        };
        while let Some(candidate) = table.storage().seek(&mode)? {
            if !self.bounds.admits_forward(&candidate.key) {
                break;
            }
            if let Some(prefix) = prefix {
                let matches = format
                    .prefix_field(&candidate.key)
                    .map_or(false, |field| field.starts_with(prefix));
                if !matches {
                    bump(&stats.search_near_prefix_fast_paths);
                    trace!(self.logger, "prefix search stopped";
                        "key" => format.describe(&candidate.key));
                    break;
                }
            }
            match resolve(table.txn_manager(), &candidate.versions, &txn) {
                Resolved::Value(value) => {
                    let near = match table.comparator().compare(&candidate.key, &key) {
                        Ordering::Equal => NearMatch::Exact,
                        _ => NearMatch::Larger,
                    };
                    return Ok(Some((near, self.land(candidate.key, value)?)));
                }
                Resolved::Hidden => {
                    bump(&stats.cursor_next_skip);
                    mode = SeekMode::After(candidate.key);
                }
                Resolved::Conflict => return Err(self.conflict(&candidate.key)),
            }
        }
        // Nothing smaller than the staged key can start with it.
        if prefix.is_some() {
            self.unposition();
            return Ok(None);
        }

        let mut mode = match self.bounds.upper() {
            Some(upper) if !self.bounds.admits_forward(&key) => {
                seed_at(Direction::Backward, upper.key(), upper.inclusive())
            }
            _ => SeekMode::Before(key.clone()),
        };
        while let Some(candidate) = table.storage().seek(&mode)? {
            if !self.bounds.admits_backward(&candidate.key) {
                break;
            }
            match resolve(table.txn_manager(), &candidate.versions, &txn) {
                Resolved::Value(value) => {
                    return Ok(Some((NearMatch::Smaller, self.land(candidate.key, value)?)))
                }
                Resolved::Hidden => {
                    bump(&stats.cursor_prev_skip);
                    mode = SeekMode::Before(candidate.key);
                }
                Resolved::Conflict => return Err(self.conflict(&candidate.key)),
            }
        }
        self.unposition();
        Ok(None)
    }

    fn check_prepared(&self, op: &'static str) -> Result<()> {
        match &self.txn {
            Some(txn) if txn.is_prepared() => Err(Error::PreparedTransaction(op)),
            _ => Ok(()),
        }
    }

    fn read_txn(&self) -> Arc<Transaction> {
        match &self.txn {
            Some(txn) if txn.is_running() => txn.clone(),
            _ => Arc::new(self.table.txn_manager().implicit()),
        }
    }

    /// The starting seek for a walk in `dir` with nothing to step from.
    fn seed(&self, dir: Direction) -> SeekMode {
        let bound = match dir {
            Direction::Forward => self.bounds.seed_forward(),
            Direction::Backward => self.bounds.seed_backward(),
        };
        match bound {
            Some(bound) => {
                bump(&self.table.stats_ref().cursor_bound_seek);
                trace!(self.logger, "seeking to bound";
                    "direction" => ?dir,
                    "key" => self.table.key_format().describe(bound.key()));
                seed_at(dir, bound.key(), bound.inclusive())
            }
            None => match dir {
                Direction::Forward => SeekMode::First,
                Direction::Backward => SeekMode::Last,
            },
        }
    }

    /// Whether `key` lies outside the bound a walk in `dir` starts from, as
    /// happens when that bound moves past the current position.
    fn behind_bound(&self, dir: Direction, key: &[u8]) -> bool {
        match dir {
            Direction::Forward => !self.bounds.admits_backward(key),
            Direction::Backward => !self.bounds.admits_forward(key),
        }
    }

    fn land(&mut self, key: Bytes, value: Bytes) -> Result<Entry> {
        let entry = Entry {
            key: self.table.key_format().unpack(&key)?,
            value: value.clone(),
        };
        if self.options.release_evict {
            self.table.storage().release(&key)?;
        }
        self.position = Position::Positioned(key.clone());
        self.current = Some((key, value));
        self.parked = None;
        Ok(entry)
    }

    fn unposition(&mut self) {
        self.position = Position::Unpositioned;
        self.current = None;
        self.parked = None;
    }

    fn conflict(&self, key: &[u8]) -> Error {
        let key = self.table.key_format().describe(key);
        debug!(self.logger, "prepared conflict"; "key" => &key);
        Error::PreparedConflict(key)
    }
}

fn step_from(dir: Direction, key: Bytes) -> SeekMode {
    match dir {
        Direction::Forward => SeekMode::After(key),
        Direction::Backward => SeekMode::Before(key),
    }
}

fn seed_at(dir: Direction, key: &Bytes, inclusive: bool) -> SeekMode {
    match (dir, inclusive) {
        (Direction::Forward, true) => SeekMode::AtOrAfter(key.clone()),
        (Direction::Forward, false) => SeekMode::After(key.clone()),
        (Direction::Backward, true) => SeekMode::AtOrBefore(key.clone()),
        (Direction::Backward, false) => SeekMode::Before(key.clone()),
    }
}
