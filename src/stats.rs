use std::sync::atomic::{AtomicU64, Ordering};

/// Table-wide counters shared by the storage layer and every cursor.
#[derive(Debug, Default)]
pub struct Stats {
    pub(crate) cursor_next_skip: AtomicU64,
    pub(crate) cursor_prev_skip: AtomicU64,
    pub(crate) cursor_bound_early_exit: AtomicU64,
    pub(crate) cursor_bound_seek: AtomicU64,
    pub(crate) search_near_prefix_fast_paths: AtomicU64,
    pub(crate) entries_visited: AtomicU64,
    pub(crate) page_evictions: AtomicU64,
    pub(crate) page_reloads: AtomicU64,
}

/// A point-in-time copy of `Stats`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Entries `next` stepped over because no version was visible.
    pub cursor_next_skip: u64,
    pub cursor_prev_skip: u64,
    /// Traversals stopped by a bound.
    pub cursor_bound_early_exit: u64,
    /// Traversals started with a seek to a bound rather than a table end.
    pub cursor_bound_seek: u64,
    pub search_near_prefix_fast_paths: u64,
    /// Entries handed out by the storage seek primitive.
    pub entries_visited: u64,
    pub page_evictions: u64,
    pub page_reloads: u64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            cursor_next_skip: get(&self.cursor_next_skip),
            cursor_prev_skip: get(&self.cursor_prev_skip),
            cursor_bound_early_exit: get(&self.cursor_bound_early_exit),
            cursor_bound_seek: get(&self.cursor_bound_seek),
            search_near_prefix_fast_paths: get(&self.search_near_prefix_fast_paths),
            entries_visited: get(&self.entries_visited),
            page_evictions: get(&self.page_evictions),
            page_reloads: get(&self.page_reloads),
        }
    }
}
