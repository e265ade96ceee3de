use super::page::Page;
use super::{Candidate, SeekMode, Storage, Version};
use crate::options::{CompressionType, TableOptions};
use crate::stats::{bump, Stats};
use crate::util::comparator::Comparator;
use crate::{Error, Result};
use bytes::Bytes;
use crossbeam_utils::sync::ShardedLock;
use rand::Rng;
use slog::{debug, Logger};
use std::cmp::Ordering;
use std::sync::Arc;

/// In-memory paged storage.
///
/// Entries are kept sorted by `C` and split into pages of at most
/// `page_capacity` entries. Any page can be evicted to a checksummed image at
/// any time; reads reload it transparently.
pub struct MemStorage<C: Comparator> {
    cmp: C,
    pages: ShardedLock<Vec<Page>>,
    page_capacity: usize,
    compression: CompressionType,
    verify_checksums: bool,
    stats: Arc<Stats>,
    logger: Logger,
}

enum Lookup {
    Found(Option<Candidate>),
    /// The page at this index must be reloaded first.
    Load(usize),
}

impl<C: Comparator> MemStorage<C> {
    pub fn new(cmp: C, options: &TableOptions, stats: Arc<Stats>, logger: Logger) -> Self {
        Self {
            cmp,
            pages: ShardedLock::new(vec![]),
            page_capacity: options.page_capacity.max(2),
            compression: options.compression,
            verify_checksums: options.verify_checksums,
            stats,
            logger,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.read().unwrap().len()
    }

    pub fn resident_pages(&self) -> usize {
        self.pages
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.is_resident())
            .count()
    }

    pub fn evict_page(&self, index: usize) -> Result<bool> {
        let mut pages = self.pages.write().unwrap();
        match pages.get_mut(index) {
            Some(page) => self.evict(index, page),
            None => Ok(false),
        }
    }

    /// Evicts every resident page and returns how many were evicted.
    pub fn evict_all(&self) -> Result<usize> {
        let mut pages = self.pages.write().unwrap();
        let mut evicted = 0;
        for (index, page) in pages.iter_mut().enumerate() {
            if self.evict(index, page)? {
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    /// Evicts up to `n` pages picked at random.
    pub fn evict_random(&self, n: usize) -> Result<usize> {
        let mut pages = self.pages.write().unwrap();
        if pages.is_empty() {
            return Ok(0);
        }
        let mut rng = rand::thread_rng();
        let mut evicted = 0;
        for _ in 0..n {
            let index = rng.gen_range(0..pages.len());
            if self.evict(index, &mut pages[index])? {
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    /// Evicts the page `key` belongs to.
    pub fn evict_containing(&self, key: &[u8]) -> Result<bool> {
        let mut pages = self.pages.write().unwrap();
        if pages.is_empty() {
            return Ok(false);
        }
        let index = self.page_for(&pages, key);
        self.evict(index, &mut pages[index])
    }

    fn evict(&self, index: usize, page: &mut Page) -> Result<bool> {
        let evicted = page.evict(self.compression)?;
        if evicted {
            bump(&self.stats.page_evictions);
            debug!(self.logger, "evicted page"; "page" => index);
        }
        Ok(evicted)
    }

    fn reload(&self, index: usize, page: &mut Page) -> Result<()> {
        if page.reload(self.verify_checksums)? {
            bump(&self.stats.page_reloads);
            debug!(self.logger, "reloaded page"; "page" => index);
        }
        Ok(())
    }

    /// Index of the page whose key range covers `key`. Keys below the first
    /// page's lower key map to the first page.
    fn page_for(&self, pages: &[Page], key: &[u8]) -> usize {
        pages
            .partition_point(|p| self.cmp.compare(&p.first, key) != Ordering::Greater)
            .saturating_sub(1)
    }

    fn lookup(&self, pages: &[Page], mode: &SeekMode) -> Lookup {
        if pages.is_empty() {
            return Lookup::Found(None);
        }
        let key = match mode {
            SeekMode::First => return self.first_from(pages, 0),
            SeekMode::Last => return self.last_from(pages, pages.len() - 1),
            SeekMode::Exact(k)
            | SeekMode::AtOrAfter(k)
            | SeekMode::After(k)
            | SeekMode::AtOrBefore(k)
            | SeekMode::Before(k) => k,
        };
        let index = self.page_for(pages, key);
        let entries = match pages[index].entries() {
            Some(entries) => entries,
            None => return Lookup::Load(index),
        };
        let cmp = |e: &Candidate| self.cmp.compare(&e.key, key);
        match mode {
            SeekMode::Exact(_) => Lookup::Found(
                entries
                    .binary_search_by(|e| cmp(e))
                    .ok()
                    .map(|i| entries[i].clone()),
            ),
            SeekMode::AtOrAfter(_) | SeekMode::After(_) => {
                let pos = match mode {
                    SeekMode::After(_) => entries.partition_point(|e| cmp(e) != Ordering::Greater),
                    _ => entries.partition_point(|e| cmp(e) == Ordering::Less),
                };
                match entries.get(pos) {
                    Some(e) => Lookup::Found(Some(e.clone())),
                    None => self.first_from(pages, index + 1),
                }
            }
            _ => {
                let pos = match mode {
                    SeekMode::Before(_) => entries.partition_point(|e| cmp(e) == Ordering::Less),
                    _ => entries.partition_point(|e| cmp(e) != Ordering::Greater),
                };
                if pos > 0 {
                    Lookup::Found(Some(entries[pos - 1].clone()))
                } else if index > 0 {
                    self.last_from(pages, index - 1)
                } else {
                    Lookup::Found(None)
                }
            }
        }
    }

    fn first_from(&self, pages: &[Page], start: usize) -> Lookup {
        for (index, page) in pages.iter().enumerate().skip(start) {
            match page.entries() {
                None => return Lookup::Load(index),
                Some(entries) => {
                    if let Some(e) = entries.first() {
                        return Lookup::Found(Some(e.clone()));
                    }
                }
            }
        }
        Lookup::Found(None)
    }

    fn last_from(&self, pages: &[Page], start: usize) -> Lookup {
        for index in (0..=start).rev() {
            match pages[index].entries() {
                None => return Lookup::Load(index),
                Some(entries) => {
                    if let Some(e) = entries.last() {
                        return Lookup::Found(Some(e.clone()));
                    }
                }
            }
        }
        Lookup::Found(None)
    }
}

impl<C: Comparator> Storage for MemStorage<C> {
    fn seek(&self, mode: &SeekMode) -> Result<Option<Candidate>> {
        loop {
            let index = {
                let pages = self.pages.read().unwrap();
                match self.lookup(&pages, mode) {
                    Lookup::Found(found) => {
                        if found.is_some() {
                            bump(&self.stats.entries_visited);
                        }
                        return Ok(found);
                    }
                    Lookup::Load(index) => index,
                }
            };
            let mut pages = self.pages.write().unwrap();
            if let Some(page) = pages.get_mut(index) {
                self.reload(index, page)?;
            }
        }
    }

    fn append(&self, key: Bytes, version: Version) -> Result<()> {
        let mut pages = self.pages.write().unwrap();
        if pages.is_empty() {
            let entry = Candidate {
                key: key.clone(),
                versions: vec![version],
            };
            pages.push(Page::new(key, vec![entry]));
            return Ok(());
        }

        let index = self.page_for(&pages, &key);
        self.reload(index, &mut pages[index])?;
        let page = &mut pages[index];
        let below_first = self.cmp.compare(&key, &page.first) == Ordering::Less;
        let entries = page
            .entries_mut()
            .ok_or_else(|| Error::Corruption("page not resident after reload".to_owned()))?;
        match entries.binary_search_by(|e| self.cmp.compare(&e.key, &key)) {
            Ok(pos) => entries[pos].versions.insert(0, version),
            Err(pos) => entries.insert(
                pos,
                Candidate {
                    key: key.clone(),
                    versions: vec![version],
                },
            ),
        }

        let split = if entries.len() > self.page_capacity {
            Some(entries.split_off(entries.len() / 2))
        } else {
            None
        };
        if below_first {
            page.first = key;
        }
        if let Some(tail) = split {
            let first = tail[0].key.clone();
            pages.insert(index + 1, Page::new(first, tail));
            debug!(self.logger, "split page"; "page" => index, "pages" => pages.len());
        }
        Ok(())
    }

    fn release(&self, key: &[u8]) -> Result<()> {
        self.evict_containing(key).map(|_| ())
    }
}
