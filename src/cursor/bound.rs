use crate::key::{Key, KeyFormat};
use crate::util::comparator::Comparator;
use crate::{Error, Result};
use bytes::Bytes;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Lower,
    Upper,
}

/// One end of a cursor's key range, stored packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    key: Bytes,
    inclusive: bool,
}

impl Bound {
    pub fn new(key: Bytes, inclusive: bool) -> Self {
        Self { key, inclusive }
    }

    #[inline]
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    #[inline]
    pub fn inclusive(&self) -> bool {
        self.inclusive
    }
}

/// The optional lower and upper bound of a cursor.
///
/// The lower bound never compares above the upper bound. Equal bounds are
/// accepted even when one side is exclusive; such a range admits nothing.
#[derive(Clone)]
pub struct BoundSet<C: Comparator> {
    format: KeyFormat,
    cmp: C,
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl<C: Comparator> BoundSet<C> {
    pub fn new(format: KeyFormat, cmp: C) -> Self {
        Self {
            format,
            cmp,
            lower: None,
            upper: None,
        }
    }

    #[inline]
    pub fn lower(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    #[inline]
    pub fn upper(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Packs `key` with the table's format and sets it as the `side` bound.
    pub fn set_bound(&mut self, side: BoundSide, key: &Key, inclusive: bool) -> Result<()> {
        let packed = self.format.pack(key)?;
        self.set_packed(side, packed, inclusive)
    }

    /// Sets an already packed bound. Leaves the set untouched on error.
    pub fn set_packed(&mut self, side: BoundSide, key: Bytes, inclusive: bool) -> Result<()> {
        let other = match side {
            BoundSide::Lower => self.upper.as_ref(),
            BoundSide::Upper => self.lower.as_ref(),
        };
        if let Some(other) = other {
            let (lo, hi) = match side {
                BoundSide::Lower => (&key, other.key()),
                BoundSide::Upper => (other.key(), &key),
            };
            if self.cmp.compare(lo, hi) == Ordering::Greater {
                return Err(Error::InvalidRange(format!(
                    "lower bound {} is above upper bound {}",
                    self.format.describe(lo),
                    self.format.describe(hi)
                )));
            }
        }
        let bound = Some(Bound::new(key, inclusive));
        match side {
            BoundSide::Lower => self.lower = bound,
            BoundSide::Upper => self.upper = bound,
        }
        Ok(())
    }

    /// Clears one side, or both when `side` is `None`. Clearing an unset
    /// bound is not an error.
    pub fn clear_bound(&mut self, side: Option<BoundSide>) {
        match side {
            Some(BoundSide::Lower) => self.lower = None,
            Some(BoundSide::Upper) => self.upper = None,
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.lower = None;
        self.upper = None;
    }

    /// Whether a forward walk may still return `key`: it is within the upper
    /// bound.
    pub fn admits_forward(&self, key: &[u8]) -> bool {
        self.upper.as_ref().map_or(true, |b| {
            match self.cmp.compare(key, &b.key) {
                Ordering::Less => true,
                Ordering::Equal => b.inclusive,
                Ordering::Greater => false,
            }
        })
    }

    /// Whether a backward walk may still return `key`: it is within the lower
    /// bound.
    pub fn admits_backward(&self, key: &[u8]) -> bool {
        self.lower.as_ref().map_or(true, |b| {
            match self.cmp.compare(key, &b.key) {
                Ordering::Greater => true,
                Ordering::Equal => b.inclusive,
                Ordering::Less => false,
            }
        })
    }

    #[inline]
    pub fn admits(&self, key: &[u8]) -> bool {
        self.admits_forward(key) && self.admits_backward(key)
    }

    /// Where a forward walk starts when the cursor is unpositioned.
    pub fn seed_forward(&self) -> Option<&Bound> {
        self.lower.as_ref()
    }

    /// Where a backward walk starts when the cursor is unpositioned.
    pub fn seed_backward(&self) -> Option<&Bound> {
        self.upper.as_ref()
    }
}
