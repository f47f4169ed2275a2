//! Read-only snapshot iterator.
//!
//! [`RoIter`] captures the container's current version once, lock-free, and
//! iterates over it without affecting or being affected by later writes.
//! Its only cost beyond a plain cursor is one reference-count
//! increment/decrement on the shared version.
//!
//! To operate on a self-consistent `[begin, end)` range, derive everything
//! from one captured iterator via [`RoIter::size`], [`RoIter::begin`] and
//! [`RoIter::end`] instead of re-querying the (possibly newer) container.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::storage::Storage;

/// Immutable random-access iterator over one captured container version.
///
/// Created by [`CowVec::iter`], [`CowVec::begin`] and [`CowVec::end`], or by
/// converting a [`RwIter`] via [`RwIter::into_snapshot`].
///
/// [`CowVec::iter`]: crate::CowVec::iter
/// [`CowVec::begin`]: crate::CowVec::begin
/// [`CowVec::end`]: crate::CowVec::end
/// [`RwIter`]: crate::RwIter
/// [`RwIter::into_snapshot`]: crate::RwIter::into_snapshot
pub struct RoIter<T> {
    store: Arc<Storage<T>>,
    pos: usize,
    end: usize,
}

impl<T> RoIter<T> {
    pub(crate) fn new(store: Arc<Storage<T>>, pos: usize) -> Self {
        let end = store.len();
        Self { store, pos, end }
    }

    /// Length of the captured version.
    ///
    /// Read live from the shared version: under the in-place append policy
    /// this may exceed the iteration bound captured at construction.
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// `true` if the captured version holds no elements.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// A new iterator over the same version, positioned at the first element.
    pub fn begin(&self) -> Self {
        Self::new(self.store.clone(), 0)
    }

    /// A new iterator over the same version, positioned one past the last
    /// element.
    pub fn end(&self) -> Self {
        let n = self.store.len();
        Self::new(self.store.clone(), n)
    }

    /// Resets this iterator to the first element without re-capturing.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Current absolute position within the version.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor by `offset` (saturating at the version bounds).
    pub fn advance(&mut self, offset: isize) {
        let pos = self.pos as isize + offset;
        self.pos = pos.clamp(0, self.end as isize) as usize;
    }

    /// Places the cursor at the absolute position `pos` (clamped to `end`).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
    }

    /// The element at the current position, if any.
    pub fn peek(&self) -> Option<&T> {
        self.store.as_slice().get(self.pos)
    }

    /// Bounds-checked access at the absolute position `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.store.as_slice().get(index)
    }

    /// The whole captured version as a slice.
    pub fn as_slice(&self) -> &[T] {
        self.store.as_slice()
    }

    /// Signed distance `self - other` in elements.
    pub fn distance(&self, other: &Self) -> isize {
        self.pos as isize - other.pos as isize
    }

    /// `true` if both iterators share the identical version object.
    pub fn same_version(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl<T> Clone for RoIter<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            pos: self.pos,
            end: self.end,
        }
    }
}

impl<T: Clone> Iterator for RoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.pos >= self.end {
            return None;
        }
        let value = self.store.as_slice().get(self.pos).cloned();
        self.pos += 1;
        value
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end.saturating_sub(self.pos);
        (n, Some(n))
    }
}

impl<T: Clone> DoubleEndedIterator for RoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.end <= self.pos {
            return None;
        }
        self.end -= 1;
        self.store.as_slice().get(self.end).cloned()
    }
}

impl<T: Clone> ExactSizeIterator for RoIter<T> {}
impl<T: Clone> FusedIterator for RoIter<T> {}

/// Equal iff both the version identity and the position match; ordered by
/// raw position otherwise.
impl<T> PartialEq for RoIter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_version(other) && self.pos == other.pos
    }
}

impl<T> PartialOrd for RoIter<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match self.pos.cmp(&other.pos) {
            std::cmp::Ordering::Equal if self.same_version(other) => {
                Some(std::cmp::Ordering::Equal)
            }
            // Same position over different versions: incomparable.
            std::cmp::Ordering::Equal => None,
            ord => Some(ord),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoIter")
            .field("pos", &self.pos)
            .field("len", &self.store.len())
            .finish()
    }
}
