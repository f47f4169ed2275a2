//! Read-write mutation iterator.
//!
//! [`RwIter`] acquires the container's write lock and a private working copy
//! at construction, offers the full mutable random-access operation set
//! against that copy (no further synchronization needed, it is exclusively
//! owned), and publishes the copy back as the new current version when
//! dropped.
//!
//! The lock is held for the iterator's entire lifetime: this is a conscious
//! low-throughput tool for batched edits. Nesting two `RwIter`s from the
//! same container on the same thread is supported (the lock is re-entrant);
//! on different threads the second blocks until the first is dropped.

use std::fmt;
use std::sync::Arc;

use parking_lot::ReentrantMutexGuard;

use crate::cow::CowVec;
use crate::error::Result;
use crate::ro_iter::RoIter;
use crate::storage::Storage;

/// Mutable random-access iterator over a private working copy.
///
/// Created by [`CowVec::iter_mut`]. Construction costs one lock acquisition
/// plus an O(n) copy of the then-current version; destruction costs one
/// atomic publish.
pub struct RwIter<'a, T: Clone> {
    parent: &'a CowVec<T>,
    _lock: ReentrantMutexGuard<'a, ()>,
    /// Some until the iterator is consumed or dropped.
    work: Option<Storage<T>>,
    pos: usize,
}

impl<'a, T: Clone> RwIter<'a, T> {
    pub(crate) fn new(parent: &'a CowVec<T>) -> Self {
        let lock = parent.lock_write();
        let work = parent.snapshot().as_ref().clone();
        Self {
            parent,
            _lock: lock,
            work: Some(work),
            pos: 0,
        }
    }

    fn work(&self) -> &Storage<T> {
        // Invariant: `work` is Some for the whole borrowed lifetime; the
        // consuming operations take `self` by value.
        self.work.as_ref().unwrap_or_else(|| unreachable!())
    }

    fn work_mut(&mut self) -> &mut Storage<T> {
        self.work.as_mut().unwrap_or_else(|| unreachable!())
    }

    /// Length of the working copy.
    pub fn size(&self) -> usize {
        self.work().len()
    }

    /// `true` if the working copy holds no elements.
    pub fn is_empty(&self) -> bool {
        self.work().is_empty()
    }

    /// Current absolute position within the working copy.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Resets the cursor to the first element without re-copying.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Places the cursor one past the last element.
    pub fn seek_end(&mut self) {
        self.pos = self.work().len();
    }

    /// Places the cursor at the absolute position `pos` (clamped to the
    /// working copy's length).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.work().len());
    }

    /// Moves the cursor by `offset` (saturating at the working copy bounds).
    pub fn advance(&mut self, offset: isize) {
        let len = self.work().len() as isize;
        self.pos = (self.pos as isize + offset).clamp(0, len) as usize;
    }

    /// The element at the current position, if any.
    pub fn peek(&self) -> Option<&T> {
        self.work().as_slice().get(self.pos)
    }

    /// Mutable access to the element at the current position, if any.
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        let pos = self.pos;
        self.work_mut().as_mut_slice().get_mut(pos)
    }

    /// Bounds-checked access at the absolute position `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.work().as_slice().get(index)
    }

    /// Bounds-checked mutable access at the absolute position `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.work_mut().as_mut_slice().get_mut(index)
    }

    /// The working copy as a slice.
    pub fn as_slice(&self) -> &[T] {
        self.work().as_slice()
    }

    /// The working copy as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.work_mut().as_mut_slice()
    }

    /// Assigns `value` to the element at the current position.
    ///
    /// Fails with an out-of-bounds error when the cursor sits at the end.
    pub fn put(&mut self, value: T) -> Result<()> {
        let pos = self.pos;
        *self.work_mut().at_mut(pos)? = value;
        Ok(())
    }

    /// Inserts `value` before the current position, shifting the tail right.
    ///
    /// The cursor ends up on the inserted element.
    pub fn insert(&mut self, value: T) -> Result<()> {
        let pos = self.pos;
        self.work_mut().insert(pos, value)
    }

    /// Inserts a whole range before the current position, preserving order.
    ///
    /// The cursor ends up on the first inserted element (unchanged when the
    /// range is empty).
    pub fn insert_all<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let mut at = self.pos;
        for value in values {
            self.work_mut().insert(at, value)?;
            at += 1;
        }
        Ok(())
    }

    /// Removes and returns the element at the current position.
    ///
    /// The cursor ends up on the element following the removed one.
    pub fn erase(&mut self) -> Result<T> {
        let pos = self.pos;
        self.work_mut().erase(pos)
    }

    /// Removes the `count` elements starting at the current position.
    ///
    /// The cursor ends up on the element following the removed range.
    pub fn erase_n(&mut self, count: usize) -> Result<()> {
        let pos = self.pos;
        self.work_mut().erase_range(pos, count)
    }

    /// Appends `value`, growing the working copy by its growth factor when
    /// needed. The cursor ends up one past the last element.
    pub fn push_back(&mut self, value: T) {
        self.work_mut().push(value);
        self.seek_end();
    }

    /// Appends a whole range. The cursor ends up one past the last element.
    pub fn push_back_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.work_mut().push(value);
        }
        self.seek_end();
    }

    /// Removes and returns the last element. The cursor ends up one past the
    /// (new) last element.
    pub fn pop_back(&mut self) -> Option<T> {
        let value = self.work_mut().pop();
        self.seek_end();
        value
    }

    /// Publishes the working copy as the new current version now, releasing
    /// the write lock. Equivalent to dropping the iterator, made explicit.
    pub fn commit(mut self) {
        if let Some(work) = self.work.take() {
            self.parent.publish_owned(work);
        }
    }

    /// Publishes the working copy and converts into a snapshot iterator over
    /// the just-published version, preserving the cursor position.
    ///
    /// This is the expensive, explicit-only conversion from the mutable to
    /// the immutable kind: it performs the full publish hand-off and
    /// releases the write lock.
    pub fn into_snapshot(mut self) -> RoIter<T> {
        let store: Arc<Storage<T>> = match self.work.take() {
            Some(work) => self.parent.publish_owned(work),
            None => self.parent.snapshot(),
        };
        let pos = self.pos;
        drop(self);
        RoIter::new(store, pos)
    }
}

impl<T: Clone> Drop for RwIter<'_, T> {
    fn drop(&mut self) {
        if let Some(work) = self.work.take() {
            self.parent.publish_owned(work);
        }
    }
}

impl<T: Clone> Iterator for RwIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.peek().cloned();
        if value.is_some() {
            self.pos += 1;
        }
        value
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.work().len().saturating_sub(self.pos);
        (n, Some(n))
    }
}

impl<T: Clone> ExactSizeIterator for RwIter<'_, T> {}

/// Within the mutable kind: equal iff the same container and the same
/// position; ordered by raw position otherwise.
impl<T: Clone> PartialEq for RwIter<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.parent, other.parent) && self.pos == other.pos
    }
}

impl<T: Clone> PartialOrd for RwIter<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match self.pos.cmp(&other.pos) {
            std::cmp::Ordering::Equal if std::ptr::eq(self.parent, other.parent) => {
                Some(std::cmp::Ordering::Equal)
            }
            std::cmp::Ordering::Equal => None,
            ord => Some(ord),
        }
    }
}

/// Across kinds the private working copy never shares version identity with
/// a snapshot, so comparison is by raw position.
impl<T: Clone> PartialEq<RoIter<T>> for RwIter<'_, T> {
    fn eq(&self, other: &RoIter<T>) -> bool {
        self.pos == other.position()
    }
}

impl<T: Clone> PartialEq<RwIter<'_, T>> for RoIter<T> {
    fn eq(&self, other: &RwIter<'_, T>) -> bool {
        self.position() == other.pos
    }
}

impl<T: Clone> PartialOrd<RoIter<T>> for RwIter<'_, T> {
    fn partial_cmp(&self, other: &RoIter<T>) -> Option<std::cmp::Ordering> {
        self.pos.partial_cmp(&other.position())
    }
}

impl<T: Clone> PartialOrd<RwIter<'_, T>> for RoIter<T> {
    fn partial_cmp(&self, other: &RwIter<'_, T>) -> Option<std::cmp::Ordering> {
        self.position().partial_cmp(&other.pos)
    }
}

impl<T: Clone> RwIter<'_, T> {
    /// Signed distance `self - other` in elements, across iterator kinds.
    pub fn distance_from(&self, other: &RoIter<T>) -> isize {
        self.pos as isize - other.position() as isize
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for RwIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwIter")
            .field("pos", &self.pos)
            .field("len", &self.work().len())
            .finish()
    }
}
