//! Growable contiguous value storage with explicit capacity control.
//!
//! [`Storage<T>`] is the backing sequence of one container version. It keeps
//! its elements in a pre-allocated slot array and publishes the initialized
//! length through an atomic, which is what makes the container's in-place
//! append fast path sound: a writer may extend a version that concurrent
//! readers are iterating, because the new slot is fully written *before* the
//! length store with `Release`, and readers snapshot the length with
//! `Acquire` before touching any slot.
//!
//! All other mutation (insert, erase, pop, element assignment) requires
//! `&mut self`, i.e. exclusive ownership of a private working copy.
//!
//! Unlike `Vec`, capacity is an explicit part of the contract: growth happens
//! only where the caller asks for it, by the configured growth factor
//! (default: the golden ratio, 1.618).

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ptr;
use core::slice;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::fmt;

use crate::error::{Error, Result};

/// Default growth factor, the golden ratio.
pub const DEFAULT_GROWTH_FACTOR: f32 = 1.618;

/// One version's worth of contiguous element storage.
///
/// Shared between the container and any outstanding snapshot iterators via
/// `Arc<Storage<T>>`. Conceptually immutable once published; the single
/// exception is the serialized in-place append used by the container's
/// fast-path `push_back`.
pub struct Storage<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    len: AtomicUsize,
    growth_factor: f32,
}

// SAFETY: Storage owns its elements; moving the whole storage across threads
// moves the values, so `T: Send` suffices.
unsafe impl<T: Send> Send for Storage<T> {}

// SAFETY: shared access only reads initialized slots below the published
// length. The one `&self` mutation, `append_in_place`, writes a fresh slot
// beyond every reader's view and is serialized by the container write lock;
// it additionally moves a value in, hence `T: Send` on top of `T: Sync`.
unsafe impl<T: Send + Sync> Sync for Storage<T> {}

fn alloc_slots<T>(capacity: usize) -> Box<[UnsafeCell<MaybeUninit<T>>]> {
    let mut v = Vec::with_capacity(capacity);
    v.extend((0..capacity).map(|_| UnsafeCell::new(MaybeUninit::uninit())));
    v.into_boxed_slice()
}

fn try_alloc_slots<T>(capacity: usize) -> Result<Box<[UnsafeCell<MaybeUninit<T>>]>> {
    let mut v: Vec<UnsafeCell<MaybeUninit<T>>> = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| Error::alloc_failed(capacity, capacity * core::mem::size_of::<T>()))?;
    v.extend((0..capacity).map(|_| UnsafeCell::new(MaybeUninit::uninit())));
    Ok(v.into_boxed_slice())
}

impl<T> Storage<T> {
    /// Creates an empty storage with zero capacity and no allocation.
    pub fn new() -> Self {
        Self {
            slots: alloc_slots(0),
            len: AtomicUsize::new(0),
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }

    /// Creates an empty storage with the given initial capacity.
    ///
    /// Allocation failure is surfaced as [`ErrorKind::AllocFailed`] instead
    /// of aborting.
    ///
    /// [`ErrorKind::AllocFailed`]: crate::ErrorKind::AllocFailed
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_capacity_and_factor(capacity, DEFAULT_GROWTH_FACTOR)
    }

    /// Creates an empty storage with the given capacity and growth factor.
    pub fn with_capacity_and_factor(capacity: usize, growth_factor: f32) -> Result<Self> {
        Ok(Self {
            slots: try_alloc_slots(capacity)?,
            len: AtomicUsize::new(0),
            growth_factor,
        })
    }

    /// Number of initialized elements.
    ///
    /// Uses `Acquire` so that a reader observing the length also observes
    /// every slot below it.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// `true` if no element is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of allocated slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The configured multiplicative growth factor.
    #[inline]
    pub fn growth_factor(&self) -> f32 {
        self.growth_factor
    }

    /// `true` if the next append would exceed the allocated capacity.
    #[inline]
    pub fn capacity_reached(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Maximum representable element count; ranges are deduced via signed
    /// iterator distance.
    #[inline]
    pub fn max_size(&self) -> usize {
        isize::MAX as usize
    }

    /// The next capacity after applying the growth factor: rounded up and
    /// strictly greater than the current capacity.
    pub fn grow_capacity(&self) -> usize {
        let cap = self.capacity();
        let grown = (cap as f64 * f64::from(self.growth_factor)).ceil() as usize;
        grown.max(cap + 1)
    }

    #[inline]
    fn base_ptr(&self) -> *mut T {
        // UnsafeCell<MaybeUninit<T>> has the layout of T; the cell grants
        // the interior mutability used by append_in_place.
        self.slots.as_ptr() as *mut T
    }

    /// Immutable view of the initialized prefix.
    ///
    /// The returned slice length is fixed at the moment of the call; a
    /// concurrent serialized in-place append is not reflected in it.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        let n = self.len();
        // SAFETY: slots [0, n) are initialized and, once visible through the
        // Acquire length load, never written again.
        unsafe { slice::from_raw_parts(self.base_ptr() as *const T, n) }
    }

    /// Mutable view of the initialized prefix.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let n = *self.len.get_mut();
        // SAFETY: exclusive access, slots [0, n) are initialized.
        unsafe { slice::from_raw_parts_mut(self.base_ptr(), n) }
    }

    /// Iterates over the initialized prefix.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Bounds-checked element access.
    pub fn at(&self, index: usize) -> Result<&T> {
        self.as_slice()
            .get(index)
            .ok_or_else(|| Error::out_of_bounds(index, self.len()))
    }

    /// Bounds-checked mutable element access.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = *self.len.get_mut();
        self.as_mut_slice()
            .get_mut(index)
            .ok_or_else(|| Error::out_of_bounds(index, len))
    }

    /// Appends into a pre-allocated slot of a *shared* storage.
    ///
    /// This is the in-place fast path: the slot is fully written before the
    /// length is published with `Release`, so concurrent readers either see
    /// the old length or the new length plus a fully initialized element.
    ///
    /// # Safety
    ///
    /// - The caller must hold the owning container's write lock; no other
    ///   `&self` mutation may run concurrently.
    /// - `self.len() < self.capacity()` must hold.
    pub(crate) unsafe fn append_in_place(&self, value: T) {
        let n = self.len.load(Ordering::Relaxed);
        debug_assert!(n < self.capacity());
        // SAFETY: slot n is allocated, uninitialized, and invisible to every
        // reader until the Release store below.
        unsafe { self.slots[n].get().cast::<T>().write(value) };
        self.len.store(n + 1, Ordering::Release);
    }

    /// Appends to an exclusively owned storage, growing by the growth factor
    /// when the capacity is exhausted.
    pub fn push(&mut self, value: T) {
        if self.capacity_reached() {
            self.grow_to(self.grow_capacity());
        }
        let n = *self.len.get_mut();
        // SAFETY: exclusive access and n < capacity after the grow above.
        unsafe { self.slots[n].get().cast::<T>().write(value) };
        *self.len.get_mut() = n + 1;
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        let n = *self.len.get_mut();
        if n == 0 {
            return None;
        }
        *self.len.get_mut() = n - 1;
        // SAFETY: slot n-1 was initialized and is now beyond the length.
        Some(unsafe { self.base_ptr().add(n - 1).read() })
    }

    /// Inserts `value` before `index`, shifting the tail right.
    ///
    /// `index == len` appends. Grows by the growth factor when full.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        let n = *self.len.get_mut();
        if index > n {
            return Err(Error::out_of_bounds(index, n));
        }
        if n >= self.capacity() {
            self.grow_to(self.grow_capacity());
        }
        // SAFETY: exclusive access; capacity suffices for n + 1 elements.
        unsafe {
            let base = self.base_ptr();
            ptr::copy(base.add(index), base.add(index + 1), n - index);
            base.add(index).write(value);
        }
        *self.len.get_mut() = n + 1;
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting the tail left.
    pub fn erase(&mut self, index: usize) -> Result<T> {
        let n = *self.len.get_mut();
        if index >= n {
            return Err(Error::out_of_bounds(index, n));
        }
        // SAFETY: exclusive access; index < n.
        let value = unsafe {
            let base = self.base_ptr();
            let value = base.add(index).read();
            ptr::copy(base.add(index + 1), base.add(index), n - index - 1);
            value
        };
        *self.len.get_mut() = n - 1;
        Ok(value)
    }

    /// Removes the elements in `[index, index + count)`, shifting the tail
    /// left.
    pub fn erase_range(&mut self, index: usize, count: usize) -> Result<()> {
        let n = *self.len.get_mut();
        if index.checked_add(count).map_or(true, |end| end > n) {
            return Err(Error::out_of_bounds_range(index, count, n));
        }
        // SAFETY: exclusive access; the range is within the initialized
        // prefix. Values are dropped in place before the tail moves over
        // their slots.
        unsafe {
            let base = self.base_ptr();
            ptr::drop_in_place(slice::from_raw_parts_mut(base.add(index), count));
            ptr::copy(base.add(index + count), base.add(index), n - index - count);
        }
        *self.len.get_mut() = n - count;
        Ok(())
    }

    fn grow_to(&mut self, new_capacity: usize) {
        let n = *self.len.get_mut();
        debug_assert!(new_capacity >= n);
        let new_slots = alloc_slots::<T>(new_capacity);
        // SAFETY: bitwise move of the initialized prefix; the old box frees
        // only its slot memory (MaybeUninit never drops values).
        unsafe {
            ptr::copy_nonoverlapping(
                self.base_ptr() as *const T,
                new_slots.as_ptr() as *mut T,
                n,
            );
        }
        self.slots = new_slots;
    }
}

impl<T: Clone> Storage<T> {
    /// Creates a trimmed storage (capacity == length) cloning `source`.
    pub fn from_slice(source: &[T]) -> Self {
        let mut s = Self {
            slots: alloc_slots(source.len()),
            len: AtomicUsize::new(0),
            growth_factor: DEFAULT_GROWTH_FACTOR,
        };
        s.extend_from_slice(source);
        s
    }

    /// Creates a storage with explicit capacity, cloning `source` into it.
    ///
    /// Fails with [`ErrorKind::InvalidCapacity`] if `capacity <
    /// source.len()`, and with [`ErrorKind::AllocFailed`] on allocation
    /// failure.
    ///
    /// [`ErrorKind::InvalidCapacity`]: crate::ErrorKind::InvalidCapacity
    /// [`ErrorKind::AllocFailed`]: crate::ErrorKind::AllocFailed
    pub fn from_slice_with_capacity(
        capacity: usize,
        source: &[T],
        growth_factor: f32,
    ) -> Result<Self> {
        if capacity < source.len() {
            return Err(Error::invalid_capacity(capacity, source.len()));
        }
        let mut s = Self {
            slots: try_alloc_slots(capacity)?,
            len: AtomicUsize::new(0),
            growth_factor,
        };
        s.extend_from_slice(source);
        Ok(s)
    }

    /// Clones this storage into a fresh one with the given capacity,
    /// preserving the growth factor.
    pub fn try_clone_with_capacity(&self, capacity: usize) -> Result<Self> {
        Self::from_slice_with_capacity(capacity, self.as_slice(), self.growth_factor)
    }

    /// Infallible empty storage with pre-allocated capacity, for the
    /// container's internal copy-then-publish paths, where allocation
    /// failure aborts like `Vec` growth does.
    pub(crate) fn empty_with_capacity(capacity: usize, growth_factor: f32) -> Self {
        Self {
            slots: alloc_slots(capacity),
            len: AtomicUsize::new(0),
            growth_factor,
        }
    }

    /// Infallible variant of [`Storage::try_clone_with_capacity`], same
    /// allocation contract as [`Storage::empty_with_capacity`].
    pub(crate) fn clone_with_capacity(&self, capacity: usize) -> Self {
        debug_assert!(capacity >= self.len());
        let mut s = Self::empty_with_capacity(capacity, self.growth_factor);
        s.extend_from_slice(self.as_slice());
        s
    }

    /// Appends clones of all elements of `source`.
    pub fn extend_from_slice(&mut self, source: &[T]) {
        for value in source {
            self.push(value.clone());
        }
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        let n = *self.len.get_mut();
        // SAFETY: exclusive access; exactly the slots [0, n) hold values.
        unsafe {
            ptr::drop_in_place(slice::from_raw_parts_mut(self.base_ptr(), n));
        }
    }
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Storage<T> {
    /// Trimmed clone: capacity equals length, growth factor preserved.
    fn clone(&self) -> Self {
        let mut s = Self {
            slots: alloc_slots(self.len()),
            len: AtomicUsize::new(0),
            growth_factor: self.growth_factor,
        };
        s.extend_from_slice(self.as_slice());
        s
    }
}

impl<T: PartialEq> PartialEq for Storage<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Storage<T> {}

impl<T: fmt::Debug> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("values", &self.as_slice())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a Storage<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn grow_capacity_is_monotonic_and_rounded_up() {
        let s = Storage::<u32>::with_capacity_and_factor(0, 1.618).unwrap();
        assert_eq!(s.grow_capacity(), 1);

        let s = Storage::<u32>::with_capacity_and_factor(2, 1.618).unwrap();
        // ceil(2 * 1.618) = 4
        assert_eq!(s.grow_capacity(), 4);

        let s = Storage::<u32>::with_capacity_and_factor(10, 1.0).unwrap();
        // factor 1.0 still makes progress
        assert_eq!(s.grow_capacity(), 11);
    }

    #[test]
    fn push_pop_round_trip() {
        let mut s = Storage::with_capacity(2).unwrap();
        s.push(1);
        s.push(2);
        assert_eq!(s.capacity(), 2);
        s.push(3); // grows
        assert!(s.capacity() >= 3);
        assert_eq!(s.as_slice(), &[1, 2, 3]);
        assert_eq!(s.pop(), Some(3));
        assert_eq!(s.pop(), Some(2));
        assert_eq!(s.pop(), Some(1));
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn insert_and_erase_shift() {
        let mut s = Storage::from_slice(&[1, 3, 4]);
        s.insert(1, 2).unwrap();
        assert_eq!(s.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(s.erase(2).unwrap(), 3);
        assert_eq!(s.as_slice(), &[1, 2, 4]);
        s.erase_range(0, 2).unwrap();
        assert_eq!(s.as_slice(), &[4]);
    }

    #[test]
    fn erase_range_bounds() {
        let mut s = Storage::from_slice(&[1, 2, 3]);
        let err = s.erase_range(2, 2).unwrap_err();
        assert_eq!(
            *err.kind(),
            ErrorKind::OutOfBoundsRange {
                index: 2,
                count: 2,
                len: 3
            }
        );
        assert_eq!(s.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn from_slice_with_capacity_rejects_small_capacity() {
        let err = Storage::from_slice_with_capacity(2, &[1, 2, 3], 1.618).unwrap_err();
        assert_eq!(
            *err.kind(),
            ErrorKind::InvalidCapacity {
                capacity: 2,
                len: 3
            }
        );
    }

    #[test]
    fn clone_is_trimmed() {
        let s = Storage::from_slice_with_capacity(10, &[1, 2, 3], 1.618).unwrap();
        assert_eq!(s.capacity(), 10);
        let c = s.clone();
        assert_eq!(c.capacity(), 3);
        assert_eq!(c.as_slice(), s.as_slice());
        assert_eq!(c.growth_factor(), s.growth_factor());
    }

    #[test]
    fn append_in_place_extends_shared_view() {
        let s = Storage::with_capacity(4).unwrap();
        // SAFETY: single thread, capacity available.
        unsafe { s.append_in_place(7) };
        assert_eq!(s.as_slice(), &[7]);
        assert!(!s.capacity_reached());
    }

    #[test]
    fn drop_runs_destructors_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct D(Arc<AtomicUsize>);
        impl Drop for D {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mut s = Storage::with_capacity(2).unwrap();
            s.push(D(drops.clone()));
            s.push(D(drops.clone()));
            s.push(D(drops.clone())); // forces a grow (bitwise move)
            let d = s.erase(0).unwrap();
            drop(d);
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }
}
