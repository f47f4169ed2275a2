//! The copy-on-write container.
//!
//! [`CowVec`] keeps its elements behind an atomically swappable pointer to
//! an immutable version ([`Storage`]). Readers grab the current version with
//! one lock-free pointer load and keep it alive for as long as they need;
//! writers take a re-entrant mutex, produce a modified copy of the current
//! version, and publish it with one atomic pointer swap. A version, once
//! published, is never structurally mutated again.
//!
//! The one deliberate exception is the *in-place append* fast path enabled
//! by [`AppendPolicy::InPlace`] (the default): while a writer holds the
//! write lock and the current version has spare capacity, `push_back`
//! extends the shared version directly instead of copying it. The element
//! slot is fully written before the length is published, so an already
//! captured snapshot either sees the old length or the new length plus a
//! fully initialized element; snapshot iterators keep their bound captured
//! at construction either way. [`AppendPolicy::AlwaysCopy`] turns the fast
//! path off for callers that want every snapshot frozen bit for bit.
//!
//! ```
//! use cowvec::CowVec;
//!
//! let v: CowVec<i32> = CowVec::new();
//! v.push_back(1);
//! v.push_back(2);
//!
//! let snap = v.iter(); // lock-free capture
//! v.push_back(3);      // does not disturb `snap`
//!
//! assert_eq!(snap.collect::<Vec<_>>(), vec![1, 2]);
//! assert_eq!(v.to_vec(), vec![1, 2, 3]);
//! ```

use std::fmt;
use std::ptr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::ro_iter::RoIter;
use crate::rw_iter::RwIter;
use crate::storage::Storage;

// ---------------------------------------------------------------------------
// Append policy
// ---------------------------------------------------------------------------

/// Behavior of `push_back` when the current version has spare capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendPolicy {
    /// Append into the shared current version without copying it. Fastest;
    /// an already captured snapshot may observe the appended element through
    /// live length reads (its iteration bound stays fixed).
    #[default]
    InPlace,
    /// Copy and publish on every append. Published versions are strictly
    /// immutable, at the cost of an O(n) copy per `push_back`.
    AlwaysCopy,
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Concurrent resizable sequence with lock-free snapshot reads and
/// serialized copy-on-write writes.
///
/// All methods take `&self`; synchronization is internal. Share the
/// container across threads behind an `Arc`.
pub struct CowVec<T> {
    current: ArcSwap<Storage<T>>,
    write_lock: ReentrantMutex<()>,
    policy: AppendPolicy,
}

impl<T> CowVec<T> {
    /// Creates an empty container with zero capacity.
    pub fn new() -> Self {
        Self::from_store(Storage::new())
    }

    /// Creates an empty container with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self::from_store(Storage::with_capacity(capacity)?))
    }

    /// Creates an empty container with the given capacity and growth factor.
    pub fn with_capacity_and_factor(capacity: usize, growth_factor: f32) -> Result<Self> {
        Ok(Self::from_store(Storage::with_capacity_and_factor(
            capacity,
            growth_factor,
        )?))
    }

    /// Selects the append policy (consuming builder, before sharing).
    pub fn with_policy(mut self, policy: AppendPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn from_store(store: Storage<T>) -> Self {
        Self {
            current: ArcSwap::from_pointee(store),
            write_lock: ReentrantMutex::new(()),
            policy: AppendPolicy::InPlace,
        }
    }

    /// The configured append policy.
    pub fn policy(&self) -> AppendPolicy {
        self.policy
    }

    /// The current version, captured lock-free.
    ///
    /// The returned `Arc` keeps that version alive independently of any
    /// later writes.
    pub fn snapshot(&self) -> Arc<Storage<T>> {
        self.current.load_full()
    }

    /// Number of elements in the current version (lock-free).
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    /// `true` if the current version holds no elements (lock-free).
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Allocated capacity of the current version (lock-free).
    pub fn capacity(&self) -> usize {
        self.current.load().capacity()
    }

    /// The configured multiplicative growth factor.
    pub fn growth_factor(&self) -> f32 {
        self.current.load().growth_factor()
    }

    /// Maximum representable element count.
    pub fn max_size(&self) -> usize {
        self.current.load().max_size()
    }

    /// Acquires the write lock explicitly.
    ///
    /// The lock is re-entrant: a thread already holding it may call any
    /// write operation without deadlocking. Use this to bracket a sequence
    /// of writes into one exclusive region; readers stay lock-free
    /// throughout.
    pub fn lock_write(&self) -> ReentrantMutexGuard<'_, ()> {
        self.write_lock.lock()
    }

    /// Publishes `store` as the new current version, returning its `Arc`.
    pub(crate) fn publish_owned(&self, store: Storage<T>) -> Arc<Storage<T>> {
        let _guard = self.write_lock.lock();
        let arc = Arc::new(store);
        trace!(len = arc.len(), capacity = arc.capacity(), "publish");
        self.current.store(Arc::clone(&arc));
        arc
    }
}

impl<T: Clone> CowVec<T> {
    /// Creates a container cloning `source`, trimmed (capacity == length).
    pub fn from_slice(source: &[T]) -> Self {
        Self::from_store(Storage::from_slice(source))
    }

    /// Creates a container with explicit capacity, cloning `source` into it.
    ///
    /// Fails if `capacity < source.len()` or on allocation failure.
    pub fn from_slice_with_capacity(
        capacity: usize,
        source: &[T],
        growth_factor: f32,
    ) -> Result<Self> {
        Ok(Self::from_store(Storage::from_slice_with_capacity(
            capacity,
            source,
            growth_factor,
        )?))
    }

    // -- reads --------------------------------------------------------------

    /// Clones the element at `index` out of the current version (lock-free).
    pub fn get(&self, index: usize) -> Option<T> {
        self.current.load().as_slice().get(index).cloned()
    }

    /// Clones the current version into a `Vec` (lock-free capture).
    pub fn to_vec(&self) -> Vec<T> {
        self.current.load().as_slice().to_vec()
    }

    /// A snapshot iterator positioned at the first element (lock-free).
    pub fn iter(&self) -> RoIter<T> {
        RoIter::new(self.snapshot(), 0)
    }

    /// A snapshot iterator positioned at the first element (lock-free).
    pub fn begin(&self) -> RoIter<T> {
        self.iter()
    }

    /// A snapshot iterator positioned one past the last element (lock-free).
    ///
    /// Note: captures its *own* version; for a self-consistent range derive
    /// the end from `begin()` via [`RoIter::end`].
    pub fn end(&self) -> RoIter<T> {
        let snap = self.snapshot();
        let n = snap.len();
        RoIter::new(snap, n)
    }

    /// A mutation iterator over a private copy of the current version.
    ///
    /// Takes the write lock for the iterator's lifetime and publishes the
    /// copy when the iterator is dropped (or [`RwIter::commit`]ted).
    pub fn iter_mut(&self) -> RwIter<'_, T> {
        RwIter::new(self)
    }

    // -- writes -------------------------------------------------------------

    /// Appends `value` at the tail.
    ///
    /// Under [`AppendPolicy::InPlace`] with spare capacity this extends the
    /// shared current version directly; otherwise it copies into a version
    /// grown by the growth factor and publishes that.
    pub fn push_back(&self, value: T) {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        if self.policy == AppendPolicy::InPlace && !cur.capacity_reached() {
            // SAFETY: write lock held, spare capacity verified under it.
            unsafe { cur.append_in_place(value) };
            return;
        }
        let new_capacity = if cur.capacity_reached() {
            let grown = cur.grow_capacity();
            debug!(
                old_capacity = cur.capacity(),
                new_capacity = grown,
                "grow on push_back"
            );
            grown
        } else {
            cur.capacity()
        };
        let mut next = cur.clone_with_capacity(new_capacity);
        next.push(value);
        self.publish_owned(next);
    }

    /// Appends every element of `values` as one atomic write.
    ///
    /// Concurrent readers observe either none or all of the appended
    /// elements, never a prefix.
    pub fn push_back_all<I>(&self, values: I)
    where
        I: IntoIterator<Item = T>,
    {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        let values = values.into_iter();
        let (lower, _) = values.size_hint();
        let mut next = cur.clone_with_capacity(cur.capacity().max(cur.len() + lower));
        for value in values {
            next.push(value);
        }
        self.publish_owned(next);
    }

    /// Removes and returns the last element, or `None` when empty.
    ///
    /// Always copy-and-publish; empty containers publish nothing.
    pub fn pop_back(&self) -> Option<T> {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        if cur.is_empty() {
            return None;
        }
        let mut next = cur.clone_with_capacity(cur.capacity());
        let value = next.pop();
        self.publish_owned(next);
        value
    }

    /// Replaces the element at `index` with `value`.
    ///
    /// On an out-of-bounds index the error carries both the index and the
    /// length, and no new version is published.
    pub fn put(&self, index: usize, value: T) -> Result<()> {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        if index >= cur.len() {
            return Err(Error::out_of_bounds(index, cur.len()));
        }
        let mut next = cur.clone_with_capacity(cur.capacity());
        *next.at_mut(index)? = value;
        self.publish_owned(next);
        Ok(())
    }

    /// Publishes an empty zero-capacity version.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.publish_owned(Storage::new());
    }

    /// Grows the current version's capacity to at least `new_capacity`.
    ///
    /// A no-op when the capacity already suffices; otherwise copies and
    /// publishes, surfacing allocation failure as an error.
    pub fn reserve(&self, new_capacity: usize) -> Result<()> {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        if new_capacity <= cur.capacity() {
            return Ok(());
        }
        let next = cur.try_clone_with_capacity(new_capacity)?;
        self.publish_owned(next);
        Ok(())
    }

    /// Exchanges the contents of two containers.
    ///
    /// Both write locks are taken in a globally consistent (address) order,
    /// so two threads swapping the same pair in opposite directions cannot
    /// deadlock.
    pub fn swap(&self, other: &Self) {
        if ptr::eq(self, other) {
            return;
        }
        let (first, second) = if (self as *const Self) < (other as *const Self) {
            (self, other)
        } else {
            (other, self)
        };
        let _g1 = first.write_lock.lock();
        let _g2 = second.write_lock.lock();
        let a = self.current.load_full();
        let b = other.current.load_full();
        self.current.store(b);
        other.current.store(a);
    }

    /// Clones the current version into an exclusively owned [`Storage`],
    /// preserving its capacity.
    ///
    /// Escape hatch for batched manual edits: modify the copy freely, then
    /// hand it back via [`CowVec::set_store`]. Taken under the write lock so
    /// it composes with [`CowVec::lock_write`] into read-modify-write.
    pub fn copy_store(&self) -> Storage<T> {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        cur.clone_with_capacity(cur.capacity())
    }

    /// Publishes `store` as the new current version.
    ///
    /// The caller promises `store` reflects whatever consistency it needs;
    /// pair with [`CowVec::lock_write`] held across the copy-modify-set
    /// sequence to exclude intervening writers.
    pub fn set_store(&self, store: Storage<T>) {
        self.publish_owned(store);
    }
}

impl<T: Clone> CowVec<T> {
    /// Removes elements matching `needle` under the supplied equivalence
    /// relation, preserving the order of the rest: the first match only, or
    /// every match when `all_matching` is set. Returns the number removed;
    /// publishes only when that is non-zero.
    pub fn erase_matching_by<F>(&self, needle: &T, all_matching: bool, mut equals: F) -> usize
    where
        F: FnMut(&T, &T) -> bool,
    {
        let _guard = self.write_lock.lock();
        let cur = self.current.load_full();
        let mut next = Storage::empty_with_capacity(cur.capacity(), cur.growth_factor());
        let mut removed = 0;
        for value in cur.iter() {
            if (all_matching || removed == 0) && equals(value, needle) {
                removed += 1;
            } else {
                next.push(value.clone());
            }
        }
        if removed > 0 {
            self.publish_owned(next);
        }
        removed
    }

    /// Appends `value` only if no element matches it under `equals`, as one
    /// critical section: the scan and the append cannot be interleaved by
    /// another writer. Returns `true` if the element was appended.
    pub fn push_back_unique_by<F>(&self, value: T, mut equals: F) -> bool
    where
        F: FnMut(&T, &T) -> bool,
    {
        let _guard = self.write_lock.lock();
        if self
            .current
            .load()
            .as_slice()
            .iter()
            .any(|x| equals(x, &value))
        {
            return false;
        }
        // Re-entrant: the scan and the append form one exclusive region.
        self.push_back(value);
        true
    }
}

impl<T: Clone + PartialEq> CowVec<T> {
    /// [`CowVec::erase_matching_by`] with `==` as the equivalence relation.
    pub fn erase_matching(&self, needle: &T, all_matching: bool) -> usize {
        self.erase_matching_by(needle, all_matching, |a, b| a == b)
    }

    /// [`CowVec::push_back_unique_by`] with `==` as the equivalence relation.
    pub fn push_back_unique(&self, value: T) -> bool {
        self.push_back_unique_by(value, |a, b| a == b)
    }

    /// `true` if an element equal to `needle` exists in the current version.
    pub fn contains(&self, needle: &T) -> bool {
        self.current.load().as_slice().contains(needle)
    }
}

// ---------------------------------------------------------------------------
// Std traits
// ---------------------------------------------------------------------------

impl<T> Default for CowVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for CowVec<T> {
    /// Clones the current version (capacity preserved) and the policy. The
    /// clone starts with its own unlocked write lock.
    fn clone(&self) -> Self {
        let cur = self.snapshot();
        Self {
            current: ArcSwap::from_pointee(cur.clone_with_capacity(cur.capacity())),
            write_lock: ReentrantMutex::new(()),
            policy: self.policy,
        }
    }
}

impl<T: Clone> From<Vec<T>> for CowVec<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_slice(&values)
    }
}

impl<T: Clone> From<&[T]> for CowVec<T> {
    fn from(values: &[T]) -> Self {
        Self::from_slice(values)
    }
}

impl<T: Clone> FromIterator<T> for CowVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = Storage::new();
        for value in iter {
            store.push(value);
        }
        Self::from_store(store)
    }
}

impl<'a, T: Clone> IntoIterator for &'a CowVec<T> {
    type Item = T;
    type IntoIter = RoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for CowVec<T> {
    /// Element-wise equality of the two current versions.
    fn eq(&self, other: &Self) -> bool {
        self.current.load().as_slice() == other.current.load().as_slice()
    }
}

impl<T: Eq> Eq for CowVec<T> {}

impl<T: fmt::Debug> fmt::Debug for CowVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cur = self.current.load();
        f.debug_struct("CowVec")
            .field("len", &cur.len())
            .field("capacity", &cur.capacity())
            .field("policy", &self.policy)
            .field("values", &cur.as_slice())
            .finish()
    }
}
