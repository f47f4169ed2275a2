//! Contracts of the two iterator kinds and their interplay.
//!
//! 1. Snapshot iterators keep their iteration bound from construction,
//!    even when the in-place append fast path extends their version
//! 2. Mutation iterators edit a private copy and publish on drop
//! 3. Cursor placement after each mutation follows the documented rules

use std::sync::Arc;

use cowvec::{AppendPolicy, CowVec, ErrorKind};

// ---------------------------------------------------------------------------
// Snapshot iterators
// ---------------------------------------------------------------------------

#[test]
fn snapshot_bound_is_fixed_at_capture() {
    let v = CowVec::with_capacity(8).unwrap();
    v.push_back(1);
    v.push_back(2);

    let it = v.iter();
    v.push_back(3); // in-place, same version object

    // Live length grew, the iteration bound did not.
    assert_eq!(it.size(), 3);
    assert_eq!(it.collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn snapshot_survives_copy_writes_untouched() {
    let v = CowVec::from_slice(&[1, 2, 3]).with_policy(AppendPolicy::AlwaysCopy);
    let it = v.iter();

    v.put(0, 9).unwrap();
    v.pop_back();
    v.clear();

    assert_eq!(it.size(), 3);
    assert_eq!(it.as_slice(), &[1, 2, 3]);
}

#[test]
fn begin_end_bracket_one_version() {
    let v = CowVec::from_slice(&[10, 20, 30]);
    let begin = v.begin();
    let end = begin.end();

    assert!(begin.same_version(&end));
    assert_eq!(end.distance(&begin), 3);
    assert!(begin < end);
    assert_ne!(begin, end);

    let mut it = begin.clone();
    it.advance(2);
    assert_eq!(it.peek(), Some(&30));
    it.advance(10); // clamps to end
    assert_eq!(it, end);
    it.rewind();
    assert_eq!(it, begin);
}

#[test]
fn snapshot_random_access_and_double_ended() {
    let v = CowVec::from_slice(&[1, 2, 3, 4]);
    let mut it = v.iter();

    assert_eq!(it.get(2), Some(&3));
    assert_eq!(it.get(9), None);

    assert_eq!(it.next(), Some(1));
    assert_eq!(it.next_back(), Some(4));
    assert_eq!(it.len(), 2);
    assert_eq!(it.collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn iterators_over_different_versions_never_compare_equal() {
    let v = CowVec::from_slice(&[1]).with_policy(AppendPolicy::AlwaysCopy);
    let old = v.iter();
    v.push_back(2);
    let new = v.iter();

    assert!(!old.same_version(&new));
    assert_ne!(old, new); // same position, different version
}

#[test]
fn seek_clamps_to_the_captured_bound() {
    let v = CowVec::from_slice(&[1, 2, 3]);
    let mut it = v.iter();
    it.seek(2);
    assert_eq!(it.position(), 2);
    it.seek(99);
    assert_eq!(it.position(), 3);
}

// ---------------------------------------------------------------------------
// Mutation iterators
// ---------------------------------------------------------------------------

#[test]
fn rw_iter_publishes_on_drop() {
    let v = CowVec::from_slice(&[1, 2, 3]);
    let snap = v.snapshot();

    {
        let mut it = v.iter_mut();
        it.seek(1);
        it.put(9).unwrap();
        // Not yet visible outside the iterator.
        assert_eq!(snap.as_slice(), &[1, 2, 3]);
    }

    assert_eq!(v.to_vec(), vec![1, 9, 3]);
    assert_eq!(snap.as_slice(), &[1, 2, 3]);
}

#[test]
fn rw_iter_commit_is_the_explicit_drop() {
    let v = CowVec::from_slice(&[1]);
    let mut it = v.iter_mut();
    it.push_back(2);
    it.commit();
    assert_eq!(v.to_vec(), vec![1, 2]);
}

#[test]
fn insert_places_cursor_on_the_inserted_element() {
    let v = CowVec::from_slice(&[1, 3]);
    let mut it = v.iter_mut();
    it.seek(1);
    it.insert(2).unwrap();
    assert_eq!(it.peek(), Some(&2));
    assert_eq!(it.position(), 1);
    drop(it);
    assert_eq!(v.to_vec(), vec![1, 2, 3]);
}

#[test]
fn insert_all_places_cursor_on_the_first_inserted() {
    let v = CowVec::from_slice(&[1, 5]);
    let mut it = v.iter_mut();
    it.seek(1);
    it.insert_all([2, 3, 4]).unwrap();
    assert_eq!(it.peek(), Some(&2));
    drop(it);
    assert_eq!(v.to_vec(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn erase_places_cursor_on_the_following_element() {
    let v = CowVec::from_slice(&[1, 2, 3]);
    let mut it = v.iter_mut();
    it.seek(1);
    assert_eq!(it.erase().unwrap(), 2);
    assert_eq!(it.peek(), Some(&3));
    drop(it);
    assert_eq!(v.to_vec(), vec![1, 3]);
}

#[test]
fn erase_n_and_bounds() {
    let v = CowVec::from_slice(&[1, 2, 3, 4]);
    let mut it = v.iter_mut();
    it.seek(1);
    it.erase_n(2).unwrap();
    assert_eq!(it.peek(), Some(&4));

    let err = it.erase_n(5).unwrap_err();
    assert_eq!(
        *err.kind(),
        ErrorKind::OutOfBoundsRange {
            index: 1,
            count: 5,
            len: 2
        }
    );
    drop(it);
    assert_eq!(v.to_vec(), vec![1, 4]);
}

#[test]
fn push_and_pop_leave_cursor_at_end() {
    let v = CowVec::from_slice(&[1]);
    let mut it = v.iter_mut();
    it.push_back(2);
    assert_eq!(it.position(), 2);
    assert_eq!(it.peek(), None);

    assert_eq!(it.pop_back(), Some(2));
    assert_eq!(it.position(), 1);

    it.push_back_all([7, 8, 9]);
    assert_eq!(it.position(), 4);
    drop(it);
    assert_eq!(v.to_vec(), vec![1, 7, 8, 9]);
}

#[test]
fn put_at_end_is_out_of_bounds() {
    let v = CowVec::from_slice(&[1]);
    let mut it = v.iter_mut();
    it.seek_end();
    let err = it.put(9).unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::OutOfBounds { index: 1, len: 1 });
}

#[test]
fn rw_iter_iterates_the_working_copy() {
    let v = CowVec::from_slice(&[1, 2, 3]);
    let mut it = v.iter_mut();
    it.put(0).unwrap(); // [0, 2, 3], cursor still at 0
    let seen: Vec<_> = it.by_ref().collect();
    assert_eq!(seen, vec![0, 2, 3]);
    assert_eq!(it.position(), 3);
}

#[test]
fn peek_mut_edits_in_place() {
    let v = CowVec::from_slice(&[1, 2]);
    {
        let mut it = v.iter_mut();
        if let Some(x) = it.peek_mut() {
            *x = 10;
        }
        if let Some(x) = it.get_mut(1) {
            *x += 1;
        }
    }
    assert_eq!(v.to_vec(), vec![10, 3]);
}

// ---------------------------------------------------------------------------
// Cross-kind interplay
// ---------------------------------------------------------------------------

#[test]
fn into_snapshot_publishes_and_keeps_the_cursor() {
    let v = CowVec::from_slice(&[1, 2]);
    let mut it = v.iter_mut();
    it.push_back(3);
    it.seek(1);

    let ro = it.into_snapshot();

    // The publish happened; the snapshot is over the just-published version.
    assert_eq!(v.to_vec(), vec![1, 2, 3]);
    assert!(ro.same_version(&v.iter()));
    assert_eq!(ro.position(), 1);
    assert_eq!(ro.collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn cross_kind_comparison_is_by_position() {
    let v = CowVec::from_slice(&[1, 2, 3]);
    let ro = v.iter();
    let mut rw = v.iter_mut();

    assert_eq!(rw, ro);
    assert_eq!(ro, rw);

    rw.seek(2);
    assert!(rw > ro);
    assert!(ro < rw);
    assert_eq!(rw.distance_from(&ro), 2);
}

#[test]
fn write_lock_serializes_against_the_mutation_iterator() {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    let v = Arc::new(CowVec::from_slice(&[1]));
    let (tx, rx) = mpsc::channel();

    let writer = {
        let v = Arc::clone(&v);
        thread::spawn(move || {
            let mut it = v.iter_mut();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            it.push_back(2);
        })
    };

    rx.recv().unwrap();
    // Blocks until the iterator above drops and publishes.
    v.push_back(3);
    writer.join().unwrap();

    assert_eq!(v.to_vec(), vec![1, 2, 3]);
}
