//! Cowvec: Concurrent copy-on-write vector. Lock-free snapshot reads,
//! mutex-serialized copy-on-write writes.
//!
//! Every read captures the current immutable version with a single atomic
//! pointer load and works on it undisturbed, no matter what writers do in
//! the meantime. Every write takes a re-entrant mutex, produces a modified
//! copy, and publishes it with a single atomic pointer swap. Published
//! versions stay alive for exactly as long as someone holds them.
//!
//! # Key Features
//!
//! - **Lock-Free Reads**: Snapshot capture is one atomic load plus one
//!   reference-count bump
//! - **Serialized Writes**: One writer at a time, readers never blocked
//! - **In-Place Append Fast Path**: `push_back` with spare capacity skips
//!   the O(n) copy (configurable via [`AppendPolicy`])
//! - **Two Iterator Kinds**: Cheap immutable snapshot iterators and a
//!   locking mutation iterator over a private working copy
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use cowvec::CowVec;
//!
//! let v = Arc::new(CowVec::from_slice(&[1, 2, 3]));
//!
//! let reader = {
//!     let v = Arc::clone(&v);
//!     thread::spawn(move || {
//!         // Captured once; later writes do not disturb this sum.
//!         v.iter().sum::<i32>()
//!     })
//! };
//!
//! v.push_back(4);
//! v.erase_matching(&2, true);
//!
//! let sum = reader.join().unwrap();
//! assert!(sum == 6 || sum == 10 || sum == 8);
//! assert_eq!(v.to_vec(), vec![1, 3, 4]);
//! ```

#![warn(missing_docs)]

mod cow;
mod error;
mod ro_iter;
mod rw_iter;
mod storage;

pub use cow::{AppendPolicy, CowVec};
pub use error::{Error, ErrorKind, Result};
pub use ro_iter::RoIter;
pub use rw_iter::RwIter;
pub use storage::{Storage, DEFAULT_GROWTH_FACTOR};
