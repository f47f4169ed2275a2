//! Typed errors for container operations.
//!
//! Every error carries its originating source location (captured at the
//! construction site via `#[track_caller]`) and, when `RUST_BACKTRACE` asks
//! for it, a call-stack trace. All failures are synchronous and fail-fast:
//! a write operation either fully completes and publishes, or raises before
//! any publish occurs.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Bounds-checked index access or assignment beyond the current length.
    #[error("index {index} out of bounds, length {len}")]
    OutOfBounds {
        /// The offending index.
        index: usize,
        /// The store length at the time of the access.
        len: usize,
    },
    /// Range erase `[index, index + count)` exceeds the current length.
    #[error("range [{index}, {index}+{count}) out of bounds, length {len}")]
    OutOfBoundsRange {
        /// First index of the range.
        index: usize,
        /// Number of elements in the range.
        count: usize,
        /// The store length at the time of the access.
        len: usize,
    },
    /// Requested initial capacity is smaller than the source range.
    #[error("capacity {capacity} smaller than source length {len}")]
    InvalidCapacity {
        /// The requested capacity.
        capacity: usize,
        /// The length of the source range to be copied.
        len: usize,
    },
    /// Operation invoked on a container or iterator state that forbids it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// Capability intentionally not implemented.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// Allocation failure surfaced as an error rather than aborting.
    #[error("allocation of {elements} elements ({bytes} bytes) failed")]
    AllocFailed {
        /// Number of elements requested.
        elements: usize,
        /// Total byte size of the failed request.
        bytes: usize,
    },
}

/// Error carrier: an [`ErrorKind`] plus source location and optional backtrace.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
    backtrace: Backtrace,
}

impl Error {
    /// Creates an error of the given kind, capturing the caller's location.
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Location::caller(),
            backtrace: Backtrace::capture(),
        }
    }

    /// The failure kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source location where the error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// The captured backtrace, if `RUST_BACKTRACE` enabled capture.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.backtrace.status() {
            BacktraceStatus::Captured => Some(&self.backtrace),
            _ => None,
        }
    }

    #[track_caller]
    pub(crate) fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::new(ErrorKind::OutOfBounds { index, len })
    }

    #[track_caller]
    pub(crate) fn out_of_bounds_range(index: usize, count: usize, len: usize) -> Self {
        Self::new(ErrorKind::OutOfBoundsRange { index, count, len })
    }

    #[track_caller]
    pub(crate) fn invalid_capacity(capacity: usize, len: usize) -> Self {
        Self::new(ErrorKind::InvalidCapacity { capacity, len })
    }

    #[track_caller]
    pub(crate) fn alloc_failed(elements: usize, bytes: usize) -> Self {
        Self::new(ErrorKind::AllocFailed { elements, bytes })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{})",
            self.kind,
            self.location.file(),
            self.location.line()
        )
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    #[track_caller]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl PartialEq for Error {
    /// Equality on the kind only; location and backtrace are diagnostics.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_carries_context() {
        let err = Error::out_of_bounds(5, 3);
        assert_eq!(
            *err.kind(),
            ErrorKind::OutOfBounds { index: 5, len: 3 }
        );
        let msg = err.to_string();
        assert!(msg.contains("index 5"));
        assert!(msg.contains("length 3"));
        assert!(msg.contains("error.rs"));
    }

    #[test]
    fn invalid_capacity_display() {
        let err = Error::invalid_capacity(2, 8);
        assert!(err.to_string().contains("capacity 2"));
        assert!(err.to_string().contains("source length 8"));
    }
}
