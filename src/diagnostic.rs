//! Fail-fast reporting of lock protocol violations.
//!
//! A violation is a bug in the caller, never a runtime condition to recover from.
//! They are logged and then turned into a panic, which aborts the process when
//! built with `panic = "abort"`, as allocators usually are.

use thiserror::Error;

/// Whether checks that cost more than a branch are compiled in.
///
/// Enabled in debug builds, or in any build with the `diagnostics` feature.
pub const ENABLED: bool = cfg!(any(debug_assertions, feature = "diagnostics"));

/// A misuse of a lock.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A lock with elided locking was used by a thread other than the one that initialized it.
    #[error("lock with elided locking used from a thread that does not own it")]
    WrongThread,

    /// A lock was used after fork, but its guarded state could not be trusted.
    #[error("lock used after fork, but it was poisoned when the child was set up")]
    Poisoned,

    /// A lock was used before a successful `init`.
    #[error("lock used before it was initialized")]
    Uninitialized,
}

/// Reports `violation` and stops the current thread.
#[cold]
#[inline(never)]
#[track_caller]
pub fn violation(violation: Violation) -> ! {
    log::error!("lock protocol violation: {violation}");
    panic!("lock protocol violation: {violation}");
}
