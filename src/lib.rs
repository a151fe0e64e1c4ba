//! Locks for the inside of a memory allocator.
//!
//! An allocator needs mutual exclusion before it can allocate anything, so every
//! lock here is built by a `const fn` and none of them allocate, ever. They also
//! have to survive `fork()`: a lock held by some thread in the parent would be
//! held forever in the child, where that thread does not exist.
//!
//! * [`Mutex`] is the general purpose lock. Construction is free, and
//!   [`Mutex::init`] sets up the native primitive. `init` can be called again in
//!   a fork handler to reset the lock.
//! * [`StaticMutex`] needs no `init` and is usable straight from a `static`,
//!   such as [`INIT_LOCK`] which guards allocator setup.
//! * [`MaybeMutex`] decides at `init` time whether it locks at all. Resources that
//!   only ever belong to one thread, such as a thread-local arena, skip locking with
//!   [`LockPolicy::AvoidLockUnsafe`]. Diagnostic builds check the single-thread
//!   promise on every use, and [`MaybeMutex::reinit`] poisons such a lock after
//!   `fork()` when its owner did not survive.
//! * [`AutoLock`] holds any of them for a scope.
//!
//! ## Diagnostics
//!
//! Misuse is reported through [`diagnostic::violation`], which logs and panics.
//! The owner check of [`LockPolicy::AvoidLockUnsafe`] runs in debug builds, or with
//! the `diagnostics` feature. Use of a poisoned or uninitialized lock is always
//! checked.
//!
//! ## Example
//!
//! ```
//! use malloc_mutex::{AutoLock, INIT_LOCK, LockPolicy, MaybeMutex};
//!
//! struct Arena {
//!     lock: MaybeMutex,
//!     // ... bins, runs and chunks guarded by `lock`
//! }
//!
//! static MAIN_ARENA: Arena = Arena { lock: MaybeMutex::new() };
//!
//! {
//!     let _init = AutoLock::new(&INIT_LOCK);
//!     // Safety: allocator setup runs once, under INIT_LOCK, before any arena is used.
//!     unsafe { MAIN_ARENA.lock.init(LockPolicy::MustLock) }.expect("could not create arena lock");
//! }
//!
//! let _guard = AutoLock::new(&MAIN_ARENA.lock);
//! // ... allocate from the arena
//! ```

#![no_std]
#![warn(
    unsafe_op_in_unsafe_fn,
    clippy::missing_safety_doc,
    clippy::multiple_unsafe_ops_per_block,
    clippy::undocumented_unsafe_blocks
)]

#[cfg(any(test, not(unix)))]
extern crate std;

mod auto_lock;
pub mod diagnostic;
mod maybe;
mod mutex;
mod static_mutex;
mod thread;

pub use auto_lock::{AutoLock, Lockable, MaybeMutexAutoLock, MutexAutoLock};
pub use malloc_mutex_raw::{DefaultRawLock, InitError, RawLock, lock_api};
pub use maybe::{ForkOutcome, LockPolicy, MaybeMutex};
pub use mutex::Mutex;
pub use static_mutex::{INIT_LOCK, StaticLocked, StaticLockedGuard, StaticMutex};
pub use thread::ThreadId;
