//! Native lock backends that are safe to use from inside a memory allocator.
//!
//! Every backend here is a plain value: [`lock_api::RawMutex::INIT`] is a constant
//! with no constructor side effects, so a lock can be embedded in a `static` or in
//! allocator metadata before the allocator is able to hand out memory.
//! No operation allocates.
//!
//! On top of [`lock_api::RawMutex`], [`RawLock::init`] (re-)initializes the native
//! primitive in place. This is what allows a lock to be reset in a child process
//! after `fork()`.

#![no_std]
#![warn(
    unsafe_op_in_unsafe_fn,
    clippy::missing_safety_doc,
    clippy::multiple_unsafe_ops_per_block,
    clippy::undocumented_unsafe_blocks
)]

mod error;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        #[path = "futex.rs"]
        mod default_raw;
    } else if #[cfg(target_vendor = "apple")] {
        #[path = "darwin.rs"]
        mod default_raw;
    } else if #[cfg(unix)] {
        #[path = "pthread.rs"]
        mod default_raw;
    } else {
        #[path = "parking_lot.rs"]
        mod default_raw;
    }
}

use lock_api::RawMutex as _;

pub use error::InitError;
pub use lock_api;

/// A native lock that can be (re-)initialized in place.
///
/// # Safety
///
/// Implementors must provide mutual exclusion as documented by [`lock_api::RawMutex`],
/// and [`RawLock::init`] must leave the lock unlocked and usable when it returns `Ok`.
/// No method may allocate.
pub unsafe trait RawLock: lock_api::RawMutex {
    /// (Re-)initializes the native primitive.
    ///
    /// # Safety
    ///
    /// The lock must not be in use by any other thread while this runs, and must not be
    /// moved afterwards. Any lock state held before the call is discarded.
    unsafe fn init(&self) -> Result<(), InitError>;
}

/// The backend selected for the build target.
///
/// # Implementation details
/// * On linux, this uses a futex with a short adaptive spin.
/// * On apple targets, this uses `os_unfair_lock` with the adaptive spin options,
///   which need macOS 10.15 or iOS 13.
/// * On other unix targets, this uses `pthread_mutex_t`.
/// * On all other platforms, this uses parking-lot.
pub struct DefaultRawLock(default_raw::RawMutex);

/// Safety: This forwards all mutual exclusion responsibility to the inner type.
unsafe impl lock_api::RawMutex for DefaultRawLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: DefaultRawLock = DefaultRawLock(default_raw::RawMutex::INIT);

    type GuardMarker = lock_api::GuardNoSend;

    #[inline]
    fn lock(&self) {
        self.0.lock();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.0.try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { self.0.unlock() };
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.0.is_locked()
    }
}

/// Safety: This forwards all mutual exclusion responsibility to the inner type.
unsafe impl RawLock for DefaultRawLock {
    #[inline]
    unsafe fn init(&self) -> Result<(), InitError> {
        // Safety: from caller
        unsafe { self.0.init() }
    }
}
