use core::fmt;

use malloc_mutex_raw::{DefaultRawLock, lock_api, lock_api::RawMutex as _};

/// A mutex that is ready to use as soon as it is constructed.
///
/// Unlike [`Mutex`](crate::Mutex), there is no `init` step: the `const`
/// constructor is the only initialization, so a `static` of this type can be
/// locked before anything else in the process has run, including the allocator's
/// own setup. This makes it suitable for the lock that guards that setup,
/// see [`INIT_LOCK`].
pub struct StaticMutex<R = DefaultRawLock> {
    raw: R,
}

/// A value protected by a [`StaticMutex`].
///
/// The guard returned by `lock` is the only way to reach the value.
pub type StaticLocked<T> = lock_api::Mutex<StaticMutex, T>;

/// The guard for a [`StaticLocked`] value.
pub type StaticLockedGuard<'a, T> = lock_api::MutexGuard<'a, StaticMutex, T>;

/// Serializes allocator initialization for the whole process.
///
/// Its only initializer is the constant below, and it is never torn down.
pub static INIT_LOCK: StaticMutex = StaticMutex::new();

impl<R: lock_api::RawMutex> StaticMutex<R> {
    /// Creates an unlocked mutex.
    pub const fn new() -> Self {
        Self { raw: R::INIT }
    }

    /// Acquires the mutex, blocking the current thread until it is available.
    #[inline]
    pub fn lock(&self) {
        self.raw.lock();
    }

    /// Attempts to acquire the mutex without blocking.
    #[inline]
    #[must_use]
    pub fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    /// Releases the mutex.
    ///
    /// # Safety
    ///
    /// The mutex must be held by the current context.
    #[inline]
    pub unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { self.raw.unlock() };
    }

    /// Whether any thread currently holds the mutex.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}

impl<R: lock_api::RawMutex> Default for StaticMutex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: lock_api::RawMutex> fmt::Debug for StaticMutex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Safety: This forwards all mutual exclusion responsibility to the inner type.
unsafe impl<R: lock_api::RawMutex> lock_api::RawMutex for StaticMutex<R> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: StaticMutex<R> = StaticMutex::new();

    type GuardMarker = R::GuardMarker;

    #[inline]
    fn lock(&self) {
        self.raw.lock();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { self.raw.unlock() };
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }
}
