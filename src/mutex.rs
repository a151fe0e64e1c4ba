use core::fmt;

use malloc_mutex_raw::{DefaultRawLock, InitError, RawLock, lock_api::RawMutex as _};

/// A mutex that can live inside allocator state.
///
/// [`Mutex::new`] is a `const fn` that neither allocates nor calls into the OS,
/// so a `Mutex` can be a field of a `static`. It is not ready for use until
/// [`Mutex::init`] has succeeded.
///
/// There is no data attached to the lock: the allocator decides which of its
/// structures a given lock protects. Use [`AutoLock`](crate::AutoLock) to hold it.
pub struct Mutex<R = DefaultRawLock> {
    raw: R,
}

impl<R: RawLock> Mutex<R> {
    /// Creates a mutex that still needs [`Mutex::init`].
    pub const fn new() -> Self {
        Self { raw: R::INIT }
    }

    /// (Re-)initializes the mutex, returning whether the OS could set it up.
    ///
    /// Calling this again discards any lock state. A fork handler uses that to
    /// reset locks held by threads that do not exist in the child.
    ///
    /// # Safety
    ///
    /// No other thread may hold or use the mutex while this runs, and the mutex
    /// must not be moved once initialized.
    #[inline]
    pub unsafe fn init(&self) -> Result<(), InitError> {
        log::trace!("initializing mutex at {:p}", self);
        // Safety: from caller
        unsafe { self.raw.init() }
    }

    /// Acquires the mutex, blocking the current thread until it is available.
    ///
    /// The mutex is not recursive: locking it again from the holding thread deadlocks.
    #[inline]
    pub fn lock(&self) {
        self.raw.lock();
    }

    /// Attempts to acquire the mutex without blocking.
    ///
    /// The mutex must only be unlocked if this returned `true`.
    #[inline]
    #[must_use]
    pub fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    /// Releases the mutex.
    ///
    /// # Safety
    ///
    /// The mutex must be held by the current context, from a [`Mutex::lock`] or a
    /// successful [`Mutex::try_lock`].
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

    /// The native lock backing this mutex.
    pub fn raw(&self) -> &R {
        &self.raw
    }
}

impl<R: RawLock> Default for Mutex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RawLock> fmt::Debug for Mutex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::{format, time::Duration};

    use super::Mutex;

    #[test]
    fn lock_unlock_alternates() {
        let mutex: Mutex = Mutex::new();
        // Safety: not shared yet
        unsafe { mutex.init() }.unwrap();
        for _ in 0..3 {
            assert!(!mutex.is_locked());
            mutex.lock();
            assert!(mutex.is_locked());
            // Safety: locked above
            unsafe { mutex.unlock() };
        }
        assert!(!mutex.is_locked());
    }

    #[test]
    fn try_lock_only_succeeds_when_free() {
        let mutex: Mutex = Mutex::new();
        // Safety: not shared yet
        unsafe { mutex.init() }.unwrap();
        assert!(mutex.try_lock());
        assert!(!mutex.try_lock());
        // Safety: try_lock succeeded above
        unsafe { mutex.unlock() };
        assert!(mutex.try_lock());
        // Safety: try_lock succeeded above
        unsafe { mutex.unlock() };
    }

    #[test]
    fn second_locker_waits_for_unlock() {
        let mutex: Mutex = Mutex::new();
        // Safety: not shared yet
        unsafe { mutex.init() }.unwrap();
        let released = AtomicBool::new(false);

        mutex.lock();
        std::thread::scope(|s| {
            let waiter = s.spawn(|| {
                mutex.lock();
                let saw_release = released.load(Ordering::Relaxed);
                // Safety: locked above
                unsafe { mutex.unlock() };
                saw_release
            });

            std::thread::sleep(Duration::from_millis(50));
            assert!(!waiter.is_finished());
            released.store(true, Ordering::Relaxed);
            // Safety: locked before spawning
            unsafe { mutex.unlock() };

            assert!(waiter.join().unwrap());
        });
    }

    #[test]
    fn init_again_releases() {
        let mutex: Mutex = Mutex::new();
        // Safety: not shared yet
        unsafe { mutex.init() }.unwrap();
        mutex.lock();
        // Safety: not shared
        unsafe { mutex.init() }.unwrap();
        assert!(mutex.try_lock());
        // Safety: try_lock succeeded above
        unsafe { mutex.unlock() };
    }

    #[test]
    fn debug_reports_state() {
        let mutex: Mutex = Mutex::new();
        // Safety: not shared yet
        unsafe { mutex.init() }.unwrap();
        assert_eq!(format!("{mutex:?}"), "Mutex { locked: false, .. }");
        mutex.lock();
        assert_eq!(format!("{mutex:?}"), "Mutex { locked: true, .. }");
        // Safety: locked above
        unsafe { mutex.unlock() };
    }
}
