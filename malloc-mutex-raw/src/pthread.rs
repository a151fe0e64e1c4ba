use core::cell::UnsafeCell;

use crate::InitError;

pub struct RawMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

// Safety: pthread mutexes are designed to be shared between threads.
unsafe impl Send for RawMutex {}
// Safety: pthread mutexes are designed to be shared between threads.
unsafe impl Sync for RawMutex {}

/// Safety: mutual exclusion is provided by the pthread mutex.
unsafe impl lock_api::RawMutex for RawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: RawMutex = RawMutex {
        inner: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
    };

    type GuardMarker = lock_api::GuardNoSend;

    #[inline]
    fn lock(&self) {
        // Safety: the mutex was statically initialized and is never moved while in use.
        let rc = unsafe { libc::pthread_mutex_lock(self.inner.get()) };
        if rc != 0 {
            corrupted("pthread_mutex_lock", rc);
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        // Safety: the mutex was statically initialized and is never moved while in use.
        unsafe { libc::pthread_mutex_trylock(self.inner.get()) == 0 }
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: the caller holds the lock.
        let rc = unsafe { libc::pthread_mutex_unlock(self.inner.get()) };
        if rc != 0 {
            corrupted("pthread_mutex_unlock", rc);
        }
    }
}

impl RawMutex {
    /// # Safety
    ///
    /// No other thread may be using the lock.
    pub unsafe fn init(&self) -> Result<(), InitError> {
        // Safety: the caller guarantees exclusive access. A null attribute
        // pointer selects the default mutex type.
        let rc = unsafe { libc::pthread_mutex_init(self.inner.get(), core::ptr::null()) };
        if rc != 0 {
            log::error!("pthread_mutex_init failed with os error {rc}");
            return Err(InitError::from_os_error(rc));
        }
        Ok(())
    }
}

#[cold]
#[inline(never)]
fn corrupted(op: &str, rc: i32) -> ! {
    log::error!("{op} failed with os error {rc}");
    panic!("{op} failed with os error {rc}, the lock is corrupted");
}
