use core::cell::UnsafeCell;

use crate::InitError;

// Private libplatform options, see os/lock_private.h in darwin-libplatform.
//
// ADAPTIVE_SPIN first shipped in macOS 10.15 and iOS 13. Older libplatform
// crashes on option bits it does not know, so this backend needs those releases
// or later.
const OS_UNFAIR_LOCK_DATA_SYNCHRONIZATION: u32 = 0x0001_0000;
const OS_UNFAIR_LOCK_ADAPTIVE_SPIN: u32 = 0x0004_0000;

unsafe extern "C" {
    fn os_unfair_lock_lock_with_options(lock: libc::os_unfair_lock_t, options: u32);
}

pub struct RawMutex {
    inner: UnsafeCell<libc::os_unfair_lock>,
}

// Safety: os_unfair_lock is designed to be shared between threads.
unsafe impl Send for RawMutex {}
// Safety: os_unfair_lock is designed to be shared between threads.
unsafe impl Sync for RawMutex {}

/// Safety: mutual exclusion is provided by os_unfair_lock.
unsafe impl lock_api::RawMutex for RawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: RawMutex = RawMutex {
        inner: UnsafeCell::new(libc::OS_UNFAIR_LOCK_INIT),
    };

    type GuardMarker = lock_api::GuardNoSend;

    #[inline]
    fn lock(&self) {
        // DATA_SYNCHRONIZATION tells the kernel that the holder can make
        // progress without help from other threads, and ADAPTIVE_SPIN lets the
        // kernel spin on a contended lock while the owner is running.
        //
        // Safety: the lock is a valid os_unfair_lock for the lifetime of self.
        unsafe {
            os_unfair_lock_lock_with_options(
                self.inner.get(),
                OS_UNFAIR_LOCK_DATA_SYNCHRONIZATION | OS_UNFAIR_LOCK_ADAPTIVE_SPIN,
            );
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        // Safety: the lock is a valid os_unfair_lock for the lifetime of self.
        unsafe { libc::os_unfair_lock_trylock(self.inner.get()) }
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: the caller holds the lock.
        unsafe { libc::os_unfair_lock_unlock(self.inner.get()) };
    }
}

impl RawMutex {
    /// # Safety
    ///
    /// No other thread may be using the lock.
    #[inline]
    pub unsafe fn init(&self) -> Result<(), InitError> {
        // Safety: the caller guarantees exclusive access.
        unsafe { self.inner.get().write(libc::OS_UNFAIR_LOCK_INIT) };
        Ok(())
    }
}
