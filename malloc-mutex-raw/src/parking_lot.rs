use core::cell::UnsafeCell;

use lock_api::RawMutex as _;

use crate::InitError;

pub struct RawMutex {
    inner: UnsafeCell<parking_lot::RawMutex>,
}

// Safety: parking_lot::RawMutex is Send, and init is the only writer.
unsafe impl Send for RawMutex {}
// Safety: parking_lot::RawMutex is Sync, and init is the only writer.
unsafe impl Sync for RawMutex {}

/// Safety: This forwards all mutual exclusion responsibility to parking_lot.
unsafe impl lock_api::RawMutex for RawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: RawMutex = RawMutex {
        inner: UnsafeCell::new(parking_lot::RawMutex::INIT),
    };

    type GuardMarker = lock_api::GuardNoSend;

    #[inline]
    fn lock(&self) {
        self.raw().lock();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.raw().try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { self.raw().unlock() };
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.raw().is_locked()
    }
}

impl RawMutex {
    fn raw(&self) -> &parking_lot::RawMutex {
        // Safety: only init writes through the cell, and its caller guarantees
        // that no reference obtained here is alive at that point.
        unsafe { &*self.inner.get() }
    }

    /// # Safety
    ///
    /// No other thread may be using the lock.
    #[inline]
    pub unsafe fn init(&self) -> Result<(), InitError> {
        // Safety: the caller guarantees exclusive access.
        unsafe { self.inner.get().write(parking_lot::RawMutex::INIT) };
        Ok(())
    }
}
