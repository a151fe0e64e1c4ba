use std::{
    cell::UnsafeCell,
    sync::atomic::{AtomicUsize, Ordering},
};

use malloc_mutex::{
    AutoLock, DefaultRawLock, InitError, Lockable, RawLock,
    lock_api::{self, RawMutex as _},
};

pub mod bench;

/// A backend that counts every call before forwarding it.
pub struct CountingLock<R = DefaultRawLock> {
    inner: R,
    inits: AtomicUsize,
    locks: AtomicUsize,
    try_locks: AtomicUsize,
    unlocks: AtomicUsize,
}

/// How many times each [`CountingLock`] operation ran.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub inits: usize,
    pub locks: usize,
    pub try_locks: usize,
    pub unlocks: usize,
}

impl<R> CountingLock<R> {
    pub fn calls(&self) -> Calls {
        Calls {
            inits: self.inits.load(Ordering::Relaxed),
            locks: self.locks.load(Ordering::Relaxed),
            try_locks: self.try_locks.load(Ordering::Relaxed),
            unlocks: self.unlocks.load(Ordering::Relaxed),
        }
    }
}

/// Safety: This forwards all mutual exclusion responsibility to the inner type.
unsafe impl<R: lock_api::RawMutex> lock_api::RawMutex for CountingLock<R> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = CountingLock {
        inner: R::INIT,
        inits: AtomicUsize::new(0),
        locks: AtomicUsize::new(0),
        try_locks: AtomicUsize::new(0),
        unlocks: AtomicUsize::new(0),
    };

    type GuardMarker = R::GuardMarker;

    fn lock(&self) {
        self.locks.fetch_add(1, Ordering::Relaxed);
        self.inner.lock();
    }

    fn try_lock(&self) -> bool {
        self.try_locks.fetch_add(1, Ordering::Relaxed);
        self.inner.try_lock()
    }

    unsafe fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::Relaxed);
        // Safety: from caller
        unsafe { self.inner.unlock() };
    }

    // not counted, only used for assertions
    fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// Safety: This forwards all mutual exclusion responsibility to the inner type.
unsafe impl<R: RawLock> RawLock for CountingLock<R> {
    unsafe fn init(&self) -> Result<(), InitError> {
        self.inits.fetch_add(1, Ordering::Relaxed);
        // Safety: from caller
        unsafe { self.inner.init() }
    }
}

/// `ENOMEM`, the error reported by [`FailingLock`].
pub const OUT_OF_MEMORY: i32 = libc::ENOMEM;

/// A backend whose initialization always fails, as if the OS ran out of resources.
pub struct FailingLock(DefaultRawLock);

/// Safety: This forwards all mutual exclusion responsibility to the inner type.
unsafe impl lock_api::RawMutex for FailingLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = FailingLock(DefaultRawLock::INIT);

    type GuardMarker = lock_api::GuardNoSend;

    fn lock(&self) {
        self.0.lock();
    }

    fn try_lock(&self) -> bool {
        self.0.try_lock()
    }

    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { self.0.unlock() };
    }
}

/// Safety: init never changes the state of the inner lock.
unsafe impl RawLock for FailingLock {
    unsafe fn init(&self) -> Result<(), InitError> {
        Err(InitError::from_os_error(OUT_OF_MEMORY))
    }
}

/// A value guarded by a lock the way allocator structures are: the lock and the
/// value sit side by side, and only an [`AutoLock`] opens the value.
pub struct Guarded<L, T> {
    lock: L,
    value: UnsafeCell<T>,
}

// Safety: the value is only reached while the lock is held.
unsafe impl<L: Sync, T: Send> Sync for Guarded<L, T> {}

impl<L: Lockable, T> Guarded<L, T> {
    pub const fn new(lock: L, value: T) -> Self {
        Self {
            lock,
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    pub fn with<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let _guard = AutoLock::new(&self.lock);
        // Safety: the guard holds the lock until the end of this function.
        f(unsafe { &mut *self.value.get() })
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}
