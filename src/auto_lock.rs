use core::marker::PhantomData;

use malloc_mutex_raw::{RawLock, lock_api};

use crate::{MaybeMutex, Mutex, StaticMutex};

/// A lock that [`AutoLock`] can hold.
pub trait Lockable {
    /// Acquires the lock, blocking until it is available.
    fn lock(&self);

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The lock must be held by the current context.
    unsafe fn unlock(&self);
}

impl<R: RawLock> Lockable for Mutex<R> {
    #[inline]
    fn lock(&self) {
        Mutex::lock(self);
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { Mutex::unlock(self) };
    }
}

impl<R: lock_api::RawMutex> Lockable for StaticMutex<R> {
    #[inline]
    fn lock(&self) {
        StaticMutex::lock(self);
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { StaticMutex::unlock(self) };
    }
}

impl<R: RawLock> Lockable for MaybeMutex<R> {
    #[inline]
    fn lock(&self) {
        MaybeMutex::lock(self);
    }

    #[inline]
    unsafe fn unlock(&self) {
        // Safety: from caller
        unsafe { MaybeMutex::unlock(self) };
    }
}

/// Holds a lock for as long as it is in scope.
///
/// Creating the guard locks, dropping it unlocks, exactly once, whether the
/// scope is left normally, by an early return, or by unwinding.
///
/// The guard borrows the lock, so the lock outlives it. It cannot be cloned, and
/// it cannot be sent to another thread: the unlock happens on the thread that
/// locked, which [`LockPolicy::AvoidLockUnsafe`](crate::LockPolicy::AvoidLockUnsafe)
/// relies on.
///
/// ```
/// use malloc_mutex::{AutoLock, LockPolicy, MaybeMutex};
///
/// static ARENA_LOCK: MaybeMutex = MaybeMutex::new();
///
/// // Safety: nothing else uses the lock yet.
/// unsafe { ARENA_LOCK.init(LockPolicy::MustLock) }.expect("out of lock resources");
///
/// {
///     let _guard = AutoLock::new(&ARENA_LOCK);
///     assert!(ARENA_LOCK.mutex().is_locked());
/// }
/// assert!(!ARENA_LOCK.mutex().is_locked());
/// ```
#[clippy::has_significant_drop]
#[must_use = "if unused the lock will immediately unlock"]
pub struct AutoLock<'a, T: Lockable + ?Sized> {
    lock: &'a T,
    _not_send: PhantomData<*const ()>,
}

/// An [`AutoLock`] holding a [`Mutex`].
pub type MutexAutoLock<'a> = AutoLock<'a, Mutex>;

/// An [`AutoLock`] holding a [`MaybeMutex`].
pub type MaybeMutexAutoLock<'a> = AutoLock<'a, MaybeMutex>;

// Safety: the guard only exposes a shared reference to the lock.
unsafe impl<T: Lockable + Sync + ?Sized> Sync for AutoLock<'_, T> {}

impl<'a, T: Lockable + ?Sized> AutoLock<'a, T> {
    /// Locks `lock` until the returned guard is dropped.
    #[inline]
    pub fn new(lock: &'a T) -> Self {
        lock.lock();
        Self {
            lock,
            _not_send: PhantomData,
        }
    }

    /// The lock held by this guard.
    pub fn lock(this: &Self) -> &'a T {
        this.lock
    }
}

impl<T: Lockable + ?Sized> Drop for AutoLock<'_, T> {
    #[inline]
    fn drop(&mut self) {
        // Safety: the lock was acquired in `new`, and this is the only unlock.
        unsafe { self.lock.unlock() };
    }
}
