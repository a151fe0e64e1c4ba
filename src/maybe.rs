use core::{
    fmt,
    sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
};

use malloc_mutex_raw::{DefaultRawLock, InitError, RawLock};

use crate::{
    Mutex,
    diagnostic::{self, Violation},
    thread::ThreadId,
};

/// Whether a [`MaybeMutex`] really locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LockPolicy {
    /// Every lock and unlock goes to the underlying [`Mutex`].
    MustLock = 1,
    /// Locking is skipped entirely.
    ///
    /// Only sound if the guarded resource is used by the thread that called
    /// [`MaybeMutex::init`] and by no other, such as a thread-local arena.
    /// Diagnostic builds check this on every lock and unlock.
    AvoidLockUnsafe = 2,
}

const UNINITIALIZED: u8 = 0;
const MUST_LOCK: u8 = LockPolicy::MustLock as u8;
const AVOID_LOCK: u8 = LockPolicy::AvoidLockUnsafe as u8;

/// What [`MaybeMutex::reinit`] did to a lock in the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkOutcome {
    /// The lock was reset and is usable by the surviving thread.
    Reinitialized,
    /// The lock elides locking and was owned by a thread that did not survive
    /// the fork. Any further use is a [`Violation::Poisoned`].
    Poisoned,
    /// The lock was never initialized, so there was nothing to reset.
    Untouched,
}

/// A mutex whose locking can be turned off for resources used by a single thread.
///
/// The [`LockPolicy`] is chosen once by [`MaybeMutex::init`]. With
/// [`LockPolicy::MustLock`] this behaves exactly like [`Mutex`]. With
/// [`LockPolicy::AvoidLockUnsafe`] locking and unlocking do nothing, and the
/// thread that initialized the lock is recorded so that use from any other thread
/// is reported as a [`Violation::WrongThread`] in diagnostic builds.
pub struct MaybeMutex<R = DefaultRawLock> {
    mutex: Mutex<R>,
    policy: AtomicU8,
    owner: AtomicUsize,
    poisoned: AtomicBool,
}

impl<R: RawLock> MaybeMutex<R> {
    /// Creates a lock that still needs [`MaybeMutex::init`].
    pub const fn new() -> Self {
        Self {
            mutex: Mutex::new(),
            policy: AtomicU8::new(UNINITIALIZED),
            owner: AtomicUsize::new(0),
            poisoned: AtomicBool::new(false),
        }
    }

    /// Initializes the lock with `policy`, owned by the calling thread.
    ///
    /// If the underlying [`Mutex`] cannot be initialized the error is returned and
    /// the lock stays uninitialized, so any later use is a violation.
    ///
    /// Poisoning lasts until the process exits: initializing a poisoned lock is a
    /// [`Violation::Poisoned`].
    ///
    /// # Safety
    ///
    /// No other thread may hold or use the lock while this runs, and the lock
    /// must not be moved once initialized.
    pub unsafe fn init(&self, policy: LockPolicy) -> Result<(), InitError> {
        if self.poisoned.load(Ordering::Relaxed) {
            diagnostic::violation(Violation::Poisoned);
        }
        self.owner
            .store(ThreadId::current().into_raw(), Ordering::Relaxed);

        // Safety: from caller
        match unsafe { self.mutex.init() } {
            Ok(()) => {
                self.policy.store(policy as u8, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                self.policy.store(UNINITIALIZED, Ordering::Release);
                Err(err)
            }
        }
    }

    /// Re-initializes the lock in a child process after `fork()`.
    ///
    /// `forking_thread` is the thread that called `fork()` in the parent, which is
    /// the only thread in the child.
    ///
    /// * With [`LockPolicy::MustLock`] the lock is always reset. Whoever held it
    ///   in the parent does not exist here.
    /// * With [`LockPolicy::AvoidLockUnsafe`] the lock is reset only if
    ///   `forking_thread` owns it, in which case the guarded resource was not being
    ///   modified during the fork. Otherwise its owner may have been halfway through
    ///   an update, so the lock is poisoned instead.
    ///
    /// # Safety
    ///
    /// Must be called in the child process before any other use of the lock, and
    /// with no other thread running.
    #[cfg(unix)]
    pub unsafe fn reinit(&self, forking_thread: ThreadId) -> Result<ForkOutcome, InitError> {
        match self.policy.load(Ordering::Acquire) {
            MUST_LOCK => {
                // Safety: from caller
                unsafe { self.mutex.init() }?;
                Ok(ForkOutcome::Reinitialized)
            }
            AVOID_LOCK if self.owner() == forking_thread => {
                // Safety: from caller
                unsafe { self.mutex.init() }?;
                let current = ThreadId::current();
                log::debug!("elided lock at {:p} now owned by {current:?}", self);
                self.owner.store(current.into_raw(), Ordering::Relaxed);
                Ok(ForkOutcome::Reinitialized)
            }
            AVOID_LOCK => {
                log::warn!(
                    "elided lock at {:p} was owned by {:?} which did not survive fork, poisoning it",
                    self,
                    self.owner(),
                );
                self.poisoned.store(true, Ordering::Relaxed);
                Ok(ForkOutcome::Poisoned)
            }
            _ => Ok(ForkOutcome::Untouched),
        }
    }

    /// Acquires the lock, or checks that locking may be skipped.
    #[inline]
    pub fn lock(&self) {
        if self.should_lock() {
            self.mutex.lock();
        }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Always succeeds when locking is elided.
    #[inline]
    #[must_use]
    pub fn try_lock(&self) -> bool {
        if self.should_lock() {
            self.mutex.try_lock()
        } else {
            true
        }
    }

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The lock must be held by the current context, from a [`MaybeMutex::lock`]
    /// or a successful [`MaybeMutex::try_lock`].
    #[inline]
    pub unsafe fn unlock(&self) {
        if self.should_lock() {
            // Safety: from caller
            unsafe { self.mutex.unlock() };
        }
    }

    /// Whether locking really happens, so concurrent access is possible at all.
    #[inline]
    pub fn lock_is_enabled(&self) -> bool {
        self.policy.load(Ordering::Relaxed) == MUST_LOCK
    }

    /// Whether the guarded resource may be used from the calling thread, either
    /// because the lock is real or because this thread owns it.
    pub fn safe_on_this_thread(&self) -> bool {
        match self.policy.load(Ordering::Relaxed) {
            MUST_LOCK => true,
            AVOID_LOCK => self.owner() == ThreadId::current(),
            _ => false,
        }
    }

    /// Whether [`MaybeMutex::reinit`] poisoned this lock.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Relaxed)
    }

    /// The policy chosen by [`MaybeMutex::init`], if it succeeded.
    pub fn policy(&self) -> Option<LockPolicy> {
        match self.policy.load(Ordering::Relaxed) {
            MUST_LOCK => Some(LockPolicy::MustLock),
            AVOID_LOCK => Some(LockPolicy::AvoidLockUnsafe),
            _ => None,
        }
    }

    /// The underlying mutex, which is never touched when locking is elided.
    pub fn mutex(&self) -> &Mutex<R> {
        &self.mutex
    }

    fn owner(&self) -> ThreadId {
        ThreadId::from_raw(self.owner.load(Ordering::Relaxed))
    }

    #[inline]
    fn should_lock(&self) -> bool {
        if self.poisoned.load(Ordering::Relaxed) {
            diagnostic::violation(Violation::Poisoned);
        }

        match self.policy.load(Ordering::Relaxed) {
            MUST_LOCK => true,
            AVOID_LOCK => {
                if diagnostic::ENABLED && self.owner() != ThreadId::current() {
                    diagnostic::violation(Violation::WrongThread);
                }
                false
            }
            _ => diagnostic::violation(Violation::Uninitialized),
        }
    }
}

impl<R: RawLock> Default for MaybeMutex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RawLock> fmt::Debug for MaybeMutex<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaybeMutex")
            .field("policy", &self.policy())
            .field("owner", &self.owner())
            .field("poisoned", &self.is_poisoned())
            .field("mutex", &self.mutex)
            .finish()
    }
}
