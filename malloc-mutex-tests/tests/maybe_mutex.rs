use std::panic::{AssertUnwindSafe, catch_unwind};

use malloc_mutex::{AutoLock, LockPolicy, MaybeMutex};
use malloc_mutex_tests::{Calls, CountingLock, FailingLock, Guarded, OUT_OF_MEMORY};

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_default(),
    }
}

#[test]
fn must_lock_has_no_lost_updates() {
    let guarded: Guarded<MaybeMutex<CountingLock>, u64> = Guarded::new(MaybeMutex::new(), 0);
    // Safety: not shared yet
    unsafe { guarded.lock().init(LockPolicy::MustLock) }.unwrap();

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    guarded.with(|n| *n += 1);
                }
            });
        }
    });

    let calls = guarded.lock().mutex().raw().calls();
    assert_eq!(calls.locks, 80_000);
    assert_eq!(calls.unlocks, 80_000);
    assert_eq!(guarded.into_inner(), 80_000);
}

#[test]
fn avoid_lock_never_reaches_the_backend() {
    let guarded: Guarded<MaybeMutex<CountingLock>, Vec<u32>> =
        Guarded::new(MaybeMutex::new(), Vec::new());
    // Safety: not shared
    unsafe { guarded.lock().init(LockPolicy::AvoidLockUnsafe) }.unwrap();

    for i in 0..100 {
        guarded.with(|v| v.push(i));
    }
    assert!(guarded.lock().try_lock());
    // Safety: try_lock succeeded above
    unsafe { guarded.lock().unlock() };

    assert_eq!(
        guarded.lock().mutex().raw().calls(),
        Calls {
            inits: 1,
            ..Calls::default()
        }
    );
    assert_eq!(guarded.into_inner().len(), 100);
}

#[test]
fn avoid_lock_from_another_thread_is_a_violation() {
    let lock: MaybeMutex<CountingLock> = MaybeMutex::new();
    // Safety: not shared yet
    unsafe { lock.init(LockPolicy::AvoidLockUnsafe) }.unwrap();

    let payload = std::thread::scope(|s| {
        s.spawn(|| {
            let _guard = AutoLock::new(&lock);
        })
        .join()
        .unwrap_err()
    });

    let message = panic_message(payload);
    assert!(message.contains("does not own it"), "{message}");
    assert_eq!(lock.mutex().raw().calls().locks, 0);

    // the owner can still use it
    drop(AutoLock::new(&lock));
}

#[test]
fn init_failure_leaves_lock_unusable() {
    let lock: MaybeMutex<FailingLock> = MaybeMutex::new();
    // Safety: not shared
    let err = unsafe { lock.init(LockPolicy::MustLock) }.unwrap_err();
    assert_eq!(err.os_error(), OUT_OF_MEMORY);
    assert_eq!(lock.policy(), None);
    assert!(!lock.lock_is_enabled());

    let payload = catch_unwind(AssertUnwindSafe(|| lock.lock())).unwrap_err();
    let message = panic_message(payload);
    assert!(message.contains("before it was initialized"), "{message}");
}

#[test]
fn init_again_changes_policy() {
    let lock: MaybeMutex<CountingLock> = MaybeMutex::new();
    // Safety: not shared
    unsafe { lock.init(LockPolicy::AvoidLockUnsafe) }.unwrap();
    drop(AutoLock::new(&lock));

    // Safety: not shared
    unsafe { lock.init(LockPolicy::MustLock) }.unwrap();
    assert_eq!(lock.policy(), Some(LockPolicy::MustLock));
    drop(AutoLock::new(&lock));

    let calls = lock.mutex().raw().calls();
    assert_eq!(calls.inits, 2);
    assert_eq!(calls.locks, 1);
    assert_eq!(calls.unlocks, 1);
}
