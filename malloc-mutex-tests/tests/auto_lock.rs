use std::panic::{AssertUnwindSafe, catch_unwind};

use malloc_mutex::{AutoLock, INIT_LOCK, LockPolicy, MaybeMutex, Mutex, MutexAutoLock};
use malloc_mutex_tests::CountingLock;

fn counted() -> &'static Mutex<CountingLock> {
    let mutex: &'static Mutex<CountingLock> = Box::leak(Box::new(Mutex::<CountingLock>::new()));
    // Safety: not shared yet
    unsafe { mutex.init() }.unwrap();
    mutex
}

#[test]
fn one_unlock_per_guard() {
    let mutex = counted();

    for _ in 0..10 {
        let _guard = AutoLock::new(mutex);
        assert!(mutex.is_locked());
    }

    let calls = mutex.raw().calls();
    assert_eq!(calls.locks, 10);
    assert_eq!(calls.unlocks, 10);
    assert!(!mutex.is_locked());
}

#[test]
fn unlocks_on_every_exit_path() {
    fn early_return(mutex: &Mutex<CountingLock>, bail: bool) -> u32 {
        let _guard = AutoLock::new(mutex);
        if bail {
            return 0;
        }
        1
    }

    fn question_mark(
        mutex: &Mutex<CountingLock>,
        input: &str,
    ) -> Result<u32, std::num::ParseIntError> {
        let _guard = AutoLock::new(mutex);
        let n = input.parse::<u32>()?;
        Ok(n + 1)
    }

    let mutex = counted();

    assert_eq!(early_return(mutex, true), 0);
    assert_eq!(early_return(mutex, false), 1);
    assert!(question_mark(mutex, "nope").is_err());
    assert_eq!(question_mark(mutex, "41"), Ok(42));

    let unwound = catch_unwind(AssertUnwindSafe(|| {
        let _guard = AutoLock::new(mutex);
        panic!("arena metadata is corrupt");
    }));
    assert!(unwound.is_err());

    let calls = mutex.raw().calls();
    assert_eq!(calls.locks, 5);
    assert_eq!(calls.unlocks, 5);
    assert!(!mutex.is_locked());
}

#[test]
fn guard_may_move_within_its_thread() {
    fn take(guard: MutexAutoLock<'_>) -> MutexAutoLock<'_> {
        guard
    }

    let mutex: Mutex = Mutex::new();
    // Safety: not shared yet
    unsafe { mutex.init() }.unwrap();

    let guard = take(AutoLock::new(&mutex));
    assert!(mutex.is_locked());
    drop(guard);
    assert!(!mutex.is_locked());
}

#[test]
fn init_lock_serializes_setup() {
    static ARENAS: [MaybeMutex; 4] = [const { MaybeMutex::new() }; 4];

    std::thread::scope(|s| {
        for arena in &ARENAS {
            s.spawn(move || {
                let _init = AutoLock::new(&INIT_LOCK);
                if arena.policy().is_none() {
                    // Safety: INIT_LOCK is held, and no arena is used before it is set up.
                    unsafe { arena.init(LockPolicy::MustLock) }.unwrap();
                }
            });
        }
    });

    for arena in &ARENAS {
        assert!(arena.lock_is_enabled());
        drop(AutoLock::new(arena));
    }
}
