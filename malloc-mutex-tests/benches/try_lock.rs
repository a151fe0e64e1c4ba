use std::{hint::black_box, thread::available_parallelism};

use malloc_mutex::Mutex;
use malloc_mutex_tests::bench::bench;

fn main() {
    let t = available_parallelism().unwrap().get();
    let rounds = 50000;
    let iters = 50;

    println!("malloc_mutex::Mutex[threads = {t}]:");
    let mutex: Mutex = Mutex::new();
    // Safety: not shared yet
    unsafe { mutex.init() }.unwrap();
    bench(t, rounds, iters, &mutex, |m| {
        if black_box(m.try_lock()) {
            // Safety: try_lock succeeded
            unsafe { m.unlock() };
        }
    });

    println!("parking_lot::Mutex[threads = {t}]:");
    let mutex = parking_lot::Mutex::new(());
    bench(t, rounds, iters, &mutex, |m| {
        drop(black_box(m.try_lock()));
    });

    println!("std::sync::Mutex[threads = {t}]:");
    let mutex = std::sync::Mutex::new(());
    bench(t, rounds, iters, &mutex, |m| {
        drop(black_box(m.try_lock()));
    });
}
