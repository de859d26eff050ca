use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use wait_counter::Counter;

const THREADS: usize = 8;
const ROUNDS: usize = 10_000;

#[test]
fn balanced_calls_from_many_threads() {
    let counter = Counter::default();
    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..ROUNDS {
                    counter.increment();
                    counter.decrement();
                }
            });
        }
    });
    counter.wait();
    assert_eq!(counter.value(), 0);
}

#[test]
fn reader_never_sees_wild_values() {
    let counter = Counter::default();
    let done = AtomicBool::new(false);
    thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut reads = 0usize;
            while !done.load(Ordering::Relaxed) {
                // every worker holds at most two units
                assert!(counter.value() <= 2 * THREADS);
                reads += 1;
            }
            reads
        });
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        counter.increment();
                        counter.increment();
                        counter.decrement();
                        counter.decrement();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        assert!(reader.join().unwrap() > 0);
    });
    assert_eq!(counter.value(), 0);
}

#[test]
fn single_unit_never_reads_higher() {
    const READS: usize = 200_000;
    let counter = Counter::default();
    let done = AtomicBool::new(false);
    let too_high = thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                counter.increment();
                counter.decrement();
            }
        });
        let too_high = (0..READS).filter(|_| counter.value() > 1).count();
        done.store(true, Ordering::Relaxed);
        too_high
    });
    assert_eq!(too_high, 0);
    assert_eq!(counter.value(), 0);
}

#[test]
fn idle_counter_reads_zero_under_waiters() {
    const READS: usize = 200_000;
    let counter = Counter::default();
    let done = AtomicBool::new(false);
    let nonzero = thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    counter.wait();
                }
            });
        }
        let nonzero = (0..READS).filter(|_| counter.value() != 0).count();
        done.store(true, Ordering::Relaxed);
        nonzero
    });
    assert_eq!(nonzero, 0);
}

#[test]
fn wait_blocks_while_units_are_outstanding() {
    let counter = Arc::new(Counter::default());
    let unit = counter.account_owned();
    let (tx, rx) = mpsc::channel();

    let waiter = thread::spawn({
        let counter = Arc::clone(&counter);
        move || {
            counter.wait();
            tx.send(()).unwrap();
        }
    });

    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    drop(unit);
    rx.recv_timeout(Duration::from_secs(10))
        .expect("waiter was not released");
    waiter.join().unwrap();
}

#[test]
fn all_waiters_are_released() {
    const WAITERS: usize = 6;
    let counter = Counter::new(wait_counter::Placement::Private, 1);
    thread::scope(|s| {
        let waiters: Vec<_> = (0..WAITERS).map(|_| s.spawn(|| counter.wait())).collect();
        thread::sleep(Duration::from_millis(20));
        counter.decrement();
        for waiter in waiters {
            waiter.join().unwrap();
        }
    });
    assert_eq!(counter.value(), 0);
}

#[test]
fn waiters_survive_churn() {
    let counter = Counter::default();
    thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        counter.scope(thread::yield_now);
                    }
                })
            })
            .collect();
        let waiters: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    for _ in 0..100 {
                        counter.wait();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        for waiter in waiters {
            waiter.join().unwrap();
        }
    });
    counter.wait();
    assert_eq!(counter.value(), 0);
}
