use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rankwork::prelude::*;

#[test]
fn test_initial_count() {
    let sem = CountingSemaphore::new(2);
    assert!(sem.try_take());
    assert!(sem.try_take());
    assert!(!sem.try_take());
    assert_eq!(sem.count(), 0);
}

#[test]
fn test_give_wakes_taker() {
    let sem = Arc::new(CountingSemaphore::new(0));
    let taken = Arc::new(AtomicBool::new(false));

    let handle = {
        let (sem, taken) = (sem.clone(), taken.clone());
        thread::spawn(move || {
            sem.take();
            taken.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!taken.load(Ordering::SeqCst));

    sem.give();
    handle.join().unwrap();
    assert!(taken.load(Ordering::SeqCst));
    assert_eq!(sem.count(), 0);
}

#[test]
fn test_many_takers() {
    let sem = Arc::new(CountingSemaphore::new(0));
    let total = Arc::new(AtomicUsize::new(0));

    let takers: Vec<_> = (0..8)
        .map(|_| {
            let (sem, total) = (sem.clone(), total.clone());
            thread::spawn(move || {
                for _ in 0..100 {
                    sem.take();
                    total.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for _ in 0..800 {
        sem.give();
    }

    for taker in takers {
        taker.join().unwrap();
    }
    assert_eq!(total.load(Ordering::SeqCst), 800);
    assert_eq!(sem.count(), 0);
}

#[test]
fn test_count_after_partial_take() {
    let sem = CountingSemaphore::new(0);
    for _ in 0..7 {
        sem.give();
    }
    for _ in 0..3 {
        sem.take();
    }
    assert_eq!(sem.count(), 4);
}
