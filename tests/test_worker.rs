use std::env;
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rankwork::prelude::*;

fn ackermann(m: u64, n: u64) -> u64 {
    let mut stack = vec![m];
    let mut n = n;
    while let Some(m) = stack.pop() {
        if m == 0 {
            n += 1;
        } else if n == 0 {
            stack.push(m - 1);
            n = 1;
        } else {
            stack.push(m - 1);
            stack.push(m);
            n -= 1;
        }
    }
    n
}

fn drain<T>(queue: &Queue<T>) -> Vec<T> {
    let mut values = Vec::new();
    while let Some(msg) = queue.try_dequeue() {
        values.extend(msg.into_value());
    }
    values
}

#[test]
fn test_ackermann() {
    let output = Arc::new(Queue::bounded(64));
    let results = output.clone();

    let mut worker = Worker::new(8, 4, move |(m, n): (u64, u64)| {
        results.enqueue((m, n, ackermann(m, n)));
    })
    .unwrap();
    assert_eq!(worker.thread_count(), 4);
    assert_eq!(worker.state(), State::Running);

    for m in 2..=3 {
        worker.enqueue_all((0..=8).map(|n| (m, n)));
    }
    worker.shutdown();
    assert_eq!(worker.state(), State::Stopped);

    let mut results = drain(&output);
    results.sort();
    assert_eq!(results.len(), 18);
    for (m, n, a) in results {
        match m {
            2 => assert_eq!(a, 2 * n + 3),
            3 => assert_eq!(a, (1u64 << (n + 3)) - 3),
            _ => unreachable!(),
        }
    }
}

#[test]
fn test_shutdown_delivers_everything() {
    let output = Arc::new(Queue::bounded(100));
    let results = output.clone();

    let worker = Worker::new(10, 3, move |n: u32| {
        thread::sleep(Duration::from_millis(1));
        results.enqueue(n * 2);
    })
    .unwrap();
    worker.enqueue_all(0..100);
    drop(worker);

    let mut results = drain(&output);
    results.sort();
    assert_eq!(results, (0..100).map(|n| n * 2).collect::<Vec<_>>());
}

#[test]
fn test_attach_to_shared_queue() {
    let input = Arc::new(Queue::bounded(4));
    let processed = Arc::new(AtomicUsize::new(0));

    let counter = processed.clone();
    let mut worker = Worker::attach(input.clone(), 2, move |n: usize| {
        counter.fetch_add(n, Ordering::SeqCst);
    })
    .unwrap();

    // Fed directly, bypassing the worker
    input.enqueue_all(1..=50);
    worker.shutdown();

    assert_eq!(processed.load(Ordering::SeqCst), (1..=50).sum::<usize>());
}

#[test]
fn test_admission_ceiling() {
    let gate = Arc::new(CountingSemaphore::new(0));
    let processed = Arc::new(AtomicUsize::new(0));

    let (handler_gate, counter) = (gate.clone(), processed.clone());
    let worker = Arc::new(
        Worker::new(2, 1, move |_: u8| {
            handler_gate.take();
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap(),
    );

    // One executing plus two queued
    worker.enqueue_all(vec![1, 2, 3]);

    let fourth_in = Arc::new(AtomicBool::new(false));
    let producer = {
        let (worker, fourth_in) = (worker.clone(), fourth_in.clone());
        thread::spawn(move || {
            worker.enqueue(4);
            fourth_in.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!fourth_in.load(Ordering::SeqCst));

    for _ in 0..4 {
        gate.give();
    }
    producer.join().unwrap();
    assert!(fourth_in.load(Ordering::SeqCst));

    drop(worker);
    assert_eq!(processed.load(Ordering::SeqCst), 4);
}

#[test]
fn test_handler_struct() {
    struct Collect(Arc<Queue<String>>);

    impl Process<&'static str> for Collect {
        fn process(&self, item: &'static str) {
            self.0.enqueue(item.to_uppercase());
        }
    }

    let output = Arc::new(Queue::bounded(3));
    let mut worker = Worker::new(3, 1, Collect(output.clone())).unwrap();
    worker.enqueue_all(vec!["a", "b", "c"]);
    worker.shutdown();

    assert_eq!(drain(&output), vec!["A", "B", "C"]);
}

const PANIC_CHILD: &str = "RANKWORK_HANDLER_PANIC_CHILD";

// A panicking handler takes the whole process down with exit code 1
// instead of leaving `shutdown` waiting on an admission slot.
#[test]
fn test_handler_panic_is_fatal() {
    if env::var(PANIC_CHILD).is_ok() {
        let mut worker = Worker::new(1, 1, |n: u32| {
            if n == 0 {
                panic!("handler failed on {}", n);
            }
        })
        .unwrap();
        worker.enqueue(0);
        worker.enqueue(1);
        worker.shutdown();
        return;
    }

    let mut child = Command::new(env::current_exe().unwrap())
        .args(&["test_handler_panic_is_fatal", "--exact", "--test-threads=1"])
        .env(PANIC_CHILD, "1")
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(20);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("worker shutdown hung after a handler panic");
        }
        thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(status.code(), Some(1));
}
