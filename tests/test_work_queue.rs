use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rankwork::prelude::*;

struct Square {
    input: u64,
    output: u64,
}

impl WorkItem for Square {
    fn execute(&mut self) {
        self.output = self.input * self.input;
    }
}

enum Job {
    Sum(Vec<u32>, u32),
    Shout(String),
}

impl WorkItem for Job {
    fn execute(&mut self) {
        match self {
            Job::Sum(values, total) => *total = values.iter().sum(),
            Job::Shout(text) => *text = text.to_uppercase(),
        }
    }
}

#[test]
fn test_squares() {
    let queue: Arc<WorkQueue<Square>> = Arc::new(WorkQueue::new(3, 4, 4).unwrap());
    assert_eq!(queue.thread_count(), 3);
    assert_eq!(queue.buffer_size(), 4);

    let producer = {
        let queue = queue.clone();
        thread::spawn(move || {
            queue.enqueue_all((0..200).map(|input| Square { input, output: 0 }));
        })
    };

    let mut done: Vec<_> = queue.dequeue_many(200).into_iter().map(|sq| (sq.input, sq.output)).collect();
    producer.join().unwrap();
    done.sort();

    assert_eq!(done.len(), 200);
    for (input, output) in done {
        assert_eq!(output, input * input);
    }
}

#[test]
fn test_mixed_jobs() {
    let queue = WorkQueue::new(2, 2, 2).unwrap();
    queue.enqueue(Job::Sum(vec![1, 2, 3], 0));
    queue.enqueue(Job::Shout("quiet".to_string()));

    let mut sums = 0;
    let mut shouts = 0;
    for job in queue.dequeue_many(2) {
        match job {
            Job::Sum(_, total) => {
                assert_eq!(total, 6);
                sums += 1;
            }
            Job::Shout(text) => {
                assert_eq!(text, "QUIET");
                shouts += 1;
            }
        }
    }
    assert_eq!((sums, shouts), (1, 1));
}

#[test]
fn test_boxed_items() {
    struct Tick(Arc<AtomicUsize>);

    impl WorkItem for Tick {
        fn execute(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let ticks = Arc::new(AtomicUsize::new(0));
    let queue: WorkQueue<Box<dyn WorkItem>> = WorkQueue::new(2, 8, 8).unwrap();
    for _ in 0..8 {
        queue.enqueue(Box::new(Tick(ticks.clone())));
    }
    assert_eq!(queue.dequeue_many(8).len(), 8);
    assert_eq!(ticks.load(Ordering::SeqCst), 8);
}
