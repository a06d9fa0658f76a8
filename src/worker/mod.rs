//! # Thread pool workers
//!
//! A [`Worker`] pulls items off a [`Queue`] on a fixed number of threads
//! and hands each one to a [`Process`] implementation. A [`WorkQueue`] runs
//! self-executing [`WorkItem`]s and returns them on an output queue.
//!
//! [`Worker`]: struct.Worker.html
//! [`Queue`]: ../sync/queue/struct.Queue.html
//! [`Process`]: trait.Process.html
//! [`WorkQueue`]: work_queue/struct.WorkQueue.html
//! [`WorkItem`]: work_queue/trait.WorkItem.html
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::errors::Result;
use crate::protocol::{join_all, spawn, State};
use crate::sync::queue::Queue;
use crate::sync::semaphore::CountingSemaphore;
use crate::sync::Message;

pub mod work_queue;

pub use self::work_queue::{WorkItem, WorkQueue};

/// Per-item handler run on the worker threads.
///
/// Closures taking the item by value implement it:
/// ```
/// use rankwork::worker::Worker;
///
/// let mut worker = Worker::new(4, 2, |n: u64| {
///     assert!(n < 10);
/// }).unwrap();
/// worker.enqueue_all(0..10);
/// worker.shutdown();
/// ```
pub trait Process<T>: Send + Sync + 'static {
    /// Handle one item
    fn process(&self, item: T);
}

impl<T, F> Process<T> for F
where
    F: Fn(T) + Send + Sync + 'static,
{
    fn process(&self, item: T) {
        self(item)
    }
}

// -----------------------------------------------------------------------------
//              - Worker -
// -----------------------------------------------------------------------------
/// A pool of threads draining one input queue.
///
/// A worker created with [`new`] owns its queue and admits at most
/// `threads + capacity` items at a time (queued plus executing): once that
/// ceiling is reached [`enqueue`] blocks until an item finishes. A worker
/// created with [`attach`] shares a queue that other components feed
/// directly and relies on that queue's bound alone.
///
/// Shutdown pushes one stop marker per thread behind whatever is queued,
/// so every item enqueued before [`shutdown`] is processed.
///
/// [`new`]: struct.Worker.html#method.new
/// [`attach`]: struct.Worker.html#method.attach
/// [`enqueue`]: struct.Worker.html#method.enqueue
/// [`shutdown`]: struct.Worker.html#method.shutdown
pub struct Worker<T: Send + 'static> {
    queue: Arc<Queue<T>>,
    admission: Option<Arc<CountingSemaphore>>,
    threads: Vec<JoinHandle<()>>,
    state: State,
}

impl<T: Send + 'static> Worker<T> {
    /// Create a worker with its own queue of `capacity` items
    /// and `thread_count` threads.
    pub fn new<P: Process<T>>(capacity: usize, thread_count: usize, handler: P) -> Result<Self> {
        let queue = Arc::new(Queue::bounded(capacity));
        let admission = Arc::new(CountingSemaphore::new(thread_count + capacity));
        Self::start(queue, Some(admission), thread_count, handler)
    }

    /// Create a worker draining an existing queue
    pub fn attach<P: Process<T>>(queue: Arc<Queue<T>>, thread_count: usize, handler: P) -> Result<Self> {
        Self::start(queue, None, thread_count, handler)
    }

    fn start<P: Process<T>>(
        queue: Arc<Queue<T>>,
        admission: Option<Arc<CountingSemaphore>>,
        thread_count: usize,
        handler: P,
    ) -> Result<Self> {
        let handler = Arc::new(handler);
        let mut threads = Vec::with_capacity(thread_count);

        for i in 0..thread_count {
            let queue = queue.clone();
            let admission = admission.clone();
            let handler = handler.clone();
            threads.push(spawn(format!("worker-{}", i), move || {
                worker_main(queue, admission, handler);
                Ok(())
            })?);
        }

        Ok(Self {
            queue,
            admission,
            threads,
            state: State::Running,
        })
    }

    /// Submit an item, blocking while the worker is at its admission ceiling
    pub fn enqueue(&self, item: T) {
        if let Some(ref admission) = self.admission {
            admission.take();
        }
        self.queue.enqueue(item);
    }

    /// Submit every item in order
    pub fn enqueue_all<I: IntoIterator<Item = T>>(&self, items: I) {
        items.into_iter().for_each(|item| self.enqueue(item));
    }

    /// The input queue
    pub fn queue(&self) -> &Arc<Queue<T>> {
        &self.queue
    }

    /// Number of threads started
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Process everything already submitted, then stop and join the threads
    pub fn shutdown(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.state = State::Draining;

        if let Some(ref admission) = self.admission {
            for _ in 0..self.threads.len() {
                admission.take();
            }
        }

        for _ in 0..self.threads.len() {
            self.queue.enqueue_stop();
        }
        join_all(&mut self.threads);
        self.state = State::Stopped;
    }
}

impl<T: Send + 'static> Drop for Worker<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main<T, P: Process<T>>(
    queue: Arc<Queue<T>>,
    admission: Option<Arc<CountingSemaphore>>,
    handler: Arc<P>,
) {
    while let Message::Value(item) = queue.dequeue() {
        handler.process(item);
        if let Some(ref admission) = admission {
            admission.give();
        }
    }
}
