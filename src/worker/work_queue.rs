//! Self-executing work items
use std::sync::Arc;

use crate::errors::Result;
use crate::sync::queue::Queue;
use crate::sync::semaphore::CountingSemaphore;
use crate::sync::Message;

use super::Worker;

/// A unit of work that carries its own inputs and, after [`execute`],
/// its own results.
///
/// Different kinds of work go through one queue either as an enum or as
/// `Box<dyn WorkItem>`.
///
/// [`execute`]: trait.WorkItem.html#tymethod.execute
pub trait WorkItem: Send + 'static {
    /// Do the work
    fn execute(&mut self);
}

impl WorkItem for Box<dyn WorkItem> {
    fn execute(&mut self) {
        (**self).execute()
    }
}

// -----------------------------------------------------------------------------
//              - WorkQueue -
// -----------------------------------------------------------------------------
/// Runs [`WorkItem`]s on a pool of threads and hands them back, executed,
/// in completion order.
///
/// At most `input_len + threads` items can be between [`enqueue`] and
/// [`dequeue`]; beyond that `enqueue` blocks.
///
/// ```
/// use rankwork::worker::{WorkItem, WorkQueue};
///
/// struct Square(u64, u64);
///
/// impl WorkItem for Square {
///     fn execute(&mut self) {
///         self.1 = self.0 * self.0;
///     }
/// }
///
/// let queue = WorkQueue::new(2, 4, 4).unwrap();
/// queue.enqueue(Square(3, 0));
/// assert_eq!(queue.dequeue().1, 9);
/// ```
///
/// [`WorkItem`]: trait.WorkItem.html
/// [`enqueue`]: struct.WorkQueue.html#method.enqueue
/// [`dequeue`]: struct.WorkQueue.html#method.dequeue
pub struct WorkQueue<W: WorkItem> {
    worker: Worker<W>,
    output: Arc<Queue<W>>,
    guard: Arc<CountingSemaphore>,
    max_items: usize,
}

impl<W: WorkItem> WorkQueue<W> {
    /// Start `thread_count` threads with queues of the given lengths
    pub fn new(thread_count: usize, input_len: usize, output_len: usize) -> Result<Self> {
        let input = Arc::new(Queue::bounded(input_len));
        let output = Arc::new(Queue::bounded(output_len));
        let max_items = input_len + thread_count;

        let executed = output.clone();
        let worker = Worker::attach(input, thread_count, move |mut item: W| {
            item.execute();
            executed.enqueue(item);
        })?;

        Ok(Self {
            worker,
            output,
            guard: Arc::new(CountingSemaphore::new(max_items)),
            max_items,
        })
    }

    /// Submit an item
    pub fn enqueue(&self, item: W) {
        self.guard.take();
        self.worker.enqueue(item);
    }

    /// Submit every item in order
    pub fn enqueue_all<I: IntoIterator<Item = W>>(&self, items: I) {
        items.into_iter().for_each(|item| self.enqueue(item));
    }

    /// Take the next executed item, blocking until one is done
    pub fn dequeue(&self) -> W {
        match self.output.dequeue() {
            Message::Value(item) => {
                self.guard.give();
                item
            }
            Message::Stop => unreachable!("only executed items are pushed onto the output queue"),
        }
    }

    /// Take `count` executed items
    pub fn dequeue_many(&self, count: usize) -> Vec<W> {
        (0..count).map(|_| self.dequeue()).collect()
    }

    /// Number of threads started
    pub fn thread_count(&self) -> usize {
        self.worker.thread_count()
    }

    /// Length of the input queue
    pub fn buffer_size(&self) -> usize {
        self.worker.queue().capacity()
    }

    /// Wait until every submitted item has been dequeued, then stop the
    /// threads. Blocks forever if submitted items are never dequeued.
    pub fn shutdown(&mut self) {
        if self.worker.state() != crate::protocol::State::Running {
            return;
        }
        for _ in 0..self.max_items {
            self.guard.take();
        }
        self.worker.shutdown();
    }
}

impl<W: WorkItem> Drop for WorkQueue<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
