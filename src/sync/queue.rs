//! Bounded blocking queue
use parking_lot::Mutex;

use super::semaphore::CountingSemaphore;
use super::Message;

// -----------------------------------------------------------------------------
// 		- Ring -
// -----------------------------------------------------------------------------
struct Ring<T> {
    slots: Vec<Option<Message<T>>>,
    front: usize,
    back: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            front: 0,
            back: 0,
        }
    }

    fn write(&mut self, msg: Message<T>) {
        debug_assert!(self.slots[self.back].is_none());
        self.slots[self.back] = Some(msg);
        self.back = (self.back + 1) % self.slots.len();
    }

    // Taking the slot drops the queue's hold on the previous occupant
    fn read(&mut self) -> Option<Message<T>> {
        let msg = self.slots[self.front].take();
        self.front = (self.front + 1) % self.slots.len();
        msg
    }
}

// -----------------------------------------------------------------------------
// 		- Queue -
// -----------------------------------------------------------------------------
/// A bounded FIFO queue shared between producer and consumer threads.
///
/// Two semaphores provide the backpressure: `data` counts occupied slots and
/// `free_space` counts empty ones. [`enqueue`] blocks while the queue is
/// full, [`dequeue`] blocks while it is empty.
///
/// Every slot holds a [`Message`], so a producer can push a stop marker
/// alongside ordinary values.
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use rankwork::sync::Message;
/// use rankwork::sync::queue::Queue;
///
/// let queue = Arc::new(Queue::bounded(1));
/// let producer = {
///     let queue = queue.clone();
///     thread::spawn(move || {
///         queue.enqueue(1u32);
///         queue.enqueue(2u32);
///         queue.enqueue_stop();
///     })
/// };
///
/// assert_eq!(queue.dequeue(), Message::Value(1));
/// assert_eq!(queue.dequeue(), Message::Value(2));
/// assert!(queue.dequeue().is_stop());
/// producer.join().unwrap();
/// ```
///
/// [`enqueue`]: struct.Queue.html#method.enqueue
/// [`dequeue`]: struct.Queue.html#method.dequeue
/// [`Message`]: ../enum.Message.html
pub struct Queue<T> {
    ring: Mutex<Ring<T>>,
    data: CountingSemaphore,
    free_space: CountingSemaphore,
    capacity: usize,
}

impl<T> Queue<T> {
    /// Create a queue holding at most `capacity` messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least one");

        Self {
            ring: Mutex::new(Ring::with_capacity(capacity)),
            data: CountingSemaphore::new(0),
            free_space: CountingSemaphore::new(capacity),
            capacity,
        }
    }

    /// Maximum number of messages held at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages currently waiting, advisory only
    pub fn len(&self) -> usize {
        self.data.count()
    }

    /// Returns `true` if no message is waiting, advisory only
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a message, blocking while the queue is full
    pub fn push(&self, msg: Message<T>) {
        self.free_space.take();
        self.ring.lock().write(msg);
        self.data.give();
    }

    /// Push a value, blocking while the queue is full
    pub fn enqueue(&self, val: T) {
        self.push(Message::Value(val));
    }

    /// Push a stop marker, blocking while the queue is full
    pub fn enqueue_stop(&self) {
        self.push(Message::Stop);
    }

    /// Push every value in order.
    /// Other producers may interleave between elements.
    pub fn enqueue_all<I: IntoIterator<Item = T>>(&self, values: I) {
        values.into_iter().for_each(|val| self.enqueue(val));
    }

    /// Pop the oldest message, blocking while the queue is empty
    pub fn dequeue(&self) -> Message<T> {
        self.data.take();
        let msg = self.ring.lock().read();
        self.free_space.give();
        match msg {
            Some(msg) => msg,
            None => panic!("data semaphore out of step with ring contents"),
        }
    }

    /// Pop the oldest message if one is waiting
    pub fn try_dequeue(&self) -> Option<Message<T>> {
        if !self.data.try_take() {
            return None;
        }
        let msg = self.ring.lock().read();
        self.free_space.give();
        msg
    }

    /// Pop `count` messages one at a time.
    /// Other consumers may interleave between elements.
    pub fn dequeue_many(&self, count: usize) -> Vec<Message<T>> {
        (0..count).map(|_| self.dequeue()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_around() {
        let queue = Queue::bounded(3);
        for round in 0..10u32 {
            queue.enqueue(round);
            queue.enqueue(round + 100);
            assert_eq!(queue.dequeue(), Message::Value(round));
            assert_eq!(queue.dequeue(), Message::Value(round + 100));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn dequeue_clears_slot() {
        use std::sync::Arc;

        let payload = Arc::new(5u8);
        let queue = Queue::bounded(2);
        queue.enqueue(payload.clone());
        assert_eq!(Arc::strong_count(&payload), 2);

        drop(queue.dequeue());
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[test]
    fn try_dequeue_empty() {
        let queue: Queue<u8> = Queue::bounded(1);
        assert!(queue.try_dequeue().is_none());
        queue.enqueue_stop();
        assert_eq!(queue.try_dequeue(), Some(Message::Stop));
    }

    #[test]
    #[should_panic]
    fn zero_capacity() {
        let _queue: Queue<u8> = Queue::bounded(0);
    }
}
