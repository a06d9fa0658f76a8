//! Counting semaphore
use parking_lot::{Condvar, Mutex};

// -----------------------------------------------------------------------------
//              - Counting semaphore -
// -----------------------------------------------------------------------------
/// A thread-safe non-negative counter.
///
/// [`take`] blocks until the count is positive, [`try_take`] never blocks.
/// Wake-ups are not FIFO-fair.
///
/// ```
/// use rankwork::sync::semaphore::CountingSemaphore;
///
/// let sem = CountingSemaphore::new(1);
/// assert!(sem.try_take());
/// assert!(!sem.try_take());
/// sem.give();
/// sem.take();
/// assert_eq!(sem.count(), 0);
/// ```
///
/// [`take`]: struct.CountingSemaphore.html#method.take
/// [`try_take`]: struct.CountingSemaphore.html#method.try_take
#[derive(Debug, Default)]
pub struct CountingSemaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl CountingSemaphore {
    /// Create a semaphore with an initial count
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Increment the count and wake one blocked taker
    pub fn give(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.available.notify_one();
    }

    /// Block until the count is positive, then decrement it
    pub fn take(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }

    /// Decrement the count if it is positive.
    /// Returns `false` without blocking otherwise.
    pub fn try_take(&self) -> bool {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Point-in-time read of the count, advisory only
    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}
