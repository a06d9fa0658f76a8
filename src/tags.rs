//! Per-instance message tag allocation
use crate::comm::Tag;
use crate::errors::{Result, Error};

// -----------------------------------------------------------------------------
// 		- TagPool -
// -----------------------------------------------------------------------------
/// `TagPool`: a fixed block of message tags, `offset..offset + capacity`,
/// handed out in order.
///
/// Each protocol instance owns one pool and allocates the ack / data tags
/// of its threads from it. The tags live as long as the instance, so they
/// are never handed back. Pools never grow: allocating past the capacity
/// returns [`Error::NoCapacity`].
///
/// # Example
///
/// Two pools sharing a unique range:
/// ```
/// use rankwork::tags::TagPool;
///
/// let mut lower = TagPool::with_capacity_and_offset(16, 0);
/// let mut upper = TagPool::with_capacity_and_offset(16, 16);
///
/// assert_eq!(lower.allocate().unwrap(), 0);
/// assert_eq!(upper.allocate().unwrap(), 16);
/// ```
///
/// [`Error::NoCapacity`]: ../errors/enum.Error.html
#[derive(Debug)]
pub struct TagPool {
    offset: Tag,
    capacity: usize,
    next: usize,
}

impl TagPool {
    /// Create a pool of `cap` tags starting at `offset`.
    ///
    /// # Example
    ///
    /// ```
    /// # use rankwork::tags::TagPool;
    /// let mut pool = TagPool::with_capacity_and_offset(10, 5);
    /// assert_eq!(pool.offset(), 5);
    /// assert_eq!(pool.allocate().unwrap(), 5);
    /// ```
    pub fn with_capacity_and_offset(cap: usize, offset: Tag) -> Self {
        Self {
            offset,
            capacity: cap,
            next: 0,
        }
    }

    /// Return the capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the offset
    pub fn offset(&self) -> Tag {
        self.offset
    }

    /// Take the next free tag.
    pub fn allocate(&mut self) -> Result<Tag> {
        if self.next >= self.capacity {
            return Err(Error::NoCapacity);
        }
        let tag = self.offset + self.next as Tag;
        self.next += 1;
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_in_order() -> Result<()> {
        let mut pool = TagPool::with_capacity_and_offset(10, 1);
        assert_eq!(pool.allocate()?, 1);
        assert_eq!(pool.allocate()?, 2);
        assert_eq!(pool.allocate()?, 3);
        Ok(())
    }

    #[test]
    fn exhausted() {
        let mut pool = TagPool::with_capacity_and_offset(1, 0);
        assert_eq!(pool.allocate().unwrap(), 0);
        match pool.allocate() {
            Err(Error::NoCapacity) => {}
            _ => panic!("Should return a NoCapacity error")
        }

        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn empty_pool() {
        let mut pool = TagPool::with_capacity_and_offset(0, 0);
        assert!(pool.allocate().is_err());
    }
}
