//! Blocking synchronisation primitives
pub mod queue;
pub mod semaphore;

/// An entry in a [`Queue`]: either a value or a stop marker.
///
/// The stop marker travels in-band so a consumer thread can be told to
/// exit without reserving a magic value of `T`.
///
/// [`Queue`]: queue/struct.Queue.html
#[derive(Debug, Clone, PartialEq)]
pub enum Message<T> {
    /// A payload
    Value(T),
    /// Tells the consumer to leave its loop
    Stop,
}

impl<T> Message<T> {
    /// The payload, or `None` for a stop marker
    pub fn into_value(self) -> Option<T> {
        match self {
            Message::Value(val) => Some(val),
            Message::Stop => None,
        }
    }

    /// `true` if this is a stop marker
    pub fn is_stop(&self) -> bool {
        match self {
            Message::Stop => true,
            Message::Value(_) => false,
        }
    }
}

impl<T> From<T> for Message<T> {
    fn from(val: T) -> Self {
        Message::Value(val)
    }
}
