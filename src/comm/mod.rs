//! # Point-to-point transport
//!
//! The protocols only need a small set of operations from the transport:
//! synchronous sends, receives from a given or any source, rank / size
//! queries, context duplication and a barrier. [`Communicator`] captures
//! exactly that, [`LocalComm`] implements it for ranks living on threads
//! of one process.
//!
//! [`Communicator`]: trait.Communicator.html
//! [`LocalComm`]: local/struct.LocalComm.html
use std::fmt;

use crate::errors::Result;

pub mod frame;
pub mod local;
pub mod transmissable;

pub use self::local::{LocalCluster, LocalComm};
pub use self::transmissable::Transmissable;

/// Index of a participant in a communication context, `0..size`
pub type Rank = u32;

/// Message tag, matched exactly on receive
pub type Tag = u32;

/// Where a receive accepts a message from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Any rank in the context
    Any,
    /// Only this rank
    Rank(Rank),
}

impl Source {
    /// `true` if a message from `rank` satisfies this source
    pub fn accepts(self, rank: Rank) -> bool {
        match self {
            Source::Any => true,
            Source::Rank(r) => r == rank,
        }
    }
}

impl From<Rank> for Source {
    fn from(rank: Rank) -> Self {
        Source::Rank(rank)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Source::Any => write!(f, "any"),
            Source::Rank(r) => write!(f, "{}", r),
        }
    }
}

/// What a completed receive matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Rank the message came from
    pub source: Rank,
    /// Tag the message carried
    pub tag: Tag,
}

// -----------------------------------------------------------------------------
//              - Communicator -
// -----------------------------------------------------------------------------
/// A communication context: membership plus a private tag space.
///
/// Handles are cheap to clone and every clone refers to the same context.
/// The context is released when the last handle on a rank is dropped.
pub trait Communicator: Clone + Send + Sync + 'static {
    /// Rank of the calling process
    fn rank(&self) -> Rank;

    /// Number of ranks in the context
    fn size(&self) -> u32;

    /// Create a new context with the same membership and an empty tag space.
    /// Collective: every rank must call it, in the same order.
    fn duplicate(&self) -> Result<Self>;

    /// Block until every rank has entered the barrier.
    /// Collective.
    fn barrier(&self) -> Result<()>;

    /// Send `buf` to `dest`, returning once the matching receive has taken it.
    fn send(&self, buf: &[u8], dest: Rank, tag: Tag) -> Result<()>;

    /// Receive a message of exactly `buf.len()` bytes.
    fn receive(&self, buf: &mut [u8], source: Source, tag: Tag) -> Result<Status>;
}
