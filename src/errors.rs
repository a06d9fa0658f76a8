//! rankwork default `Error`
use std;
use std::fmt;

use crate::comm::Rank;

/// Result type: `std::result::Error<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;


/// Wrapping error type.
#[derive(Debug)]
pub enum Error {
    /// std::io::Error
    Io(std::io::Error),

    /// The other side of a rendezvous went away
    /// before the message was delivered
    Disconnected,

    /// A message did not fit the receive buffer
    Truncated {
        /// Size of the receive buffer
        expected: usize,
        /// Size of the message that arrived
        actual: usize,
    },

    /// A control frame could not be decoded
    InvalidFrame(&'static str),

    /// The rank embedded in a frame is not the rank
    /// the frame was received from
    RankMismatch {
        /// Rank the protocol expected
        expected: Rank,
        /// Rank found in the frame
        actual: Rank,
    },

    /// The `TagPool` does not have capacity for another tag
    NoCapacity,

    /// The rank is not a member of the context
    InvalidRank(Rank),

    /// Constructor arguments that can not work
    InvalidConfig(&'static str),

    /// A background thread panicked, with the panic message
    Panicked(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Disconnected => write!(f, "peer disconnected before delivery"),
            Error::Truncated { expected, actual } => {
                write!(f, "message of {} bytes received into a {} byte buffer", actual, expected)
            }
            Error::InvalidFrame(reason) => write!(f, "invalid frame: {}", reason),
            Error::RankMismatch { expected, actual } => {
                write!(f, "frame names rank {} but came from rank {}", actual, expected)
            }
            Error::NoCapacity => write!(f, "tag pool exhausted"),
            Error::InvalidRank(rank) => write!(f, "rank {} is not in the context", rank),
            Error::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            Error::Panicked(msg) => write!(f, "thread panicked: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}


// -----------------------------------------------------------------------------
// 		- IO error -
// -----------------------------------------------------------------------------
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}


// -----------------------------------------------------------------------------
// 		- Fatal -
// -----------------------------------------------------------------------------
/// Log the error and terminate the process.
///
/// A torn message stream can not be resynchronised, so transport failures
/// and protocol violations inside protocol threads end here.
pub fn fatal(origin: &str, err: Error) -> ! {
    error!("[{}] fatal: {}", origin, err);
    std::process::exit(1)
}

/// Check that the rank found in a frame matches the rank it was received from.
pub fn expect_rank(expected: Rank, actual: Rank) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::RankMismatch { expected, actual })
    }
}
