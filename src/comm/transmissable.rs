//! Payloads that can cross a rank boundary
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{Error, Result};
use super::{Communicator, Rank, Source, Tag};

// -----------------------------------------------------------------------------
//              - Transmissable -
// -----------------------------------------------------------------------------
/// A payload type that knows how to move itself over a [`Communicator`].
///
/// `send` is synchronous: it returns once the peer's matching receive has
/// taken the data. `receive` returns the value together with the rank it
/// came from, which matters when `source` is [`Source::Any`]. A payload
/// made of several messages must receive everything after the first
/// message from that resolved rank.
///
/// ```
/// use rankwork::comm::{Communicator, Rank, Source, Tag, Transmissable};
/// use rankwork::errors::Result;
///
/// #[derive(Debug, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// impl Transmissable for Point {
///     fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
///         (self.x, self.y).send(comm, dest, tag)
///     }
///
///     fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
///         let ((x, y), rank) = <(i32, i32)>::receive(comm, source, tag)?;
///         Ok((Point { x, y }, rank))
///     }
/// }
/// ```
///
/// [`Communicator`]: trait.Communicator.html
/// [`Source::Any`]: enum.Source.html
pub trait Transmissable: Sized + Send + 'static {
    /// Send to `dest` on `tag`
    fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()>;

    /// Receive from `source` on `tag`
    fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)>;
}

macro_rules! transmissable_number {
    ($ty:ty, $size:expr, $write:ident, $read:ident) => {
        impl Transmissable for $ty {
            fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
                let mut buf = Vec::with_capacity($size);
                buf.$write::<LittleEndian>(*self)?;
                comm.send(&buf, dest, tag)
            }

            fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
                let mut buf = [0u8; $size];
                let status = comm.receive(&mut buf, source, tag)?;
                let val = Cursor::new(&buf[..]).$read::<LittleEndian>()?;
                Ok((val, status.source))
            }
        }
    };
}

transmissable_number!(u16, 2, write_u16, read_u16);
transmissable_number!(u32, 4, write_u32, read_u32);
transmissable_number!(u64, 8, write_u64, read_u64);
transmissable_number!(i16, 2, write_i16, read_i16);
transmissable_number!(i32, 4, write_i32, read_i32);
transmissable_number!(i64, 8, write_i64, read_i64);
transmissable_number!(f32, 4, write_f32, read_f32);
transmissable_number!(f64, 8, write_f64, read_f64);

impl Transmissable for u8 {
    fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
        comm.send(&[*self], dest, tag)
    }

    fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
        let mut buf = [0u8; 1];
        let status = comm.receive(&mut buf, source, tag)?;
        Ok((buf[0], status.source))
    }
}

impl Transmissable for bool {
    fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
        (*self as u8).send(comm, dest, tag)
    }

    fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
        match u8::receive(comm, source, tag)? {
            (0, rank) => Ok((false, rank)),
            (1, rank) => Ok((true, rank)),
            _ => Err(Error::InvalidFrame("bool payload is neither 0 nor 1")),
        }
    }
}

/// Largest byte length (`String`) or element count (`Vec`) a length
/// prefix may declare.
pub const MAX_LENGTH: u64 = 1 << 31;

fn send_length<C: Communicator>(len: usize, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
    let len = len as u64;
    if len > MAX_LENGTH {
        return Err(Error::InvalidFrame("payload length exceeds MAX_LENGTH"));
    }
    len.send(comm, dest, tag)
}

// Nothing is allocated for a length that fails the check
fn receive_length<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(usize, Rank)> {
    let (len, rank) = u64::receive(comm, source, tag)?;
    if len > MAX_LENGTH {
        return Err(Error::InvalidFrame("declared length exceeds MAX_LENGTH"));
    }
    Ok((len as usize, rank))
}

// Length prefix, then the bytes in one message
impl Transmissable for String {
    fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
        send_length(self.len(), comm, dest, tag)?;
        comm.send(self.as_bytes(), dest, tag)
    }

    fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
        let (len, rank) = receive_length(comm, source, tag)?;
        let mut buf = vec![0u8; len];
        comm.receive(&mut buf, Source::Rank(rank), tag)?;
        match String::from_utf8(buf) {
            Ok(s) => Ok((s, rank)),
            Err(_) => Err(Error::InvalidFrame("string payload is not utf-8")),
        }
    }
}

// Length prefix, then one message per element
impl<T: Transmissable> Transmissable for Vec<T> {
    fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
        send_length(self.len(), comm, dest, tag)?;
        for val in self {
            val.send(comm, dest, tag)?;
        }
        Ok(())
    }

    fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
        let (len, rank) = receive_length(comm, source, tag)?;
        // Grows as elements arrive
        let mut values = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let (val, _) = T::receive(comm, Source::Rank(rank), tag)?;
            values.push(val);
        }
        Ok((values, rank))
    }
}

impl<A: Transmissable, B: Transmissable> Transmissable for (A, B) {
    fn send<C: Communicator>(&self, comm: &C, dest: Rank, tag: Tag) -> Result<()> {
        self.0.send(comm, dest, tag)?;
        self.1.send(comm, dest, tag)
    }

    fn receive<C: Communicator>(comm: &C, source: Source, tag: Tag) -> Result<(Self, Rank)> {
        let (a, rank) = A::receive(comm, source, tag)?;
        let (b, _) = B::receive(comm, Source::Rank(rank), tag)?;
        Ok(((a, b), rank))
    }
}
