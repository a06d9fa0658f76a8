//! Control frames exchanged while negotiating a rendezvous.
//!
//! All fields are little-endian `u32`, flags are a single byte (`0` or `1`).
//! A protocol that has no use for a field leaves it at zero.
//!
//! | Frame            | Layout                                 | Bytes |
//! |------------------|----------------------------------------|-------|
//! | `TxRequestFrame` | rank, ack_tag, data_tag, stop          | 13    |
//! | `RxRequestFrame` | rank, ack_tag, data_tag                | 12    |
//! | `TxAckFrame`     | rank, data_tag                         | 8     |
//! | `RxAckFrame`     | rank, data_tag, stop                   | 9     |
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{Error, Result};
use super::{Communicator, Rank, Source, Status, Tag};

/// A fixed-size record that can be sent as one message
pub trait Frame: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode into exactly `SIZE` bytes
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decode from exactly `SIZE` bytes
    fn decode(buf: &[u8]) -> Result<Self>;
}

/// Send a frame to `dest`
pub fn send_frame<C: Communicator, F: Frame>(comm: &C, frame: &F, dest: Rank, tag: Tag) -> Result<()> {
    let buf = frame.encode()?;
    comm.send(&buf, dest, tag)
}

/// Receive a frame, returning it with the status of the receive
pub fn receive_frame<C: Communicator, F: Frame>(comm: &C, source: Source, tag: Tag) -> Result<(F, Status)> {
    let mut buf = vec![0u8; F::SIZE];
    let status = comm.receive(&mut buf, source, tag)?;
    Ok((F::decode(&buf)?, status))
}

fn write_flag(buf: &mut Vec<u8>, flag: bool) -> Result<()> {
    buf.write_u8(flag as u8)?;
    Ok(())
}

fn read_flag(rdr: &mut Cursor<&[u8]>) -> Result<bool> {
    match rdr.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::InvalidFrame("flag byte is neither 0 nor 1")),
    }
}

fn check_len(buf: &[u8], size: usize) -> Result<()> {
    if buf.len() != size {
        return Err(Error::Truncated { expected: size, actual: buf.len() });
    }
    Ok(())
}

// -----------------------------------------------------------------------------
//              - Tx request -
// -----------------------------------------------------------------------------
/// A rank asks to transmit one item.
/// With `stop` set it instead tells the receiving thread to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxRequestFrame {
    /// Requesting rank
    pub rank: Rank,
    /// Tag the requester waits for its acknowledge on
    pub ack_tag: Tag,
    /// Tag the requester will send the payload on
    pub data_tag: Tag,
    /// Stop request
    pub stop: bool,
}

impl TxRequestFrame {
    /// A stop request from `rank`
    pub fn stop(rank: Rank) -> Self {
        Self { rank, stop: true, ..Default::default() }
    }
}

impl Frame for TxRequestFrame {
    const SIZE: usize = 13;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.write_u32::<LittleEndian>(self.rank)?;
        buf.write_u32::<LittleEndian>(self.ack_tag)?;
        buf.write_u32::<LittleEndian>(self.data_tag)?;
        write_flag(&mut buf, self.stop)?;
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::SIZE)?;
        let mut rdr = Cursor::new(buf);
        Ok(Self {
            rank: rdr.read_u32::<LittleEndian>()?,
            ack_tag: rdr.read_u32::<LittleEndian>()?,
            data_tag: rdr.read_u32::<LittleEndian>()?,
            stop: read_flag(&mut rdr)?,
        })
    }
}

// -----------------------------------------------------------------------------
//              - Rx request -
// -----------------------------------------------------------------------------
/// A rank asks to receive one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxRequestFrame {
    /// Requesting rank
    pub rank: Rank,
    /// Tag the requester waits for its acknowledge on
    pub ack_tag: Tag,
    /// Tag the requester will receive the payload on
    pub data_tag: Tag,
}

impl Frame for RxRequestFrame {
    const SIZE: usize = 12;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.write_u32::<LittleEndian>(self.rank)?;
        buf.write_u32::<LittleEndian>(self.ack_tag)?;
        buf.write_u32::<LittleEndian>(self.data_tag)?;
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::SIZE)?;
        let mut rdr = Cursor::new(buf);
        Ok(Self {
            rank: rdr.read_u32::<LittleEndian>()?,
            ack_tag: rdr.read_u32::<LittleEndian>()?,
            data_tag: rdr.read_u32::<LittleEndian>()?,
        })
    }
}

// -----------------------------------------------------------------------------
//              - Tx acknowledge -
// -----------------------------------------------------------------------------
/// Answer to a transmit request: where the payload goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxAckFrame {
    /// Receiving rank
    pub rank: Rank,
    /// Tag to send the payload on
    pub data_tag: Tag,
}

impl Frame for TxAckFrame {
    const SIZE: usize = 8;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.write_u32::<LittleEndian>(self.rank)?;
        buf.write_u32::<LittleEndian>(self.data_tag)?;
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::SIZE)?;
        let mut rdr = Cursor::new(buf);
        Ok(Self {
            rank: rdr.read_u32::<LittleEndian>()?,
            data_tag: rdr.read_u32::<LittleEndian>()?,
        })
    }
}

// -----------------------------------------------------------------------------
//              - Rx acknowledge -
// -----------------------------------------------------------------------------
/// Answer to a receive request: where the payload comes from,
/// or `stop` if no more payloads will come
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxAckFrame {
    /// Transmitting rank
    pub rank: Rank,
    /// Tag the payload arrives on
    pub data_tag: Tag,
    /// No payload, exit
    pub stop: bool,
}

impl RxAckFrame {
    /// A stop acknowledge sent by `rank`
    pub fn stop(rank: Rank) -> Self {
        Self { rank, stop: true, ..Default::default() }
    }
}

impl Frame for RxAckFrame {
    const SIZE: usize = 9;

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.write_u32::<LittleEndian>(self.rank)?;
        buf.write_u32::<LittleEndian>(self.data_tag)?;
        write_flag(&mut buf, self.stop)?;
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        check_len(buf, Self::SIZE)?;
        let mut rdr = Cursor::new(buf);
        Ok(Self {
            rank: rdr.read_u32::<LittleEndian>()?,
            data_tag: rdr.read_u32::<LittleEndian>()?,
            stop: read_flag(&mut rdr)?,
        })
    }
}
