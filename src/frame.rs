//! Outer byte-level framing.
//!
//! ```text
//! ┌──────┬──────┬─────────┬─────────────┬──────────┐
//! │ 0x80 │  id  │ len (L) │   payload   │ checksum │
//! │  1   │  1   │    1    │   L bytes   │    1     │
//! └──────┴──────┴─────────┴─────────────┴──────────┘
//! ```
//!
//! The checksum is the 8-bit wrapping sum of every byte before it.

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Fixed first byte of every frame.
pub const FRAME_HEADER: u8 = 0x80;

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Header, id and length bytes.
const PREFIX_LEN: usize = 3;

/// Smallest possible frame: prefix plus checksum.
pub const MIN_FRAME_LEN: usize = PREFIX_LEN + 1;

/// One complete wire unit, without header and checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(id: u8, payload: Vec<u8>) -> Self {
        Frame { id, payload }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self.id, &self.payload)
    }
}

/// 8-bit sum mod 256.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Wrap `payload` in a frame with the given message id.
///
/// # Examples
///
/// ```
/// use neewer_rs::frame;
///
/// let bytes = frame::encode(0x04, &[]).unwrap();
/// assert_eq!(bytes, vec![0x80, 0x04, 0x00, 0x84]);
/// ```
pub fn encode(id: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(Error::PayloadTooLarge(payload.len()));
    }

    let mut buf = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
    buf.push(FRAME_HEADER);
    buf.push(id);
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    buf.push(checksum(&buf));
    Ok(buf)
}

/// Decode the first frame in `data`.
///
/// On success returns the frame and the bytes following it, so a datagram
/// holding several concatenated frames is drained by calling this until the
/// remainder is empty.
pub fn decode(data: &[u8]) -> Result<(Frame, &[u8])> {
    if data.len() < MIN_FRAME_LEN {
        return Err(Error::TooShort);
    }
    if data[0] != FRAME_HEADER {
        return Err(Error::BadHeader(data[0]));
    }

    let id = data[1];
    let length = data[2] as usize;
    let end = PREFIX_LEN + length;
    if end + 1 > data.len() {
        return Err(Error::TooShort);
    }

    let expected = checksum(&data[..end]);
    let actual = data[end];
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }

    let frame = Frame::new(id, data[PREFIX_LEN..end].to_vec());
    Ok((frame, &data[end + 1..]))
}

/// Skip past a frame that failed to decode with `err`.
///
/// A checksum mismatch still tells us where the frame ends, so only that frame
/// is dropped. Otherwise scan for the next header byte after the current one;
/// if there is none the rest of the buffer is discarded.
pub fn resync<'a>(data: &'a [u8], err: &Error) -> &'a [u8] {
    if let Error::ChecksumMismatch { .. } = err
        && data.len() >= PREFIX_LEN
    {
        let end = PREFIX_LEN + data[2] as usize + 1;
        return data.get(end..).unwrap_or(&[]);
    }

    match data.iter().skip(1).position(|b| *b == FRAME_HEADER) {
        Some(pos) => &data[pos + 1..],
        None => &[],
    }
}
