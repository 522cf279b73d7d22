//! Length-value sub-encoding: repeated `[u16 big-endian length][data]` parts.

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Largest part the two-byte length can describe.
pub const MAX_PART: usize = u16::MAX as usize;

/// Split `data` into its length-prefixed parts.
///
/// # Examples
///
/// ```
/// use neewer_rs::lv;
///
/// let parts = lv::decode(&[0x00, 0x02, b'h', b'i', 0x00, 0x00]).unwrap();
/// assert_eq!(parts, vec![&b"hi"[..], &b""[..]]);
/// ```
pub fn decode(mut data: &[u8]) -> Result<Vec<&[u8]>> {
    if data.len() < 2 {
        return Err(Error::TooShort);
    }

    let mut parts = Vec::new();
    while !data.is_empty() {
        if data.len() < 2 {
            return Err(Error::TooShort);
        }
        let length = u16::from_be_bytes([data[0], data[1]]) as usize;
        let rest = &data[2..];
        if length > rest.len() {
            return Err(Error::TooShort);
        }
        parts.push(&rest[..length]);
        data = &rest[length..];
    }
    Ok(parts)
}

/// Concatenate `parts`, each prefixed with its big-endian length.
pub fn encode<T: AsRef<[u8]>>(parts: &[T]) -> Result<Vec<u8>> {
    if parts.is_empty() {
        return Err(Error::NoParts);
    }

    let mut buf = Vec::new();
    for part in parts {
        let part = part.as_ref();
        let length = u16::try_from(part.len()).map_err(|_| Error::PartTooLarge(part.len()))?;
        buf.extend_from_slice(&length.to_be_bytes());
        buf.extend_from_slice(part);
    }
    Ok(buf)
}
