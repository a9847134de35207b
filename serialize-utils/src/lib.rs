//! Reading and writing the compact wire format.
//!
//! Every wire type owns a [`WireEncode::write_to`] that appends its bytes to a
//! buffer and a [`WireDecode::read_from`] that consumes its bytes from a
//! [`Cursor`]. Counts are written with the short-vec length encoding; keys,
//! hashes and signatures are written raw.
use {
    wallet_address::{Address, ADDRESS_BYTES},
    wallet_hash::{Hash, HASH_BYTES},
    wallet_short_vec::ShortVecError,
    wallet_signature::{Signature, SIGNATURE_BYTES},
};

mod cursor;

pub use cursor::Cursor;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),
    #[error("{0} trailing bytes after the end of the value")]
    TrailingBytes(usize),
    #[error("invalid length prefix: {0}")]
    ShortVec(#[from] ShortVecError),
    #[error("unsupported message version {0}")]
    UnsupportedMessageVersion(u8),
    #[error("expected a legacy message but found a version prefix")]
    UnexpectedVersionedMessage,
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

/// A value with a fixed wire representation.
pub trait WireEncode {
    /// Exact number of bytes [`WireEncode::write_to`] appends.
    fn wire_size(&self) -> usize;

    /// Appends the wire bytes of `self` to `buf`.
    fn write_to(&self, buf: &mut Vec<u8>);

    fn to_wire_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_size());
        self.write_to(&mut buf);
        buf
    }
}

/// A value that can be read back from its wire representation.
pub trait WireDecode: Sized {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError>;

    /// Decodes a value that must span all of `bytes`.
    fn from_wire_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::read_from(&mut cursor)?;
        cursor.finish()?;
        Ok(value)
    }
}

impl WireEncode for u8 {
    fn wire_size(&self) -> usize {
        1
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(*self);
    }
}

impl WireDecode for u8 {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        cursor.read_u8()
    }
}

impl WireEncode for Address {
    fn wire_size(&self) -> usize {
        ADDRESS_BYTES
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_ref());
    }
}

impl WireDecode for Address {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        cursor.read_array().map(Address::new_from_array)
    }
}

impl WireEncode for Hash {
    fn wire_size(&self) -> usize {
        HASH_BYTES
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_ref());
    }
}

impl WireDecode for Hash {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        cursor.read_array().map(Hash::new_from_array)
    }
}

impl WireEncode for Signature {
    fn wire_size(&self) -> usize {
        SIGNATURE_BYTES
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_ref());
    }
}

impl WireDecode for Signature {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        cursor.read_array().map(Signature::from_array)
    }
}

/// Wire size of `items` behind a length prefix.
pub fn short_vec_size<T: WireEncode>(items: &[T]) -> usize {
    items.iter().fold(
        wallet_short_vec::encoded_len(items.len()),
        |size, item| size.saturating_add(item.wire_size()),
    )
}

/// Appends the length of `items` followed by each item.
pub fn write_short_vec<T: WireEncode>(items: &[T], buf: &mut Vec<u8>) {
    wallet_short_vec::encode_len(items.len(), buf);
    for item in items {
        item.write_to(buf);
    }
}

/// Reads a length prefix and then that many items.
pub fn read_short_vec<T: WireDecode>(cursor: &mut Cursor<'_>) -> Result<Vec<T>, DecodeError> {
    let len = cursor.read_short_len()?;
    // Never trust the prefix beyond what the input could possibly hold.
    let mut items = Vec::with_capacity(len.min(cursor.remaining()));
    for _ in 0..len {
        items.push(T::read_from(cursor)?);
    }
    Ok(items)
}

/// Wire size of a length-prefixed byte string.
pub fn short_bytes_size(bytes: &[u8]) -> usize {
    wallet_short_vec::encoded_len(bytes.len()).saturating_add(bytes.len())
}

/// Appends a length-prefixed byte string.
pub fn write_short_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    wallet_short_vec::encode_len(bytes.len(), buf);
    buf.extend_from_slice(bytes);
}

/// Reads a length-prefixed byte string.
pub fn read_short_bytes(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, DecodeError> {
    let len = cursor.read_short_len()?;
    cursor.read_slice(len).map(<[u8]>::to_vec)
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    #[test]
    fn test_short_vec_of_addresses() {
        let keys = vec![Address::new_unique(), Address::new_unique()];
        let mut buf = vec![];
        write_short_vec(&keys, &mut buf);
        assert_eq!(buf.len(), short_vec_size(&keys));
        assert_eq!(buf[0], 2);
        assert_eq!(&buf[1..33], keys[0].as_ref());

        let mut cursor = Cursor::new(&buf);
        assert_eq!(read_short_vec::<Address>(&mut cursor), Ok(keys));
        assert_eq!(cursor.finish(), Ok(()));
    }

    #[test]
    fn test_short_vec_prefix_larger_than_input() {
        // claims 300 one-byte items but carries two
        let mut cursor = Cursor::new(&[0xac, 0x02, 1, 2]);
        assert_matches!(
            read_short_vec::<u8>(&mut cursor),
            Err(DecodeError::UnexpectedEnd(4))
        );
    }

    #[test]
    fn test_short_bytes() {
        let data = vec![9u8; 130];
        let mut buf = vec![];
        write_short_bytes(&data, &mut buf);
        assert_eq!(&buf[..2], &[0x82, 0x01]);
        assert_eq!(buf.len(), short_bytes_size(&data));
        assert_eq!(read_short_bytes(&mut Cursor::new(&buf)), Ok(data));
    }

    #[test]
    fn test_from_wire_bytes_rejects_trailing() {
        let hash = Hash::new_unique();
        let mut bytes = hash.to_wire_bytes();
        assert_eq!(Hash::from_wire_bytes(&bytes), Ok(hash));
        bytes.push(0);
        assert_eq!(
            Hash::from_wire_bytes(&bytes),
            Err(DecodeError::TrailingBytes(1))
        );
        assert_eq!(
            Signature::from_wire_bytes(&bytes),
            Err(DecodeError::UnexpectedEnd(33))
        );
    }

    #[test]
    fn test_zero_signature_is_zero_bytes() {
        assert_eq!(Signature::default().to_wire_bytes(), vec![0u8; 64]);
    }
}
