#![cfg_attr(docsrs, feature(doc_cfg))]
//! Compact encoding of lengths, and of vectors prefixed by such a length.
//!
//! A length is written least-significant group first, seven bits per byte.
//! The high bit of every byte except the last is set to signal that another
//! group follows. Every count on the wire (signatures, account keys,
//! instructions, instruction account indexes, instruction data, lookup
//! indexes) uses this encoding. Fixed-size payloads such as keys, hashes and
//! signatures are never prefixed.
//!
//! Decoding is lenient: a length may carry redundant zero groups
//! (`[0x80, 0x00]` decodes to `0`). Existing encoders never produce such
//! forms, but they are accepted so that previously accepted payloads keep
//! decoding.
#[cfg(feature = "serde")]
use {
    core::{fmt, marker::PhantomData},
    serde::{
        de::{self, Deserializer, SeqAccess, Visitor},
        ser::{self, SerializeTuple, Serializer},
        Deserialize, Serialize,
    },
};

/// Maximum number of bytes a `usize` length can occupy once encoded.
pub const MAX_ENCODING_LENGTH: usize = 10;

#[cfg(feature = "serde")]
const MAX_PREALLOCATION: usize = 4096;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortVecError {
    #[error("input ended before the last length byte")]
    Truncated,
    #[error("length encoding is longer than {MAX_ENCODING_LENGTH} bytes")]
    TooLong,
    #[error("encoded length does not fit in usize")]
    Overflow,
}

/// Returns the number of bytes `len` occupies once encoded.
pub fn encoded_len(len: usize) -> usize {
    let mut rem_len = len >> 7;
    let mut size = 1usize;
    while rem_len != 0 {
        rem_len >>= 7;
        size = size.saturating_add(1);
    }
    size
}

/// Appends the encoding of `len` to `buf`.
pub fn encode_len(len: usize, buf: &mut Vec<u8>) {
    let mut rem_len = len;
    loop {
        let mut elem = (rem_len & 0x7f) as u8;
        rem_len >>= 7;
        if rem_len == 0 {
            buf.push(elem);
            break;
        }
        elem |= 0x80;
        buf.push(elem);
    }
}

/// Returns the encoding of `len` as a new vector.
pub fn encode_len_to_vec(len: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(len));
    encode_len(len, &mut buf);
    buf
}

/// Decodes a length from the front of `bytes`, returning the length and the
/// number of bytes consumed.
pub fn decode_len(bytes: &[u8]) -> Result<(usize, usize), ShortVecError> {
    let mut len = 0usize;
    for (position, byte) in bytes.iter().enumerate() {
        if position >= MAX_ENCODING_LENGTH {
            return Err(ShortVecError::TooLong);
        }
        accumulate(&mut len, position, *byte)?;
        if byte & 0x80 == 0 {
            return Ok((len, position.saturating_add(1)));
        }
    }
    if bytes.len() > MAX_ENCODING_LENGTH {
        Err(ShortVecError::TooLong)
    } else {
        Err(ShortVecError::Truncated)
    }
}

/// Folds the seven payload bits of `byte`, found at `position`, into `len`.
fn accumulate(len: &mut usize, position: usize, byte: u8) -> Result<(), ShortVecError> {
    let part = usize::from(byte & 0x7f);
    if part == 0 {
        return Ok(());
    }
    let shift = u32::try_from(position.saturating_mul(7))
        .ok()
        .filter(|shift| *shift < usize::BITS)
        .ok_or(ShortVecError::Overflow)?;
    let shifted = part << shift;
    if shifted >> shift != part {
        return Err(ShortVecError::Overflow);
    }
    *len |= shifted;
    Ok(())
}

/// Same as `usize`, but serialized with the compact length encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortLen(pub usize);

#[cfg(feature = "serde")]
impl Serialize for ShortLen {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = encode_len_to_vec(self.0);
        let mut seq = serializer.serialize_tuple(bytes.len())?;
        for byte in &bytes {
            seq.serialize_element(byte)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct ShortLenVisitor;

#[cfg(feature = "serde")]
impl<'de> Visitor<'de> for ShortLenVisitor {
    type Value = ShortLen;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a compact length")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<ShortLen, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut len = 0usize;
        for position in 0..MAX_ENCODING_LENGTH {
            let byte: u8 = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(position, &self))?;
            accumulate(&mut len, position, byte).map_err(de::Error::custom)?;
            if byte & 0x80 == 0 {
                return Ok(ShortLen(len));
            }
        }
        Err(de::Error::custom(ShortVecError::TooLong))
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ShortLen {
    fn deserialize<D>(deserializer: D) -> Result<ShortLen, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(MAX_ENCODING_LENGTH, ShortLenVisitor)
    }
}

/// If you don't want to use the `ShortLen` wrapper type, use this function
/// with `#[serde(with = "wallet_short_vec")]`.
#[cfg(feature = "serde")]
pub fn serialize<S: Serializer, T: Serialize>(
    elements: &[T],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    // Pass a non-zero value to serialize_tuple() so that serde_json will
    // generate an open bracket.
    let mut seq = serializer.serialize_tuple(1)?;

    let len = elements.len();
    if len == usize::MAX {
        return Err(ser::Error::custom("length larger than usize::MAX - 1"));
    }
    seq.serialize_element(&ShortLen(len))?;

    for element in elements {
        seq.serialize_element(element)?;
    }
    seq.end()
}

#[cfg(feature = "serde")]
struct ShortVecVisitor<T> {
    _t: PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> Visitor<'de> for ShortVecVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Vec<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a Vec with a compact length prefix")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Vec<T>, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let short_len: ShortLen = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let len = short_len.0;

        let mut result = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        for i in 0..len {
            let elem = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i.saturating_add(1), &self))?;
            result.push(elem);
        }
        Ok(result)
    }
}

/// If you don't want to use the `ShortLen` wrapper type, use this function
/// with `#[serde(with = "wallet_short_vec")]`.
#[cfg(feature = "serde")]
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let visitor = ShortVecVisitor { _t: PhantomData };
    deserializer.deserialize_tuple(usize::MAX, visitor)
}
