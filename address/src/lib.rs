#![cfg_attr(docsrs, feature(doc_cfg))]
//! Account addresses.
//!
//! An [`Address`] is the 32-byte public key that names an account. It renders
//! to, and parses from, base58 text.
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    core::{fmt, str::FromStr},
    std::sync::atomic::{AtomicU64, Ordering},
};

mod collation;
pub mod ids;

pub use collation::cmp_base58;

/// Number of bytes in an address.
pub const ADDRESS_BYTES: usize = 32;
/// Maximum string length of a base58 encoded address.
pub const MAX_BASE58_LEN: usize = 44;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("String is the wrong size")]
    WrongSize,
    #[error("Invalid Base58 string")]
    Invalid,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("address must be {ADDRESS_BYTES} bytes, got {0}")]
pub struct AddressLengthError(pub usize);

/// The address of an account.
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Address(pub(crate) [u8; ADDRESS_BYTES]);

impl Address {
    pub const fn new_from_array(address_array: [u8; ADDRESS_BYTES]) -> Self {
        Self(address_array)
    }

    /// Decode a base58 string at compile time.
    pub const fn from_str_const(s: &str) -> Self {
        Self(five8_const::decode_32_const(s))
    }

    /// Unique address for tests and benchmarks.
    pub fn new_unique() -> Self {
        static I: AtomicU64 = AtomicU64::new(1);

        let mut b = [0u8; ADDRESS_BYTES];
        let i = I.fetch_add(1, Ordering::Relaxed);
        // use big endian representation to ensure that recent unique addresses
        // are always greater than less recent unique addresses
        b[0..8].copy_from_slice(&i.to_be_bytes());
        Self(b)
    }

    pub const fn to_bytes(self) -> [u8; ADDRESS_BYTES] {
        self.0
    }

    pub const fn as_array(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Base58 rendering, the canonical text form of an address.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(from: [u8; ADDRESS_BYTES]) -> Self {
        Self(from)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = AddressLengthError;

    fn try_from(address: &[u8]) -> Result<Self, Self::Error> {
        <[u8; ADDRESS_BYTES]>::try_from(address)
            .map(Self::from)
            .map_err(|_| AddressLengthError(address.len()))
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_BASE58_LEN {
            return Err(ParseAddressError::WrongSize);
        }
        let address_vec = bs58::decode(s)
            .into_vec()
            .map_err(|_| ParseAddressError::Invalid)?;
        <[u8; ADDRESS_BYTES]>::try_from(address_vec.as_slice())
            .map(Self)
            .map_err(|_| ParseAddressError::WrongSize)
    }
}

impl TryFrom<&str> for Address {
    type Error = ParseAddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Address::from_str(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}
