//! # Digest — Blake2b-256
//!
//! Every hash in kcred is Blake2b with a 32-byte output: statement digests,
//! salted hashes, commitments, root hashes and CType hashes. [`Hash256`] is
//! the value type they share.
//!
//! ## Ordering
//!
//! `Hash256` orders by raw bytes. Sorting claim hashes "ascending by numeric
//! value", ordering statements by digest and sorting commitments all use this
//! single `Ord` implementation, which matches big-endian numeric order.
//!
//! ## Serialization
//!
//! `Hash256` serializes as `0x`-prefixed lowercase hex. Base58 renderings
//! (proofs, identifiers) are explicit via [`Hash256::to_base58`].

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::encoding::{fixed, from_base58, from_prefixed_hex, to_base58, to_prefixed_hex};
use crate::error::EncodingError;

type Blake2b256 = Blake2b<U32>;

/// A 256-bit hash value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// Byte length of every hash in the system.
    pub const LEN: usize = 32;

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Wrap a byte slice that must be exactly 32 bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::InvalidLength`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        fixed::<32>(bytes.to_vec()).map(Self)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x` + 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        to_prefixed_hex(&self.0)
    }

    /// Parse `0x` + 64 hex characters (either case).
    ///
    /// # Errors
    ///
    /// Missing prefix, non-hex characters or a length other than 32 bytes.
    pub fn from_hex(value: &str) -> Result<Self, EncodingError> {
        fixed::<32>(from_prefixed_hex(value)?).map(Self)
    }

    /// Base58 rendering of the raw bytes.
    pub fn to_base58(&self) -> String {
        to_base58(&self.0)
    }

    /// Parse a base58 string that decodes to exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Invalid alphabet or a decoded length other than 32 bytes.
    pub fn from_base58(value: &str) -> Result<Self, EncodingError> {
        fixed::<32>(from_base58(value)?).map(Self)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Blake2b-256 of a byte string.
pub fn blake2b_256(data: &[u8]) -> Hash256 {
    Hash256(Blake2b256::digest(data).into())
}

/// Blake2b-256 of the concatenation of `parts`, without materializing it.
pub fn blake2b_256_concat<I, T>(parts: I) -> Hash256
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    Hash256(hasher.finalize().into())
}
