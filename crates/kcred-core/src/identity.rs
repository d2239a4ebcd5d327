//! # Identity Types — DIDs and KILT Identifiers
//!
//! Newtype wrappers for the identifiers that appear in credentials and
//! proofs. Each has a validating constructor; deserialization goes through
//! the same constructor, so an invalid identifier never exists in memory.
//!
//! | Type            | Wire form                         |
//! |-----------------|-----------------------------------|
//! | [`Did`]         | `did:<method>:<id>`               |
//! | [`CTypeId`]     | `kilt:ctype:0x<64 hex>`           |
//! | [`CredentialId`]| `kilt:credential:<base58 root>`   |
//! | [`DelegationId`]| `kilt:delegation/<base58 node>`   |

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::digest::Hash256;
use crate::error::IdentifierError;

macro_rules! impl_validating_deserialize {
    ($ty:ident) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

macro_rules! impl_display_serialize {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

/// W3C Decentralized Identifier.
///
/// Format: `did:<method>:<method-specific-id>` where the method is lowercase
/// alphanumeric and the identifier is non-empty. DID URLs (fragments,
/// queries, paths) are rejected; a credential subject or issuer is always a
/// bare DID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Did(String);

impl_validating_deserialize!(Did);

impl Did {
    /// Parse and validate a DID.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidDid`] if the string does not match
    /// `did:method:identifier`.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let invalid = || IdentifierError::InvalidDid(value.to_string());
        let rest = value.strip_prefix("did:").ok_or_else(invalid)?;
        let (method, identifier) = rest.split_once(':').ok_or_else(invalid)?;
        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if identifier.is_empty()
            || !identifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '-' | '_'))
        {
            return Err(invalid());
        }
        Ok(Self(value.to_string()))
    }

    /// The DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The method name (`kilt` for `did:kilt:...`).
    pub fn method(&self) -> &str {
        self.0[4..].split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl_display_serialize!(Did);

const CTYPE_PREFIX: &str = "kilt:ctype:";

/// Identifier of a CType, derived from its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CTypeId(Hash256);

impl_validating_deserialize!(CTypeId);

impl CTypeId {
    /// The id of the CType with the given hash.
    pub fn from_hash(hash: Hash256) -> Self {
        Self(hash)
    }

    /// Parse `kilt:ctype:0x<hash>`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidCTypeId`] for a wrong prefix and
    /// [`IdentifierError::Encoding`] for a malformed hash.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let hex = value
            .strip_prefix(CTYPE_PREFIX)
            .ok_or_else(|| IdentifierError::InvalidCTypeId(value.to_string()))?;
        Ok(Self(Hash256::from_hex(hex)?))
    }

    /// The CType hash.
    pub fn hash(&self) -> Hash256 {
        self.0
    }

    /// The JSON-LD vocabulary for claims of this CType: the id followed by `#`.
    pub fn vocabulary(&self) -> String {
        format!("{self}#")
    }
}

impl fmt::Display for CTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CTYPE_PREFIX}{}", self.0.to_hex())
    }
}

impl_display_serialize!(CTypeId);

const CREDENTIAL_PREFIX: &str = "kilt:credential:";

/// Identifier of an attested credential, derived from its root hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialId(Hash256);

impl_validating_deserialize!(CredentialId);

impl CredentialId {
    /// The id of the credential with the given root hash.
    pub fn from_root_hash(root: Hash256) -> Self {
        Self(root)
    }

    /// Parse `kilt:credential:<base58 root hash>`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidCredentialId`] for a wrong prefix and
    /// [`IdentifierError::Encoding`] when the root hash does not decode to 32
    /// bytes.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let b58 = value
            .strip_prefix(CREDENTIAL_PREFIX)
            .ok_or_else(|| IdentifierError::InvalidCredentialId(value.to_string()))?;
        Ok(Self(Hash256::from_base58(b58)?))
    }

    /// The root hash this id encodes.
    pub fn root_hash(&self) -> Hash256 {
        self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CREDENTIAL_PREFIX}{}", self.0.to_base58())
    }
}

impl_display_serialize!(CredentialId);

const DELEGATION_PREFIX: &str = "kilt:delegation/";

/// Identifier of an on-chain delegation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DelegationId(Hash256);

impl_validating_deserialize!(DelegationId);

impl DelegationId {
    /// Wrap a raw node id.
    pub fn from_node_id(id: Hash256) -> Self {
        Self(id)
    }

    /// Parse `kilt:delegation/<base58 node id>`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidDelegationId`] for a wrong prefix and
    /// [`IdentifierError::Encoding`] when the node id does not decode to 32
    /// bytes.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let b58 = value
            .strip_prefix(DELEGATION_PREFIX)
            .ok_or_else(|| IdentifierError::InvalidDelegationId(value.to_string()))?;
        Ok(Self(Hash256::from_base58(b58)?))
    }

    /// The raw node id.
    pub fn node_id(&self) -> Hash256 {
        self.0
    }
}

impl fmt::Display for DelegationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DELEGATION_PREFIX}{}", self.0.to_base58())
    }
}

impl_display_serialize!(DelegationId);
