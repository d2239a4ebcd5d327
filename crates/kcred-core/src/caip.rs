//! # CAIP Identifiers — Chain and Attestation Status Ids
//!
//! A credential's status id ties it to one chain and one attestation:
//!
//! ```text
//! polkadot:<hex(genesis[..16])>/kilt:attestation/<base58(root hash)>
//! \_______ CAIP-2 chain ______/ \____ CAIP-19 asset namespace/ref/token ___/
//! ```
//!
//! Parsing follows the CAIP-2 and CAIP-19 character and length rules; the
//! asset part must be the `kilt:attestation` namespace/reference pair.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::digest::Hash256;
use crate::error::IdentifierError;

const MINIMUM_NAMESPACE_LENGTH: usize = 3;
const MAXIMUM_NAMESPACE_LENGTH: usize = 8;
const MINIMUM_REFERENCE_LENGTH: usize = 1;
const MAXIMUM_CHAIN_REFERENCE_LENGTH: usize = 32;
const MAXIMUM_ASSET_REFERENCE_LENGTH: usize = 64;
const MAXIMUM_TOKEN_ID_LENGTH: usize = 78;

const POLKADOT_NAMESPACE: &str = "polkadot";
const ATTESTATION_NAMESPACE: &str = "kilt";
const ATTESTATION_REFERENCE: &str = "attestation";

/// A CAIP-2 chain id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// The `polkadot:` chain id for a genesis hash: the first 16 bytes as
    /// lowercase hex.
    pub fn from_genesis(genesis: &[u8; 32]) -> Self {
        Self {
            namespace: POLKADOT_NAMESPACE.to_string(),
            reference: hex::encode(&genesis[..16]),
        }
    }

    /// Parse a CAIP-2 chain id.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidChainId`] naming the broken rule.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let err = |reason| IdentifierError::InvalidChainId {
            value: value.to_string(),
            reason,
        };
        let (namespace, reference) = value.split_once(':').ok_or_else(|| err("missing ':'"))?;
        check_namespace(namespace).map_err(err)?;
        check_reference(reference, MAXIMUM_CHAIN_REFERENCE_LENGTH, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
        })
        .map_err(err)?;
        Ok(Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        })
    }

    /// The namespace (`polkadot`).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The chain reference.
    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

/// The CAIP-19 id of an attestation on a chain, used as `credentialStatus.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttestationStatusId {
    chain: ChainId,
    root_hash: Hash256,
}

impl AttestationStatusId {
    /// Build the status id of `root_hash` on `chain`.
    pub fn new(chain: ChainId, root_hash: Hash256) -> Self {
        Self { chain, root_hash }
    }

    /// Parse `<caip2>/kilt:attestation/<base58 root hash>`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidAssetId`] for a malformed asset part,
    /// [`IdentifierError::InvalidChainId`] for a malformed chain part and
    /// [`IdentifierError::Encoding`] when the token does not decode to a
    /// 32-byte hash.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let err = |reason| IdentifierError::InvalidAssetId {
            value: value.to_string(),
            reason,
        };
        let mut parts = value.split('/');
        let (Some(chain), Some(asset), Some(token), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err("expected <chain>/<namespace>:<reference>/<token>"));
        };
        let chain = ChainId::parse(chain)?;
        let (namespace, reference) = asset.split_once(':').ok_or_else(|| err("missing ':' in asset"))?;
        check_namespace(namespace).map_err(err)?;
        check_reference(reference, MAXIMUM_ASSET_REFERENCE_LENGTH, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '%')
        })
        .map_err(err)?;
        if namespace != ATTESTATION_NAMESPACE || reference != ATTESTATION_REFERENCE {
            return Err(err("asset is not kilt:attestation"));
        }
        check_reference(token, MAXIMUM_TOKEN_ID_LENGTH, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '%')
        })
        .map_err(err)?;
        Ok(Self {
            chain,
            root_hash: Hash256::from_base58(token)?,
        })
    }

    /// The chain the attestation lives on.
    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    /// The attested root hash.
    pub fn root_hash(&self) -> Hash256 {
        self.root_hash
    }
}

impl fmt::Display for AttestationStatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{ATTESTATION_NAMESPACE}:{ATTESTATION_REFERENCE}/{}",
            self.chain,
            self.root_hash.to_base58()
        )
    }
}

impl Serialize for AttestationStatusId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttestationStatusId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn check_namespace(namespace: &str) -> Result<(), &'static str> {
    if namespace.len() < MINIMUM_NAMESPACE_LENGTH {
        return Err("namespace too short");
    }
    if namespace.len() > MAXIMUM_NAMESPACE_LENGTH {
        return Err("namespace too long");
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("namespace has invalid characters");
    }
    Ok(())
}

fn check_reference(reference: &str, max: usize, allowed: impl Fn(char) -> bool) -> Result<(), &'static str> {
    if reference.len() < MINIMUM_REFERENCE_LENGTH {
        return Err("reference too short");
    }
    if reference.len() > max {
        return Err("reference too long");
    }
    if !reference.chars().all(allowed) {
        return Err("reference has invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::blake2b_256;

    const SPIRITNET_GENESIS: &str =
        "0x411f057b9107718c9624d6aa4a3f23c1653898297f3d4d529d9bb6511a39dd21";

    fn spiritnet() -> [u8; 32] {
        *Hash256::from_hex(SPIRITNET_GENESIS).unwrap().as_bytes()
    }

    #[test]
    fn test_chain_id_from_genesis() {
        let chain = ChainId::from_genesis(&spiritnet());
        assert_eq!(chain.to_string(), "polkadot:411f057b9107718c9624d6aa4a3f23c1");
        assert_eq!(ChainId::parse(&chain.to_string()).unwrap(), chain);
    }

    #[test]
    fn test_chain_id_rules() {
        assert!(ChainId::parse("eip155:1").is_ok());
        assert!(ChainId::parse("ab:1").is_err());
        assert!(ChainId::parse("toolongns:1").is_err());
        assert!(ChainId::parse("polkadot:").is_err());
        assert!(ChainId::parse("Polkadot:1").is_err());
        assert!(ChainId::parse(&format!("polkadot:{}", "a".repeat(33))).is_err());
        assert!(ChainId::parse("polkadot").is_err());
    }

    #[test]
    fn test_status_id_roundtrip() {
        let root = blake2b_256(b"root");
        let id = AttestationStatusId::new(ChainId::from_genesis(&spiritnet()), root);
        let text = id.to_string();
        assert_eq!(
            text,
            format!(
                "polkadot:411f057b9107718c9624d6aa4a3f23c1/kilt:attestation/{}",
                root.to_base58()
            )
        );
        let parsed = AttestationStatusId::parse(&text).unwrap();
        assert_eq!(parsed.root_hash(), root);
        assert_eq!(parsed.chain(), id.chain());
    }

    #[test]
    fn test_status_id_rejects_other_assets() {
        let token = blake2b_256(b"root").to_base58();
        let chain = "polkadot:411f057b9107718c9624d6aa4a3f23c1";
        assert!(AttestationStatusId::parse(&format!("{chain}/slip44:434/{token}")).is_err());
        assert!(AttestationStatusId::parse(&format!("{chain}/kilt:attestation")).is_err());
        assert!(AttestationStatusId::parse(&format!("{chain}/kilt:attestation/{token}/x")).is_err());
        assert!(matches!(
            AttestationStatusId::parse(&format!("{chain}/kilt:attestation/abc")),
            Err(IdentifierError::Encoding(_))
        ));
    }
}
