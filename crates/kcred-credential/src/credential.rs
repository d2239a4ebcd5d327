//! # Credential — Root Hash Aggregation and Property Removal
//!
//! A credential wraps a hashed claim together with the credentials that
//! legitimize its attester and an optional delegation node. Its identity is
//! the root hash:
//!
//! ```text
//! root = blake2b_256(claimHashes ++ legitimation.rootHash* ++ delegationId?)
//! ```
//!
//! ## Security Invariant
//!
//! `claimHashes` and `rootHash` never change after creation. Removing
//! properties produces a new credential whose nonce map covers exactly the
//! remaining statements; the hash list still commits to every statement, so
//! the root hash (and therefore any on-chain attestation) stays valid.

use kcred_core::{blake2b_256_concat, Did, Hash256, Unverifiable, VerificationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claim::Claim;
use crate::hasher::{hash_claim_contents, verify_disclosed_attributes, NonceMap, NonceSource};

/// Root hash over claim hashes, legitimation roots and an optional
/// delegation id, concatenated in that order.
pub fn calculate_root_hash<'a>(
    claim_hashes: &'a [Hash256],
    legitimation_roots: impl IntoIterator<Item = &'a Hash256>,
    delegation_id: Option<&'a Hash256>,
) -> Hash256 {
    blake2b_256_concat(
        claim_hashes
            .iter()
            .chain(legitimation_roots)
            .chain(delegation_id),
    )
}

/// A hashed claim with its legitimations and optional delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    claim: Claim,
    claim_hashes: Vec<Hash256>,
    claim_nonce_map: NonceMap,
    #[serde(default)]
    legitimations: Vec<Credential>,
    #[serde(default)]
    delegation_id: Option<Hash256>,
    root_hash: Hash256,
}

/// Builder for [`Credential`].
#[derive(Debug)]
pub struct CredentialBuilder<'a> {
    claim: Claim,
    legitimations: Vec<Credential>,
    delegation_id: Option<Hash256>,
    nonces: NonceSource<'a>,
}

impl<'a> CredentialBuilder<'a> {
    /// Credentials that legitimize the attester, in root-hash order.
    pub fn legitimations(mut self, legitimations: Vec<Credential>) -> Self {
        self.legitimations = legitimations;
        self
    }

    /// The delegation node the attestation is made under.
    pub fn delegation_id(mut self, id: Hash256) -> Self {
        self.delegation_id = Some(id);
        self
    }

    /// Override nonce generation.
    pub fn nonces(mut self, nonces: NonceSource<'a>) -> Self {
        self.nonces = nonces;
        self
    }

    /// Hash the claim and compute the root hash.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures and, for a fixed nonce map,
    /// missing nonces.
    pub fn build(self) -> Result<Credential, VerificationError> {
        let hashed = hash_claim_contents(&self.claim, self.nonces)?;
        let root_hash = calculate_root_hash(
            &hashed.hashes,
            self.legitimations.iter().map(Credential::root_hash_ref),
            self.delegation_id.as_ref(),
        );
        tracing::debug!(root_hash = %root_hash, statements = hashed.hashes.len(), "credential created");
        Ok(Credential {
            claim: self.claim,
            claim_hashes: hashed.hashes,
            claim_nonce_map: hashed.nonce_map,
            legitimations: self.legitimations,
            delegation_id: self.delegation_id,
            root_hash,
        })
    }
}

impl Credential {
    /// Start building a credential from a claim.
    pub fn builder<'a>(claim: Claim) -> CredentialBuilder<'a> {
        CredentialBuilder {
            claim,
            legitimations: Vec::new(),
            delegation_id: None,
            nonces: NonceSource::Generate,
        }
    }

    /// Hash a claim with fresh nonces, no legitimations and no delegation.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures.
    pub fn from_claim(claim: Claim) -> Result<Self, VerificationError> {
        Self::builder(claim).build()
    }

    /// Parse and structurally check a credential from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] for JSON that does not
    /// deserialize (including malformed hashes and DIDs) or that fails
    /// [`Credential::verify_data_structure`].
    pub fn parse(json: &Value) -> Result<Self, VerificationError> {
        let credential: Self = serde_json::from_value(json.clone())
            .map_err(|e| VerificationError::Structure(format!("not a credential: {e}")))?;
        credential.verify_data_structure()?;
        Ok(credential)
    }

    /// `true` if [`Credential::parse`] succeeds.
    pub fn is_credential(json: &Value) -> bool {
        Self::parse(json).is_ok()
    }

    /// The claim, possibly reduced.
    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    /// Salted hashes of every statement of the original claim, ascending.
    pub fn claim_hashes(&self) -> &[Hash256] {
        &self.claim_hashes
    }

    /// Nonces of the disclosed statements.
    pub fn claim_nonce_map(&self) -> &NonceMap {
        &self.claim_nonce_map
    }

    /// Legitimating credentials.
    pub fn legitimations(&self) -> &[Credential] {
        &self.legitimations
    }

    /// The delegation node id, if any.
    pub fn delegation_id(&self) -> Option<Hash256> {
        self.delegation_id
    }

    /// The root hash.
    pub fn root_hash(&self) -> Hash256 {
        self.root_hash
    }

    fn root_hash_ref(&self) -> &Hash256 {
        &self.root_hash
    }

    /// The claim owner.
    pub fn owner(&self) -> &Did {
        self.claim.owner()
    }

    /// Recompute the root hash and require exact equality.
    ///
    /// # Errors
    ///
    /// Returns [`Unverifiable::RootHash`] on mismatch.
    pub fn verify_root_hash(&self) -> Result<(), VerificationError> {
        let computed = calculate_root_hash(
            &self.claim_hashes,
            self.legitimations.iter().map(Credential::root_hash_ref),
            self.delegation_id.as_ref(),
        );
        if computed == self.root_hash {
            Ok(())
        } else {
            Err(Unverifiable::RootHash {
                expected: self.root_hash.to_hex(),
                computed: computed.to_hex(),
            }
            .into())
        }
    }

    /// Verify every disclosed statement against the claim hashes.
    ///
    /// # Errors
    ///
    /// Returns [`Unverifiable::Statements`] listing every failing statement.
    pub fn verify_disclosed_attributes(&self) -> Result<(), VerificationError> {
        verify_disclosed_attributes(&self.claim, &self.claim_nonce_map, &self.claim_hashes)
    }

    /// Root hash, disclosed attributes, then each legitimation recursively.
    ///
    /// # Errors
    ///
    /// The first failing check.
    pub fn verify_data_integrity(&self) -> Result<(), VerificationError> {
        self.verify_root_hash()?;
        self.verify_disclosed_attributes()?;
        for legitimation in &self.legitimations {
            legitimation.verify_data_integrity()?;
        }
        Ok(())
    }

    /// Shape checks that need no hashing: non-empty ascending claim hashes,
    /// non-empty nonces, and the same for every legitimation. The owner DID
    /// is validated on construction.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] naming the violated rule.
    pub fn verify_data_structure(&self) -> Result<(), VerificationError> {
        if self.claim_hashes.is_empty() {
            return Err(VerificationError::Structure("claimHashes is empty".into()));
        }
        if let Some(pair) = self.claim_hashes.windows(2).find(|pair| pair[0] > pair[1]) {
            return Err(VerificationError::Structure(format!(
                "claimHashes not sorted: {} before {}",
                pair[0], pair[1]
            )));
        }
        if let Some(digest) = self
            .claim_nonce_map
            .iter()
            .find_map(|(digest, nonce)| nonce.is_empty().then_some(digest))
        {
            return Err(VerificationError::Structure(format!(
                "empty nonce for statement digest {digest}"
            )));
        }
        for legitimation in &self.legitimations {
            legitimation.verify_data_structure()?;
        }
        Ok(())
    }

    /// A copy of this credential without the given claim properties.
    ///
    /// The nonce map is re-derived from the existing nonces over the reduced
    /// claim, so its keys are exactly the remaining statement digests.
    /// `claimHashes` and `rootHash` are carried over unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] when a key is not in the claim,
    /// and [`VerificationError::Unverifiable`] when a remaining statement has
    /// no nonce.
    pub fn remove_claim_properties(&self, keys: &[&str]) -> Result<Self, VerificationError> {
        let claim = self
            .claim
            .without(keys)
            .map_err(|key| VerificationError::Structure(format!("claim has no property {key:?}")))?;
        let hashed = hash_claim_contents(&claim, NonceSource::Fixed(&self.claim_nonce_map))?;
        Ok(Self {
            claim,
            claim_hashes: self.claim_hashes.clone(),
            claim_nonce_map: hashed.nonce_map,
            legitimations: self.legitimations.clone(),
            delegation_id: self.delegation_id,
            root_hash: self.root_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcred_core::blake2b_256;
    use serde_json::json;

    fn claim(contents: Value) -> Claim {
        Claim::from_parts(
            blake2b_256(b"ctype"),
            contents.as_object().cloned().unwrap(),
            Did::parse("did:kilt:4abc").unwrap(),
        )
    }

    fn credential() -> Credential {
        Credential::from_claim(claim(json!({"name": "Bob", "age": 29, "city": "Ulm"}))).unwrap()
    }

    #[test]
    fn test_root_hash_over_claim_hashes_only() {
        let c = credential();
        assert_eq!(c.root_hash(), blake2b_256_concat(c.claim_hashes()));
        assert!(c.verify_data_integrity().is_ok());
        assert!(c.verify_data_structure().is_ok());
    }

    #[test]
    fn test_root_hash_includes_legitimations_and_delegation() {
        let legit_a = credential();
        let legit_b = credential();
        let delegation = blake2b_256(b"node");
        let c = Credential::builder(claim(json!({"name": "Eve"})))
            .legitimations(vec![legit_a.clone(), legit_b.clone()])
            .delegation_id(delegation)
            .build()
            .unwrap();
        let mut leaves: Vec<Hash256> = c.claim_hashes().to_vec();
        leaves.extend([legit_a.root_hash(), legit_b.root_hash(), delegation]);
        assert_eq!(c.root_hash(), blake2b_256_concat(&leaves));
        assert!(c.verify_data_integrity().is_ok());
    }

    #[test]
    fn test_legitimation_order_matters() {
        let a = credential();
        let b = credential();
        let hashes = [blake2b_256(b"h")];
        let ab = calculate_root_hash(&hashes, [&a.root_hash(), &b.root_hash()], None);
        let ba = calculate_root_hash(&hashes, [&b.root_hash(), &a.root_hash()], None);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_remove_properties_keeps_root_and_hashes() {
        let full = credential();
        let reduced = full.remove_claim_properties(&["age", "city"]).unwrap();
        assert_eq!(reduced.root_hash(), full.root_hash());
        assert_eq!(reduced.claim_hashes(), full.claim_hashes());
        assert_eq!(reduced.claim_nonce_map().len(), 2);
        assert_eq!(full.claim_nonce_map().len(), 4);
        assert!(reduced.verify_data_integrity().is_ok());
    }

    #[test]
    fn test_remove_nothing_is_identity() {
        let full = credential();
        assert_eq!(full.remove_claim_properties(&[]).unwrap(), full);
    }

    #[test]
    fn test_remove_unknown_property_is_structure_error() {
        let err = credential().remove_claim_properties(&["email"]).unwrap_err();
        assert!(matches!(err, VerificationError::Structure(_)));
    }

    #[test]
    fn test_parse_rejects_empty_hashes_and_nonces() {
        let mut json = serde_json::to_value(credential()).unwrap();
        assert!(Credential::is_credential(&json));

        let mut empty_nonce = json.clone();
        let map = empty_nonce["claimNonceMap"].as_object_mut().unwrap();
        let first = map.keys().next().cloned().unwrap();
        map.insert(first, json!(""));
        assert!(matches!(
            Credential::parse(&empty_nonce),
            Err(VerificationError::Structure(_))
        ));

        json["claimHashes"] = json!([]);
        assert!(!Credential::is_credential(&json));
    }

    #[test]
    fn test_parse_rejects_unsorted_hashes() {
        let mut json = serde_json::to_value(credential()).unwrap();
        let hashes = json["claimHashes"].as_array_mut().unwrap();
        assert!(hashes.len() > 1);
        hashes.reverse();

        let err = Credential::parse(&json).unwrap_err();
        assert!(matches!(err, VerificationError::Structure(_)), "{err}");
        assert!(err.to_string().contains("not sorted"), "{err}");
    }
}
