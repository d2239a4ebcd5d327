//! # Attestation Record
//!
//! The on-chain record an attester writes for a credential, keyed by the
//! credential's root hash.

use kcred_core::{Did, Hash256, VerificationError};
use serde::{Deserialize, Serialize};

use crate::credential::Credential;

/// An attestation of a credential's root hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// Root hash of the attested credential.
    pub claim_hash: Hash256,
    /// CType of the attested claim.
    pub c_type_hash: Hash256,
    /// The attester.
    pub owner: Did,
    /// Delegation node the attestation was made under.
    #[serde(default)]
    pub delegation_id: Option<Hash256>,
    /// Whether the attester has revoked it.
    #[serde(default)]
    pub revoked: bool,
}

impl Attestation {
    /// The attestation `attester` would write for `credential`.
    pub fn from_credential(credential: &Credential, attester: Did) -> Self {
        Self {
            claim_hash: credential.root_hash(),
            c_type_hash: credential.claim().c_type_hash(),
            owner: attester,
            delegation_id: credential.delegation_id(),
            revoked: false,
        }
    }

    /// Check that this attestation is the one for `credential`: same root
    /// hash, CType and delegation.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Mismatch`] naming the first differing field.
    pub fn verify_against_credential(&self, credential: &Credential) -> Result<(), VerificationError> {
        if self.claim_hash != credential.root_hash() {
            return Err(VerificationError::mismatch(
                "claimHash",
                credential.root_hash(),
                self.claim_hash,
            ));
        }
        let ctype = credential.claim().c_type_hash();
        if self.c_type_hash != ctype {
            return Err(VerificationError::mismatch("cTypeHash", ctype, self.c_type_hash));
        }
        if self.delegation_id != credential.delegation_id() {
            return Err(VerificationError::mismatch(
                "delegationId",
                display_opt(credential.delegation_id()),
                display_opt(self.delegation_id),
            ));
        }
        Ok(())
    }
}

fn display_opt(hash: Option<Hash256>) -> String {
    hash.map_or_else(|| "none".to_string(), |h| h.to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::Claim;
    use kcred_core::blake2b_256;
    use serde_json::json;

    fn credential() -> Credential {
        let claim = Claim::from_parts(
            blake2b_256(b"ctype"),
            json!({"name": "Bob"}).as_object().cloned().unwrap(),
            Did::parse("did:kilt:4owner").unwrap(),
        );
        Credential::from_claim(claim).unwrap()
    }

    #[test]
    fn test_attestation_matches_its_credential() {
        let c = credential();
        let att = Attestation::from_credential(&c, Did::parse("did:kilt:4attester").unwrap());
        assert!(att.verify_against_credential(&c).is_ok());
        assert!(!att.revoked);
    }

    #[test]
    fn test_attestation_rejects_other_credential() {
        let att = Attestation::from_credential(&credential(), Did::parse("did:kilt:4attester").unwrap());
        let err = att.verify_against_credential(&credential()).unwrap_err();
        assert!(matches!(err, VerificationError::Mismatch { field: "claimHash", .. }));
    }

    #[test]
    fn test_attestation_rejects_other_ctype() {
        let c = credential();
        let mut att = Attestation::from_credential(&c, Did::parse("did:kilt:4attester").unwrap());
        att.c_type_hash = blake2b_256(b"other");
        assert!(matches!(
            att.verify_against_credential(&c),
            Err(VerificationError::Mismatch { field: "cTypeHash", .. })
        ));
    }
}
