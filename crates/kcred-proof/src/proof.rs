//! # KiltAttestationProofV1 — Issuance and Selective Disclosure
//!
//! Lifecycle of an attestation proof:
//!
//! 1. [`initialize_proof`]: commit to the credential subject; returns the
//!    proof (with an empty `block`) and the arguments an attestation
//!    extrinsic needs.
//! 2. [`finalize_proof`]: once the attestation is in a block, set the
//!    credential `id`, `credentialStatus`, `issuanceDate` and the proof
//!    `block`.
//! 3. [`apply_selective_disclosure`]: holder-side: drop undisclosed subject
//!    properties and their salts. Commitments are kept in full.
//!
//! Every step returns new values; inputs are never modified.

use std::collections::BTreeSet;

use kcred_core::canonical::{expand_subject_key, subject_vocabulary};
use kcred_core::encoding::{fixed, from_base58, to_base58};
use kcred_core::{
    AttestationStatusId, ChainId, CredentialId, DelegationId, Hash256, Timestamp, Unverifiable,
    VerificationError,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::commitment::{calculate_root_hash, commit, normalize_claims, Entropy, ENTROPY_LEN};
use crate::schema;
use crate::vc::{CredentialStatus, KiltCredentialV1, KILT_REVOCATION_STATUS_TYPE};

/// `type` of every attestation proof.
pub const KILT_ATTESTATION_PROOF_TYPE: &str = "KiltAttestationProofV1";

/// Subject keys disclosed regardless of the holder's selection.
const ALWAYS_DISCLOSED: [&str; 5] = ["@context", "id", "@id", "type", "@type"];

/// Commitment-based proof that a credential subject was attested on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KiltAttestationProofV1 {
    /// Always [`KILT_ATTESTATION_PROOF_TYPE`].
    #[serde(rename = "type")]
    pub proof_type: String,
    /// Base58 hash of the block holding the attestation; empty until
    /// finalized.
    pub block: String,
    /// Base58 commitments, ascending by raw bytes.
    pub commitments: Vec<String>,
    /// Base58 entropy of each disclosed statement, in digest order.
    pub salt: Vec<String>,
}

impl KiltAttestationProofV1 {
    /// The block hash.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Malformed`] for an empty or undecodable block.
    pub fn block_hash(&self) -> Result<Hash256, VerificationError> {
        Ok(Hash256::from_base58(&self.block)?)
    }

    /// Decoded commitments, in stored order.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Malformed`] for any commitment that is not 32
    /// bytes of base58.
    pub fn decoded_commitments(&self) -> Result<Vec<Hash256>, VerificationError> {
        self.commitments
            .iter()
            .map(|c| Hash256::from_base58(c).map_err(VerificationError::from))
            .collect()
    }

    /// Decoded salts, in stored order.
    ///
    /// # Errors
    ///
    /// [`VerificationError::Malformed`] for any salt that is not 36 bytes of
    /// base58.
    pub fn decoded_salts(&self) -> Result<Vec<Entropy>, VerificationError> {
        self.salt
            .iter()
            .map(|s| {
                from_base58(s)
                    .and_then(fixed::<ENTROPY_LEN>)
                    .map_err(VerificationError::from)
            })
            .collect()
    }
}

/// What an attestation extrinsic needs to anchor a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationArgs {
    /// Claim hash to attest: the credential root hash.
    pub root_hash: Hash256,
    /// CType hash.
    pub c_type_hash: Hash256,
    /// Delegation node authorizing the attestation.
    pub authorization: Option<DelegationId>,
}

/// Where and when the attestation landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeArgs {
    /// Hash of the block containing the attestation.
    pub block_hash: Hash256,
    /// Block timestamp, Unix milliseconds.
    pub timestamp: u64,
    /// Genesis hash of the chain.
    pub genesis_hash: [u8; 32],
}

/// Commit to a credential's subject.
///
/// # Errors
///
/// [`VerificationError::Structure`] when the subject has no vocabulary or
/// the trust model has more than one delegation.
pub fn initialize_proof<R: RngCore + ?Sized>(
    credential: &KiltCredentialV1,
    rng: &mut R,
) -> Result<(KiltAttestationProofV1, AttestationArgs), VerificationError> {
    let authorization = credential.delegation()?;
    let digests: Vec<Hash256> = normalize_claims(&credential.credential_subject)?
        .into_iter()
        .map(|(_, digest)| digest)
        .collect();
    let committed = commit(&digests, rng);
    let root_hash = calculate_root_hash(&committed.commitments, credential.trust_inputs());

    tracing::debug!(root_hash = %root_hash, statements = digests.len(), "attestation proof initialized");

    let proof = KiltAttestationProofV1 {
        proof_type: KILT_ATTESTATION_PROOF_TYPE.to_string(),
        block: String::new(),
        commitments: committed.commitments.iter().map(Hash256::to_base58).collect(),
        salt: committed.salts.iter().map(|s| to_base58(s)).collect(),
    };
    let args = AttestationArgs {
        root_hash,
        c_type_hash: credential.credential_schema.id.hash(),
        authorization,
    };
    Ok((proof, args))
}

/// Complete a credential and its proof after the attestation is on chain.
///
/// The embedded `proof` of the returned credential is the returned proof.
///
/// # Errors
///
/// [`VerificationError::Malformed`] for undecodable commitments and
/// [`VerificationError::Structure`] for an out-of-range timestamp.
pub fn finalize_proof(
    credential: &KiltCredentialV1,
    proof: &KiltAttestationProofV1,
    args: FinalizeArgs,
) -> Result<(KiltCredentialV1, KiltAttestationProofV1), VerificationError> {
    let commitments = proof.decoded_commitments()?;
    let root_hash = calculate_root_hash(&commitments, credential.trust_inputs());
    let millis = i64::try_from(args.timestamp)
        .map_err(|_| VerificationError::Structure(format!("timestamp {} out of range", args.timestamp)))?;
    let issuance_date = Timestamp::from_millis(millis)?;

    let finalized_proof = KiltAttestationProofV1 {
        block: args.block_hash.to_base58(),
        ..proof.clone()
    };
    let finalized = KiltCredentialV1 {
        id: Some(CredentialId::from_root_hash(root_hash)),
        credential_status: Some(CredentialStatus {
            id: AttestationStatusId::new(ChainId::from_genesis(&args.genesis_hash), root_hash),
            status_type: KILT_REVOCATION_STATUS_TYPE.to_string(),
        }),
        issuance_date: Some(issuance_date),
        proof: Some(finalized_proof.clone()),
        ..credential.clone()
    };
    tracing::info!(
        credential = %CredentialId::from_root_hash(root_hash),
        block = %finalized_proof.block,
        "attestation proof finalized"
    );
    Ok((finalized, finalized_proof))
}

/// Reduce a credential and its proof to the disclosed subject properties.
///
/// Identity and context keys are always kept. Salts are kept for the
/// surviving statements in their original order; commitments are kept in
/// full, so the result verifies against the same root hash.
///
/// # Errors
///
/// [`VerificationError::Structure`] when a disclosed property is not in the
/// subject or the subject has no vocabulary, and
/// [`Unverifiable::SaltCount`] when the proof does not match the subject.
pub fn apply_selective_disclosure(
    credential: &KiltCredentialV1,
    proof: &KiltAttestationProofV1,
    disclosed: &[&str],
) -> Result<(KiltCredentialV1, KiltAttestationProofV1), VerificationError> {
    let subject = &credential.credential_subject;
    if let Some(missing) = disclosed.iter().find(|key| !subject.contains_key(**key)) {
        return Err(VerificationError::Structure(format!(
            "credential subject has no property {missing:?}"
        )));
    }
    let vocab = subject_vocabulary(subject)?;
    let normalized = normalize_claims(subject)?;
    if normalized.len() != proof.salt.len() {
        return Err(Unverifiable::SaltCount {
            statements: normalized.len(),
            salts: proof.salt.len(),
        }
        .into());
    }

    let reduced: Map<String, Value> = subject
        .iter()
        .filter(|(key, _)| ALWAYS_DISCLOSED.contains(&key.as_str()) || disclosed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let kept: BTreeSet<String> = reduced
        .keys()
        .filter_map(|key| expand_subject_key(vocab, key))
        .collect();
    let salt: Vec<String> = normalized
        .iter()
        .zip(&proof.salt)
        .filter(|((statement, _), _)| kept.contains(statement.key()))
        .map(|(_, salt)| salt.clone())
        .collect();

    let derived_proof = KiltAttestationProofV1 {
        salt,
        ..proof.clone()
    };
    let derived = KiltCredentialV1 {
        credential_subject: reduced,
        proof: credential.proof.as_ref().map(|_| derived_proof.clone()),
        ..credential.clone()
    };
    tracing::debug!(
        disclosed = derived_proof.salt.len(),
        total = proof.salt.len(),
        "selective disclosure applied"
    );
    Ok((derived, derived_proof))
}

/// Alias of [`apply_selective_disclosure`] for holders deriving a
/// presentation proof.
///
/// # Errors
///
/// See [`apply_selective_disclosure`].
pub fn derive_proof(
    credential: &KiltCredentialV1,
    proof: &KiltAttestationProofV1,
    disclosed: &[&str],
) -> Result<(KiltCredentialV1, KiltAttestationProofV1), VerificationError> {
    apply_selective_disclosure(credential, proof, disclosed)
}

/// Structurally validate, deserialize and decode a proof.
///
/// An empty `block` is accepted (initialized, not finalized).
///
/// # Errors
///
/// [`VerificationError::Structure`] for schema violations and
/// [`VerificationError::Malformed`] for undecodable commitments, salts or
/// block.
pub fn parse_proof(json: &Value) -> Result<KiltAttestationProofV1, VerificationError> {
    schema::validate_proof(json)?;
    let proof: KiltAttestationProofV1 = serde_json::from_value(json.clone())
        .map_err(|e| VerificationError::Structure(format!("not a KiltAttestationProofV1: {e}")))?;
    if !proof.block.is_empty() {
        proof.block_hash()?;
    }
    proof.decoded_commitments()?;
    proof.decoded_salts()?;
    Ok(proof)
}

/// `true` if [`parse_proof`] succeeds.
pub fn is_kilt_attestation_proof(json: &Value) -> bool {
    parse_proof(json).is_ok()
}
