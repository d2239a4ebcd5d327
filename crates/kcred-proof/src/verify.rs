//! # Proof Verification
//!
//! Verifies a [`KiltCredentialV1`] against a [`KiltAttestationProofV1`] and
//! the chain state at the proof's block.
//!
//! ## Steps
//!
//! 1. Structural schema checks of proof and credential.
//! 2. Re-derive the subject's statements in digest order; one salt per
//!    statement.
//! 3. Each recomputed commitment must be in the proof's commitment set.
//! 4. Root hash over stored commitments and trust-model inputs must equal the
//!    root hash in the credential id.
//! 5. The chain's CAIP-2 id must match the credential status.
//! 6. Fetch the attestation event for the root hash at the proof's block.
//! 7. Attester, CType, authorization and issuance time (to the second) must
//!    match the event.
//! 8. Resolve every trust-model entry.
//!
//! Steps 1-5 are synchronous and fail before the chain is queried.
//!
//! Revocation is not part of [`verify`]: an attestation revoked after the
//! proof's block still proves issuance. Use [`check_status`] or
//! [`verify_credential`] for the current state.

use futures::future::BoxFuture;
use kcred_core::{
    CTypeId, ChainId, Did, Hash256, Timestamp, Unverifiable, VerificationError,
};
use serde::Serialize;

use crate::chain::{AttestationRecord, ChainClient};
use crate::commitment::{calculate_root_hash, commitment, normalize_claims};
use crate::proof::KiltAttestationProofV1;
use crate::schema;
use crate::trust_model::{resolve_all, TrustOutcome};
use crate::vc::KiltCredentialV1;

/// What a successful verification established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedProof {
    /// Attested root hash.
    pub root_hash: Hash256,
    /// Who attested it.
    pub attester: Did,
    /// The CType.
    pub ctype_id: CTypeId,
    /// Block holding the attestation.
    pub block: Hash256,
    /// Block time.
    pub timestamp: Timestamp,
    /// One outcome per trust-model entry, in array order.
    pub trust: Vec<TrustOutcome>,
}

/// Verify `credential` with `proof` against `chain`.
///
/// # Errors
///
/// - [`VerificationError::Structure`] for schema violations, a missing id,
///   status or issuance date, or more than one delegation.
/// - [`VerificationError::Malformed`] for undecodable proof fields.
/// - [`VerificationError::Unverifiable`] when salts, commitments or the root
///   hash do not line up.
/// - [`VerificationError::NotFound`] when the block has no matching event.
/// - [`VerificationError::Mismatch`] naming the first field that differs
///   from the chain.
/// - [`VerificationError::Chain`] when the chain could not be queried.
/// - Any trust-model resolution error.
pub async fn verify<C: ChainClient>(
    credential: &KiltCredentialV1,
    proof: &KiltAttestationProofV1,
    chain: &C,
) -> Result<VerifiedProof, VerificationError> {
    verify_boxed(credential, proof, chain).await
}

/// Boxed entry point so legitimation resolution can recurse into
/// verification.
pub(crate) fn verify_boxed<'a, C: ChainClient>(
    credential: &'a KiltCredentialV1,
    proof: &'a KiltAttestationProofV1,
    chain: &'a C,
) -> BoxFuture<'a, Result<VerifiedProof, VerificationError>> {
    Box::pin(verify_inner(credential, proof, chain))
}

async fn verify_inner<C: ChainClient>(
    credential: &KiltCredentialV1,
    proof: &KiltAttestationProofV1,
    chain: &C,
) -> Result<VerifiedProof, VerificationError> {
    let root_hash = verify_offline(credential, proof)?;
    let block = proof.block_hash()?;
    check_chain_id(credential, chain)?;

    tracing::debug!(root_hash = %root_hash, block = %block, "querying attestation event");
    let event = chain
        .attestation_event_at(&block, &root_hash)
        .await?
        .ok_or_else(|| {
            VerificationError::NotFound(format!(
                "attestation of {root_hash} in block {}",
                proof.block
            ))
        })?;

    if event.attester != credential.issuer {
        return Err(VerificationError::mismatch(
            "issuer",
            &credential.issuer,
            &event.attester,
        ));
    }
    let ctype_id = CTypeId::from_hash(event.ctype_hash);
    if ctype_id != credential.credential_schema.id {
        return Err(VerificationError::mismatch(
            "credentialSchema.id",
            credential.credential_schema.id,
            ctype_id,
        ));
    }
    let timestamp = event_timestamp(event.timestamp)?;
    let issued = credential
        .issuance_date
        .ok_or_else(|| VerificationError::Structure("credential has no issuanceDate".into()))?;
    if issued.rounded_secs() != timestamp.rounded_secs() {
        return Err(VerificationError::mismatch(
            "issuanceDate",
            timestamp,
            issued,
        ));
    }
    let delegation = credential.delegation()?.map(|d| d.node_id());
    if event.authorization_id != delegation {
        return Err(VerificationError::mismatch(
            "authorizationId",
            delegation.map_or_else(|| "none".to_string(), |d| d.to_hex()),
            event
                .authorization_id
                .map_or_else(|| "none".to_string(), |a| a.to_hex()),
        ));
    }

    let trust = resolve_all(&credential.federated_trust_model, &event, chain).await?;

    tracing::info!(
        root_hash = %root_hash,
        attester = %event.attester,
        trust_entries = trust.len(),
        "attestation proof verified"
    );
    Ok(VerifiedProof {
        root_hash,
        attester: event.attester,
        ctype_id,
        block,
        timestamp,
        trust,
    })
}

/// Steps 1-4: everything that needs no chain. Returns the root hash.
fn verify_offline(
    credential: &KiltCredentialV1,
    proof: &KiltAttestationProofV1,
) -> Result<Hash256, VerificationError> {
    schema::validate_proof(&to_json(proof)?)?;
    schema::validate_credential(&to_json(credential)?)?;

    let normalized = normalize_claims(&credential.credential_subject)?;
    if normalized.len() != proof.salt.len() {
        return Err(Unverifiable::SaltCount {
            statements: normalized.len(),
            salts: proof.salt.len(),
        }
        .into());
    }
    let salts = proof.decoded_salts()?;
    let commitments = proof.decoded_commitments()?;
    for ((statement, digest), salt) in normalized.iter().zip(&salts) {
        if !commitments.contains(&commitment(salt, digest)) {
            return Err(Unverifiable::MissingCommitment {
                key: statement.key().to_string(),
                digest: digest.to_hex(),
            }
            .into());
        }
    }

    let expected = credential.root_hash()?;
    let computed = calculate_root_hash(&commitments, credential.trust_inputs());
    if computed != expected {
        return Err(Unverifiable::RootHash {
            expected: expected.to_hex(),
            computed: computed.to_hex(),
        }
        .into());
    }
    Ok(expected)
}

/// Step 5.
fn check_chain_id<C: ChainClient>(
    credential: &KiltCredentialV1,
    chain: &C,
) -> Result<(), VerificationError> {
    let status = credential
        .credential_status
        .as_ref()
        .ok_or_else(|| VerificationError::Structure("credential has no credentialStatus".into()))?;
    let chain_id = ChainId::from_genesis(&chain.genesis_hash());
    if status.id.chain() != &chain_id {
        return Err(VerificationError::mismatch(
            "credentialStatus.id",
            status.id.chain(),
            chain_id,
        ));
    }
    let root_hash = credential.root_hash()?;
    if status.id.root_hash() != root_hash {
        return Err(VerificationError::mismatch(
            "credentialStatus.id",
            root_hash,
            status.id.root_hash(),
        ));
    }
    Ok(())
}

fn event_timestamp(millis: u64) -> Result<Timestamp, VerificationError> {
    let millis = i64::try_from(millis)
        .map_err(|_| VerificationError::Structure(format!("event timestamp {millis} out of range")))?;
    Timestamp::from_millis(millis)
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, VerificationError> {
    serde_json::to_value(value).map_err(|e| VerificationError::Structure(e.to_string()))
}

/// Check the current attestation record: present, not revoked, same attester
/// and CType.
///
/// # Errors
///
/// [`VerificationError::NotFound`], [`VerificationError::Revoked`],
/// [`VerificationError::Mismatch`], or [`VerificationError::Chain`].
pub async fn check_status<C: ChainClient>(
    credential: &KiltCredentialV1,
    chain: &C,
) -> Result<AttestationRecord, VerificationError> {
    let root_hash = credential.root_hash()?;
    let record = chain
        .attestation(&root_hash)
        .await?
        .ok_or_else(|| VerificationError::NotFound(format!("attestation of {root_hash}")))?;
    if record.revoked {
        tracing::warn!(root_hash = %root_hash, "attestation revoked");
        return Err(VerificationError::Revoked(format!("attestation of {root_hash}")));
    }
    if record.owner != credential.issuer {
        return Err(VerificationError::mismatch(
            "issuer",
            &credential.issuer,
            &record.owner,
        ));
    }
    let ctype = credential.credential_schema.id.hash();
    if record.c_type_hash != ctype {
        return Err(VerificationError::mismatch("cTypeHash", ctype, record.c_type_hash));
    }
    Ok(record)
}

/// Verify the proof embedded in `credential`, then its current status.
///
/// # Errors
///
/// [`VerificationError::Structure`] when no proof is embedded, otherwise any
/// error of [`verify`] or [`check_status`].
pub async fn verify_credential<C: ChainClient>(
    credential: &KiltCredentialV1,
    chain: &C,
) -> Result<VerifiedProof, VerificationError> {
    let proof = credential
        .proof
        .as_ref()
        .ok_or_else(|| VerificationError::Structure("credential has no embedded proof".into()))?;
    let verified = verify(credential, proof, chain).await?;
    check_status(credential, chain).await?;
    Ok(verified)
}
