//! # Federated Trust Model
//!
//! A credential can name other parties whose authority backs the attester:
//!
//! - **Legitimation**: another attested credential, by id, optionally with
//!   the credential embedded so it can be verified in turn.
//! - **Delegation**: an on-chain delegation node the attestation was made
//!   under, optionally with the owners of its ancestors.
//!
//! Each entry contributes one 32-byte input to the root hash, in array order:
//! the legitimation's root hash or the delegation's node id.
//!
//! Resolution runs after the attestation event has been fetched. Entries are
//! resolved concurrently and the first failure wins.

use futures::future::try_join_all;
use kcred_core::{CredentialId, DelegationId, Did, Hash256, Unverifiable, VerificationError};
use serde::{Deserialize, Serialize};

use crate::chain::{AttestationEvent, ChainClient, DelegationNode};
use crate::vc::KiltCredentialV1;

/// Upper bound on delegation hierarchy depth walked during resolution.
pub const MAX_HIERARCHY_DEPTH: usize = 64;

/// One entry of `federatedTrustModel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrustModelEntry {
    /// Another credential legitimizing the attester.
    #[serde(rename_all = "camelCase")]
    KiltAttesterLegitimationV1 {
        /// Id of the legitimating credential.
        id: CredentialId,
        /// The legitimating credential itself, with its proof.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verifiable_credential: Option<Box<KiltCredentialV1>>,
    },
    /// The delegation node the attestation was authorized by.
    #[serde(rename_all = "camelCase")]
    KiltAttesterDelegationV1 {
        /// The node.
        id: DelegationId,
        /// Owners of the node's ancestors, hierarchy root first.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delegators: Option<Vec<Did>>,
    },
}

impl TrustModelEntry {
    /// The 32 bytes this entry contributes to the root hash.
    pub fn root_hash_input(&self) -> Hash256 {
        match self {
            Self::KiltAttesterLegitimationV1 { id, .. } => id.root_hash(),
            Self::KiltAttesterDelegationV1 { id, .. } => id.node_id(),
        }
    }

    /// The delegation id, if this is a delegation entry.
    pub fn delegation_id(&self) -> Option<DelegationId> {
        match self {
            Self::KiltAttesterDelegationV1 { id, .. } => Some(*id),
            Self::KiltAttesterLegitimationV1 { .. } => None,
        }
    }
}

/// How a trust-model entry was established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TrustOutcome {
    /// The embedded legitimation credential verified against the chain.
    LegitimationVerified {
        /// Legitimation credential id.
        id: CredentialId,
        /// Who attested the legitimation.
        attester: Did,
    },
    /// Only the legitimation id was given. Nothing was checked.
    LegitimationAssumed {
        /// Legitimation credential id.
        id: CredentialId,
    },
    /// The delegation node exists, is not revoked and authorized the
    /// attestation.
    DelegationVerified {
        /// Delegation node id.
        id: DelegationId,
        /// Owner of the node.
        owner: Did,
    },
}

/// Resolve every entry concurrently; the first failure fails the whole set.
///
/// # Errors
///
/// The first entry error, see [`resolve_entry`].
pub async fn resolve_all<C: ChainClient>(
    entries: &[TrustModelEntry],
    event: &AttestationEvent,
    chain: &C,
) -> Result<Vec<TrustOutcome>, VerificationError> {
    try_join_all(entries.iter().map(|entry| resolve_entry(entry, event, chain))).await
}

/// Resolve a single entry.
///
/// # Errors
///
/// - Legitimation: [`VerificationError::Mismatch`] when the embedded
///   credential's id differs from the entry id, [`VerificationError::Structure`]
///   when it carries no proof, and any error of its own verification.
/// - Delegation: [`VerificationError::NotFound`] for a missing node or
///   ancestor, [`VerificationError::Revoked`] for a revoked node,
///   [`VerificationError::Mismatch`] when the node did not authorize the
///   attestation or the delegators differ from the ancestor owners.
pub async fn resolve_entry<C: ChainClient>(
    entry: &TrustModelEntry,
    event: &AttestationEvent,
    chain: &C,
) -> Result<TrustOutcome, VerificationError> {
    match entry {
        TrustModelEntry::KiltAttesterLegitimationV1 {
            id,
            verifiable_credential: Some(credential),
        } => {
            if credential.id != Some(*id) {
                return Err(VerificationError::mismatch(
                    "federatedTrustModel.id",
                    id,
                    credential
                        .id
                        .map_or_else(|| "none".to_string(), |c| c.to_string()),
                ));
            }
            let proof = credential.proof.as_ref().ok_or_else(|| {
                VerificationError::Structure(format!("legitimation {id} has no proof"))
            })?;
            let report = crate::verify::verify_boxed(credential, proof, chain).await?;
            tracing::debug!(legitimation = %id, attester = %report.attester, "legitimation verified");
            Ok(TrustOutcome::LegitimationVerified {
                id: *id,
                attester: report.attester,
            })
        }
        TrustModelEntry::KiltAttesterLegitimationV1 {
            id,
            verifiable_credential: None,
        } => {
            tracing::warn!(legitimation = %id, "legitimation has no embedded credential, assumed without verification");
            Ok(TrustOutcome::LegitimationAssumed { id: *id })
        }
        TrustModelEntry::KiltAttesterDelegationV1 { id, delegators } => {
            let node = fetch_node(chain, &id.node_id()).await?;
            if node.revoked {
                return Err(VerificationError::Revoked(format!("delegation {id}")));
            }
            if event.authorization_id != Some(id.node_id()) {
                return Err(VerificationError::mismatch(
                    "authorizationId",
                    id.node_id(),
                    event
                        .authorization_id
                        .map_or_else(|| "none".to_string(), |a| a.to_hex()),
                ));
            }
            if let Some(expected) = delegators {
                let actual = ancestor_owners(chain, &node).await?;
                if &actual != expected {
                    return Err(VerificationError::mismatch(
                        "delegators",
                        join_dids(expected),
                        join_dids(&actual),
                    ));
                }
            }
            tracing::debug!(delegation = %id, owner = %node.owner, "delegation verified");
            Ok(TrustOutcome::DelegationVerified {
                id: *id,
                owner: node.owner,
            })
        }
    }
}

async fn fetch_node<C: ChainClient>(chain: &C, id: &Hash256) -> Result<DelegationNode, VerificationError> {
    chain
        .delegation_node(id)
        .await?
        .ok_or_else(|| VerificationError::NotFound(format!("delegation node {id}")))
}

/// Owners of the strict ancestors of `node`, hierarchy root first.
async fn ancestor_owners<C: ChainClient>(chain: &C, node: &DelegationNode) -> Result<Vec<Did>, VerificationError> {
    let mut owners = Vec::new();
    let mut parent = node.parent;
    while let Some(parent_id) = parent {
        if owners.len() == MAX_HIERARCHY_DEPTH {
            return Err(Unverifiable::HierarchyTooDeep(MAX_HIERARCHY_DEPTH).into());
        }
        let ancestor = fetch_node(chain, &parent_id).await?;
        owners.push(ancestor.owner);
        parent = ancestor.parent;
    }
    owners.reverse();
    Ok(owners)
}

fn join_dids(dids: &[Did]) -> String {
    format!(
        "[{}]",
        dids.iter().map(Did::as_str).collect::<Vec<_>>().join(", ")
    )
}
