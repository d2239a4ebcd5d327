//! # KiltCredentialV1
//!
//! The verifiable-credential envelope for a KILT claim. The credential's id
//! and status both encode the root hash produced by the commitment scheme:
//!
//! ```text
//! id                   = kilt:credential:<base58(root)>
//! credentialStatus.id  = polkadot:<genesis[..16]>/kilt:attestation/<base58(root)>
//! ```
//!
//! A credential is built unfinalized by [`KiltCredentialV1::from_input`]
//! (no `id`, `credentialStatus`, `issuanceDate` or `proof`) and completed by
//! [`crate::proof::finalize_proof`] once the attestation is on chain.

use kcred_core::{
    AttestationStatusId, CTypeId, CredentialId, DelegationId, Did, Hash256, Timestamp,
    VerificationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::proof::KiltAttestationProofV1;
use crate::schema;
use crate::trust_model::TrustModelEntry;

/// W3C credentials context.
pub const W3C_CREDENTIAL_CONTEXT_URL: &str = "https://www.w3.org/2018/credentials/v1";
/// KILT credentials context.
pub const KILT_CREDENTIAL_CONTEXT_URL: &str = "https://www.kilt.io/contexts/credentials";
/// Generic VC type.
pub const VC_TYPE: &str = "VerifiableCredential";
/// KILT credential type.
pub const KILT_CREDENTIAL_TYPE: &str = "KiltCredentialV1";
/// `credentialSchema.type`.
pub const JSON_SCHEMA_TYPE: &str = "JsonSchema2023";
/// `credentialStatus.type`.
pub const KILT_REVOCATION_STATUS_TYPE: &str = "KiltRevocationStatusV1";

/// The CType a credential conforms to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSchema {
    /// CType id.
    pub id: CTypeId,
    /// Always [`JSON_SCHEMA_TYPE`].
    #[serde(rename = "type")]
    pub schema_type: String,
}

/// Where to look up revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    /// CAIP-19 id of the attestation.
    pub id: AttestationStatusId,
    /// Always [`KILT_REVOCATION_STATUS_TYPE`].
    #[serde(rename = "type")]
    pub status_type: String,
}

/// A KILT verifiable credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KiltCredentialV1 {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `["VerifiableCredential", "KiltCredentialV1"]`.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// `kilt:credential:<base58 root hash>`, set on finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CredentialId>,
    /// Subject with `@context.@vocab`, `id` and the disclosed claims.
    pub credential_subject: Map<String, Value>,
    /// The CType.
    pub credential_schema: CredentialSchema,
    /// Revocation status, set on finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatus>,
    /// The attester.
    pub issuer: Did,
    /// Block time of the attestation, set on finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<Timestamp>,
    /// Always `true`.
    pub non_transferable: bool,
    /// Legitimations and delegation.
    #[serde(default)]
    pub federated_trust_model: Vec<TrustModelEntry>,
    /// Embedded attestation proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<KiltAttestationProofV1>,
}

/// A legitimation to include in a new credential.
#[derive(Debug, Clone, PartialEq)]
pub enum Legitimation {
    /// A finalized credential, embedded so it can be verified.
    Credential(Box<KiltCredentialV1>),
    /// Only the id.
    Id(CredentialId),
}

/// Inputs for [`KiltCredentialV1::from_input`].
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialInput {
    /// Claim subject (the credential holder).
    pub subject: Did,
    /// Claim contents, un-prefixed keys.
    pub claims: Map<String, Value>,
    /// CType hash.
    pub c_type_hash: Hash256,
    /// The attester.
    pub issuer: Did,
    /// Legitimations, in root-hash order.
    pub legitimations: Vec<Legitimation>,
    /// Delegation node the attestation will be made under.
    pub delegation_id: Option<Hash256>,
}

impl KiltCredentialV1 {
    /// Build an unfinalized credential.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] when a claim key collides with
    /// a reserved subject key or a legitimation credential has no id.
    pub fn from_input(input: CredentialInput) -> Result<Self, VerificationError> {
        let ctype_id = CTypeId::from_hash(input.c_type_hash);
        let mut subject = Map::new();
        for (key, value) in input.claims {
            if matches!(key.as_str(), "@context" | "id" | "@id" | "type" | "@type") {
                return Err(VerificationError::Structure(format!(
                    "claim key {key:?} is reserved"
                )));
            }
            subject.insert(key, value);
        }
        subject.insert(
            "@context".into(),
            serde_json::json!({ "@vocab": ctype_id.vocabulary() }),
        );
        subject.insert("id".into(), Value::String(input.subject.to_string()));

        let mut federated_trust_model = Vec::with_capacity(input.legitimations.len() + 1);
        for legitimation in input.legitimations {
            federated_trust_model.push(match legitimation {
                Legitimation::Credential(credential) => {
                    let id = credential.id.ok_or_else(|| {
                        VerificationError::Structure("legitimation credential has no id".into())
                    })?;
                    TrustModelEntry::KiltAttesterLegitimationV1 {
                        id,
                        verifiable_credential: Some(credential),
                    }
                }
                Legitimation::Id(id) => TrustModelEntry::KiltAttesterLegitimationV1 {
                    id,
                    verifiable_credential: None,
                },
            });
        }
        if let Some(node) = input.delegation_id {
            federated_trust_model.push(TrustModelEntry::KiltAttesterDelegationV1 {
                id: DelegationId::from_node_id(node),
                delegators: None,
            });
        }

        Ok(Self {
            context: vec![
                W3C_CREDENTIAL_CONTEXT_URL.to_string(),
                KILT_CREDENTIAL_CONTEXT_URL.to_string(),
            ],
            types: vec![VC_TYPE.to_string(), KILT_CREDENTIAL_TYPE.to_string()],
            id: None,
            credential_subject: subject,
            credential_schema: CredentialSchema {
                id: ctype_id,
                schema_type: JSON_SCHEMA_TYPE.to_string(),
            },
            credential_status: None,
            issuer: input.issuer,
            issuance_date: None,
            non_transferable: true,
            federated_trust_model,
            proof: None,
        })
    }

    /// The root hash encoded in `id`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] for an unfinalized credential.
    pub fn root_hash(&self) -> Result<Hash256, VerificationError> {
        self.id
            .map(|id| id.root_hash())
            .ok_or_else(|| VerificationError::Structure("credential has no id".into()))
    }

    /// Trust-model root hash inputs in array order.
    pub fn trust_inputs(&self) -> impl Iterator<Item = Hash256> + '_ {
        self.federated_trust_model
            .iter()
            .map(TrustModelEntry::root_hash_input)
    }

    /// The single delegation entry, if any.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] when there is more than one.
    pub fn delegation(&self) -> Result<Option<DelegationId>, VerificationError> {
        let mut delegations = self
            .federated_trust_model
            .iter()
            .filter_map(TrustModelEntry::delegation_id);
        let first = delegations.next();
        if delegations.next().is_some() {
            return Err(VerificationError::Structure(
                "more than one delegation in federatedTrustModel".into(),
            ));
        }
        Ok(first)
    }
}

/// Structurally validate and deserialize a credential.
///
/// # Errors
///
/// Returns [`VerificationError::Structure`] listing schema violations or the
/// deserialization failure.
pub fn parse_credential(json: &Value) -> Result<KiltCredentialV1, VerificationError> {
    schema::validate_credential(json)?;
    serde_json::from_value(json.clone())
        .map_err(|e| VerificationError::Structure(format!("not a KiltCredentialV1: {e}")))
}

/// `true` if [`parse_credential`] succeeds.
pub fn is_kilt_credential(json: &Value) -> bool {
    parse_credential(json).is_ok()
}
