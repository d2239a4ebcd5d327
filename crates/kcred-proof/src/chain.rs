//! # Chain Access
//!
//! Verification reads three things from the chain: the attestation event in
//! a given block, delegation nodes, and the current attestation record for
//! revocation checks. [`ChainClient`] is the seam; a node RPC client lives
//! outside this crate.
//!
//! [`MemoryChain`] is an in-memory implementation for tests and offline
//! verification against a JSON snapshot.

use std::collections::BTreeMap;
use std::future::Future;

use kcred_core::{ChainError, Did, Hash256};
use serde::{Deserialize, Serialize};

/// The current attestation record for a claim hash.
pub type AttestationRecord = kcred_credential::Attestation;

/// An `AttestationCreated` event as emitted in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationEvent {
    /// Who created the attestation.
    pub attester: Did,
    /// CType of the attested claim.
    pub ctype_hash: Hash256,
    /// Delegation node the attestation was authorized by.
    #[serde(default)]
    pub authorization_id: Option<Hash256>,
    /// Block timestamp, Unix milliseconds.
    pub timestamp: u64,
}

/// A node of a delegation hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationNode {
    /// Delegate holding the node.
    pub owner: Did,
    /// Parent node; `None` for the hierarchy root.
    #[serde(default)]
    pub parent: Option<Hash256>,
    /// Whether the node has been revoked.
    #[serde(default)]
    pub revoked: bool,
}

impl DelegationNode {
    /// An unrevoked node.
    pub fn new(owner: Did, parent: Option<Hash256>) -> Self {
        Self {
            owner,
            parent,
            revoked: false,
        }
    }
}

/// Read access to a KILT-style chain.
///
/// Lookups return `Ok(None)` when the chain answered and the item does not
/// exist, and [`ChainError`] when the chain could not be asked.
pub trait ChainClient: Send + Sync {
    /// Genesis block hash, for CAIP-2 chain ids.
    fn genesis_hash(&self) -> [u8; 32];

    /// The attestation event for `claim_hash` emitted in `block_hash`.
    fn attestation_event_at(
        &self,
        block_hash: &Hash256,
        claim_hash: &Hash256,
    ) -> impl Future<Output = Result<Option<AttestationEvent>, ChainError>> + Send;

    /// A delegation node by id.
    fn delegation_node(
        &self,
        node_id: &Hash256,
    ) -> impl Future<Output = Result<Option<DelegationNode>, ChainError>> + Send;

    /// The current attestation record for `claim_hash`.
    fn attestation(
        &self,
        claim_hash: &Hash256,
    ) -> impl Future<Output = Result<Option<AttestationRecord>, ChainError>> + Send;
}

/// In-memory chain state.
///
/// Attestations are recorded as they would be on chain: an event in a block
/// plus a current record that can later be revoked. The serialized form is
/// the snapshot format accepted by [`MemoryChain::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryChain {
    genesis_hash: Hash256,
    /// block hash -> claim hash -> event
    #[serde(default)]
    events: BTreeMap<Hash256, BTreeMap<Hash256, AttestationEvent>>,
    #[serde(default)]
    attestations: BTreeMap<Hash256, AttestationRecord>,
    #[serde(default)]
    delegations: BTreeMap<Hash256, DelegationNode>,
    #[serde(skip)]
    unavailable: Option<String>,
}

impl MemoryChain {
    /// An empty chain with the given genesis hash.
    pub fn new(genesis_hash: [u8; 32]) -> Self {
        Self {
            genesis_hash: Hash256::from_bytes(genesis_hash),
            events: BTreeMap::new(),
            attestations: BTreeMap::new(),
            delegations: BTreeMap::new(),
            unavailable: None,
        }
    }

    /// Load a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if the snapshot is not valid JSON of the
    /// expected shape.
    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        serde_json::from_str(json).map_err(|e| ChainError(format!("invalid chain snapshot: {e}")))
    }

    /// Record an attestation in `block_hash` at `timestamp` (ms).
    pub fn record_attestation(&mut self, block_hash: Hash256, timestamp: u64, record: AttestationRecord) {
        let event = AttestationEvent {
            attester: record.owner.clone(),
            ctype_hash: record.c_type_hash,
            authorization_id: record.delegation_id,
            timestamp,
        };
        self.events
            .entry(block_hash)
            .or_default()
            .insert(record.claim_hash, event);
        self.attestations.insert(record.claim_hash, record);
    }

    /// Mark an attestation revoked. Returns `false` if there is none.
    pub fn revoke(&mut self, claim_hash: &Hash256) -> bool {
        match self.attestations.get_mut(claim_hash) {
            Some(record) => {
                record.revoked = true;
                true
            }
            None => false,
        }
    }

    /// Remove the current attestation record, as a chain would after the
    /// attester reclaims its deposit. Events stay.
    pub fn remove_attestation(&mut self, claim_hash: &Hash256) -> Option<AttestationRecord> {
        self.attestations.remove(claim_hash)
    }

    /// Add or replace a delegation node.
    pub fn add_delegation(&mut self, node_id: Hash256, node: DelegationNode) {
        self.delegations.insert(node_id, node);
    }

    /// Mark a delegation node revoked. Returns `false` if there is none.
    pub fn revoke_delegation(&mut self, node_id: &Hash256) -> bool {
        match self.delegations.get_mut(node_id) {
            Some(node) => {
                node.revoked = true;
                true
            }
            None => false,
        }
    }

    /// Make every query fail with `reason`.
    pub fn set_unavailable(&mut self, reason: impl Into<String>) {
        self.unavailable = Some(reason.into());
    }

    fn lookup<T>(&self, found: Option<&T>) -> Result<Option<T>, ChainError>
    where
        T: Clone,
    {
        match &self.unavailable {
            Some(reason) => Err(ChainError(reason.clone())),
            None => Ok(found.cloned()),
        }
    }
}

impl ChainClient for MemoryChain {
    fn genesis_hash(&self) -> [u8; 32] {
        *self.genesis_hash.as_bytes()
    }

    fn attestation_event_at(
        &self,
        block_hash: &Hash256,
        claim_hash: &Hash256,
    ) -> impl Future<Output = Result<Option<AttestationEvent>, ChainError>> + Send {
        let found = self
            .events
            .get(block_hash)
            .and_then(|events| events.get(claim_hash));
        std::future::ready(self.lookup(found))
    }

    fn delegation_node(
        &self,
        node_id: &Hash256,
    ) -> impl Future<Output = Result<Option<DelegationNode>, ChainError>> + Send {
        std::future::ready(self.lookup(self.delegations.get(node_id)))
    }

    fn attestation(
        &self,
        claim_hash: &Hash256,
    ) -> impl Future<Output = Result<Option<AttestationRecord>, ChainError>> + Send {
        std::future::ready(self.lookup(self.attestations.get(claim_hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcred_core::blake2b_256;

    fn record(claim: &[u8]) -> AttestationRecord {
        AttestationRecord {
            claim_hash: blake2b_256(claim),
            c_type_hash: blake2b_256(b"ctype"),
            owner: Did::parse("did:kilt:4attester").unwrap(),
            delegation_id: None,
            revoked: false,
        }
    }

    #[tokio::test]
    async fn test_event_is_scoped_to_block() {
        let mut chain = MemoryChain::new([1; 32]);
        let block = blake2b_256(b"block");
        chain.record_attestation(block, 1_000, record(b"claim"));

        let event = chain
            .attestation_event_at(&block, &blake2b_256(b"claim"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.timestamp, 1_000);
        assert_eq!(event.ctype_hash, blake2b_256(b"ctype"));
        assert!(chain
            .attestation_event_at(&blake2b_256(b"other"), &blake2b_256(b"claim"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_revoke_keeps_event() {
        let mut chain = MemoryChain::new([1; 32]);
        let block = blake2b_256(b"block");
        let claim = blake2b_256(b"claim");
        chain.record_attestation(block, 1_000, record(b"claim"));
        assert!(chain.revoke(&claim));
        assert!(!chain.revoke(&blake2b_256(b"unknown")));
        assert!(chain.attestation(&claim).await.unwrap().unwrap().revoked);
        assert!(chain.attestation_event_at(&block, &claim).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unavailable_chain_errors() {
        let mut chain = MemoryChain::new([1; 32]);
        chain.set_unavailable("connection refused");
        let err = chain.delegation_node(&blake2b_256(b"n")).await.unwrap_err();
        assert_eq!(err, ChainError("connection refused".into()));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut chain = MemoryChain::new([9; 32]);
        chain.record_attestation(blake2b_256(b"block"), 5, record(b"claim"));
        chain.add_delegation(
            blake2b_256(b"node"),
            DelegationNode::new(Did::parse("did:kilt:4root").unwrap(), None),
        );
        let json = serde_json::to_string(&chain).unwrap();
        let back = MemoryChain::from_json(&json).unwrap();
        assert_eq!(back, chain);
        assert_eq!(back.genesis_hash(), [9; 32]);
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        assert!(MemoryChain::from_json("{\"genesisHash\": 5}").is_err());
    }
}
