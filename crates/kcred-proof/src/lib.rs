//! # kcred-proof — Attestation Proofs for Verifiable Credentials
//!
//! Issues and verifies `KiltAttestationProofV1` proofs over
//! `KiltCredentialV1` credentials. The chain only ever sees a root hash over
//! salted commitments; the holder can drop subject properties and their
//! salts without changing that root.
//!
//! ```text
//! issuer:   from_input ─▶ initialize_proof ─▶ (attest on chain) ─▶ finalize_proof
//! holder:   apply_selective_disclosure
//! verifier: verify ─▶ trust model resolution ─▶ check_status
//! ```
//!
//! All chain access goes through [`ChainClient`], passed explicitly to every
//! verifying function.

pub mod chain;
pub mod commitment;
pub mod proof;
pub mod schema;
pub mod trust_model;
pub mod vc;
pub mod verify;

pub use chain::{AttestationEvent, AttestationRecord, ChainClient, DelegationNode, MemoryChain};
pub use commitment::{calculate_root_hash, commit, commitment, normalize_claims, Commitments, Entropy, ENTROPY_LEN};
pub use proof::{
    apply_selective_disclosure, derive_proof, finalize_proof, initialize_proof,
    is_kilt_attestation_proof, parse_proof, AttestationArgs, FinalizeArgs, KiltAttestationProofV1,
    KILT_ATTESTATION_PROOF_TYPE,
};
pub use trust_model::{TrustModelEntry, TrustOutcome, MAX_HIERARCHY_DEPTH};
pub use vc::{
    is_kilt_credential, parse_credential, CredentialInput, CredentialSchema, CredentialStatus,
    KiltCredentialV1, Legitimation,
};
pub use verify::{check_status, verify, verify_credential, VerifiedProof};
