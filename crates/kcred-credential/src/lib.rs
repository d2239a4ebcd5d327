//! # kcred-credential — Salted Claim Hashes and Selective Disclosure
//!
//! Turns claim contents into a stable credential identity and lets a holder
//! reveal a subset of properties while the verifier still trusts the whole.
//!
//! ```text
//! Claim ──statements()──▶ [Statement] ──hash_statements()──▶ hashes + nonce map
//!                                                               │
//!              legitimations ++ delegation id ──────────────────┴──▶ root hash
//! ```
//!
//! - [`CType`]: schema identity (`kilt:ctype:0x<hash>`).
//! - [`Claim`]: contents, owner and CType hash.
//! - [`Credential`]: hashed claim with root hash, integrity checks and
//!   property removal.
//! - [`Attestation`]: the on-chain record for a credential's root hash.

pub mod attestation;
pub mod claim;
pub mod credential;
pub mod ctype;
pub mod hasher;

pub use attestation::Attestation;
pub use claim::Claim;
pub use credential::{calculate_root_hash, Credential, CredentialBuilder};
pub use ctype::CType;
pub use hasher::{
    hash_claim_contents, hash_statements, salted_hash, verify_disclosed_attributes,
    HashedStatements, NonceMap, NonceSource,
};
