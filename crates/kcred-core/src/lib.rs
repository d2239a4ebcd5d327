//! # kcred-core — Foundational Types for Claim Commitments
//!
//! This crate holds the primitives every other kcred crate builds on. It
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One hash function.** Blake2b-256 ([`blake2b_256`]) is used for
//!    statement digests, salted hashes, commitments, root hashes and CType
//!    hashes. [`Hash256`] is the shared value type.
//!
//! 2. **`Statement` newtype.** Claim material is hashed only as a
//!    [`Statement`], whose sole constructor applies JCS and NFC. A digest over
//!    non-canonical bytes cannot be expressed.
//!
//! 3. **Validated identifiers.** [`Did`], [`CTypeId`], [`CredentialId`],
//!    [`DelegationId`], [`ChainId`] and [`AttestationStatusId`] are newtypes
//!    whose deserializers run the same validation as their constructors.
//!
//! 4. **One error taxonomy.** Every failure converts into
//!    [`VerificationError`].
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod caip;
pub mod canonical;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod temporal;

pub use caip::{AttestationStatusId, ChainId};
pub use canonical::{ExpandedClaim, Statement};
pub use digest::{blake2b_256, blake2b_256_concat, Hash256};
pub use error::{
    CanonicalizationError, ChainError, EncodingError, IdentifierError, SchemaError,
    SchemaViolation, StatementError, Unverifiable, VerificationError,
};
pub use identity::{CTypeId, CredentialId, DelegationId, Did};
pub use temporal::Timestamp;
