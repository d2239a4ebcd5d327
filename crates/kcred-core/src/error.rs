//! # Error Types — Verification Error Taxonomy
//!
//! Defines the error types used throughout kcred. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Per-concern errors (`EncodingError`, `CanonicalizationError`,
//!   `IdentifierError`, `SchemaError`, `ChainError`) are raised by the
//!   module that owns the concern.
//! - Every per-concern error converts into [`VerificationError`], the
//!   single taxonomy callers match on.
//! - Statement-level failures carry the property key and the statement
//!   digest, never the disclosed value.

use thiserror::Error;

/// Top-level verification error.
///
/// Structural and format checks fail synchronously before any chain query.
/// Chain-backed checks fail after the query that disproved them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The input does not have the shape the operation requires.
    #[error("structure error: {0}")]
    Structure(String),

    /// A field is present but cannot be decoded (hex, base58, identifier syntax).
    #[error("malformed value: {0}")]
    Malformed(#[from] IdentifierError),

    /// Recomputed cryptographic material does not match the stored material.
    #[error("unverifiable: {0}")]
    Unverifiable(#[from] Unverifiable),

    /// A referenced on-chain record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Two values that must agree do not.
    #[error("mismatch in {field}: expected {expected}, found {actual}")]
    Mismatch {
        /// The field being cross-checked (`issuer`, `credentialSchema.id`, ...).
        field: &'static str,
        /// The value the credential claims.
        expected: String,
        /// The value the chain or the recomputation produced.
        actual: String,
    },

    /// The on-chain record exists but has been revoked.
    #[error("revoked: {0}")]
    Revoked(String),

    /// The chain client failed; propagated unchanged.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl VerificationError {
    /// Shorthand for a [`VerificationError::Mismatch`].
    pub fn mismatch(
        field: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::Mismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<EncodingError> for VerificationError {
    fn from(err: EncodingError) -> Self {
        Self::Malformed(IdentifierError::Encoding(err))
    }
}

impl From<StatementError> for VerificationError {
    fn from(err: StatementError) -> Self {
        Self::Unverifiable(Unverifiable::Statements(vec![err]))
    }
}

impl From<CanonicalizationError> for VerificationError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Structure(err.to_string())
    }
}

impl From<SchemaError> for VerificationError {
    fn from(err: SchemaError) -> Self {
        Self::Structure(err.to_string())
    }
}

/// Cryptographic recomputation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unverifiable {
    /// The recomputed root hash differs from the stored one.
    #[error("root hash not verifiable: expected {expected}, computed {computed}")]
    RootHash {
        /// Root hash carried by the credential.
        expected: String,
        /// Root hash recomputed from the credential's leaves.
        computed: String,
    },

    /// One or more disclosed statements failed; every cause is listed.
    #[error("{} statement(s) not verifiable: {}", .0.len(), join_causes(.0))]
    Statements(Vec<StatementError>),

    /// The proof's salt list does not line up with the normalized statements.
    #[error("{statements} normalized statement(s) but {salts} salt(s)")]
    SaltCount {
        /// Number of statements recomputed from the credential subject.
        statements: usize,
        /// Number of salts in the proof.
        salts: usize,
    },

    /// A recomputed commitment is not in the proof's commitment set.
    #[error("no commitment for statement {key} (digest {digest})")]
    MissingCommitment {
        /// Fully-qualified property key of the statement.
        key: String,
        /// Statement digest, `0x`-hex.
        digest: String,
    },

    /// The delegation hierarchy walk exceeded its hop bound.
    #[error("delegation hierarchy deeper than {0} nodes")]
    HierarchyTooDeep(usize),
}

/// A single failing statement in selective-disclosure verification.
///
/// Only the key and digest are carried; the statement value stays out of
/// error messages and logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    /// The nonce map has no entry for this statement's digest.
    #[error("no proof for statement {key} (digest {digest})")]
    NoProof {
        /// Fully-qualified property key.
        key: String,
        /// Statement digest, `0x`-hex.
        digest: String,
    },

    /// The salted hash is not a member of the claim hash list.
    #[error("invalid proof for statement {key} (digest {digest})")]
    InvalidProof {
        /// Fully-qualified property key.
        key: String,
        /// Statement digest, `0x`-hex.
        digest: String,
    },
}

fn join_causes(causes: &[StatementError]) -> String {
    causes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error decoding hex, base58 or fixed-length byte values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Hex strings in kcred always carry a `0x` prefix.
    #[error("hex value {0:?} is missing the 0x prefix")]
    MissingHexPrefix(String),

    /// The string is not valid hex.
    #[error("invalid hex {value:?}: {reason}")]
    InvalidHex {
        /// The offending input.
        value: String,
        /// Decoder message.
        reason: String,
    },

    /// The string is not valid base58 (bitcoin alphabet).
    #[error("invalid base58 {value:?}: {reason}")]
    InvalidBase58 {
        /// The offending input.
        value: String,
        /// Decoder message.
        reason: String,
    },

    /// Decoded bytes have the wrong length.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required byte length.
        expected: usize,
        /// Decoded byte length.
        actual: usize,
    },
}

/// Error during statement canonicalization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// The credential subject has no `@context.@vocab` to expand keys against.
    #[error("credential subject is missing @context.@vocab")]
    MissingVocabulary,

    /// Two credential-subject keys expand to the same property.
    #[error("credential subject keys {first:?} and {second:?} both expand to {expanded}")]
    DuplicateProperty {
        /// Fully-qualified property both keys map to.
        expanded: String,
        /// The key seen first.
        first: String,
        /// The colliding key.
        second: String,
    },
}

/// Error parsing a structured identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Not a `did:<method>:<id>` string.
    #[error("invalid DID {0:?}")]
    InvalidDid(String),

    /// Not a `kilt:ctype:0x<hash>` string.
    #[error("invalid CType id {0:?}")]
    InvalidCTypeId(String),

    /// Not a `kilt:credential:<base58>` string.
    #[error("invalid credential id {0:?}")]
    InvalidCredentialId(String),

    /// Not a `kilt:delegation/<base58>` string.
    #[error("invalid delegation id {0:?}")]
    InvalidDelegationId(String),

    /// Not a CAIP-2 chain id.
    #[error("invalid CAIP-2 chain id {value:?}: {reason}")]
    InvalidChainId {
        /// The offending input.
        value: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// Not a KILT attestation CAIP-19 asset id.
    #[error("invalid CAIP-19 asset id {value:?}: {reason}")]
    InvalidAssetId {
        /// The offending input.
        value: String,
        /// Which rule it broke.
        reason: &'static str,
    },

    /// The embedded hash or bytes failed to decode.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// A single structural-schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the validated document.
    pub instance_path: String,
    /// JSON pointer into the schema.
    pub schema_path: String,
    /// Validator message.
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let at = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{at}: {}", self.message)
    }
}

/// Structural schema validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The embedded schema itself failed to compile.
    #[error("schema {schema} failed to compile: {reason}")]
    Compile {
        /// Schema name.
        schema: &'static str,
        /// Compiler message.
        reason: String,
    },

    /// The document violates the schema.
    #[error("{schema} validation failed with {} violation(s): {}", .violations.len(), join_violations(.violations))]
    Invalid {
        /// Schema name.
        schema: &'static str,
        /// Every violation found.
        violations: Vec<SchemaViolation>,
    },
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A chain-client failure (transport, decoding of chain data).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("chain query failed: {0}")]
pub struct ChainError(pub String);
