//! # Claim Hasher and Selective Disclosure Verifier
//!
//! Each canonical statement gets a nonce. The nonce map records
//! `digest -> nonce`; the published hash list holds
//! `blake2b_256(nonce ++ statement)` for every statement, sorted ascending.
//!
//! ## Security Invariant
//!
//! Reusing a nonce map reproduces the exact salted hashes it was created
//! with. A holder discloses a subset of statements by shipping only their
//! nonce-map entries; the verifier replays the salted hash of every disclosed
//! statement and requires membership in the full hash list.

use std::collections::BTreeMap;

use kcred_core::{blake2b_256_concat, Hash256, Statement, StatementError, Unverifiable, VerificationError};
use uuid::Uuid;

use crate::claim::Claim;

/// Statement digest to nonce.
pub type NonceMap = BTreeMap<Hash256, String>;

/// Where statement nonces come from.
#[derive(Clone, Copy)]
pub enum NonceSource<'a> {
    /// A fresh UUIDv4 string per statement.
    Generate,
    /// An existing nonce map. A statement without an entry is an error.
    Fixed(&'a NonceMap),
    /// A caller-supplied generator, keyed by statement digest.
    Custom(&'a dyn Fn(&Hash256) -> String),
}

impl std::fmt::Debug for NonceSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => f.write_str("Generate"),
            Self::Fixed(map) => write!(f, "Fixed({} entries)", map.len()),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl NonceSource<'_> {
    fn nonce_for(&self, statement: &Statement, digest: &Hash256) -> Result<String, StatementError> {
        match self {
            Self::Generate => Ok(Uuid::new_v4().to_string()),
            Self::Fixed(map) => map.get(digest).cloned().ok_or_else(|| StatementError::NoProof {
                key: statement.key().to_string(),
                digest: digest.to_hex(),
            }),
            Self::Custom(generate) => Ok(generate(digest)),
        }
    }
}

/// Output of hashing a statement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedStatements {
    /// Salted hashes, ascending.
    pub hashes: Vec<Hash256>,
    /// Digest to nonce for every hashed statement.
    pub nonce_map: NonceMap,
}

/// `blake2b_256(nonce ++ statement)`.
pub fn salted_hash(nonce: &str, statement: &Statement) -> Hash256 {
    blake2b_256_concat([nonce.as_bytes(), statement.as_bytes()])
}

/// Salt and hash every statement.
///
/// # Errors
///
/// With [`NonceSource::Fixed`], returns [`StatementError::NoProof`] for the
/// first statement whose digest has no nonce.
pub fn hash_statements(
    statements: &[Statement],
    nonces: NonceSource<'_>,
) -> Result<HashedStatements, StatementError> {
    let mut hashes = Vec::with_capacity(statements.len());
    let mut nonce_map = NonceMap::new();
    for statement in statements {
        let digest = statement.digest();
        let nonce = nonces.nonce_for(statement, &digest)?;
        hashes.push(salted_hash(&nonce, statement));
        nonce_map.insert(digest, nonce);
    }
    hashes.sort();
    Ok(HashedStatements { hashes, nonce_map })
}

/// Canonicalize and hash a claim.
///
/// # Errors
///
/// Canonicalization failures map to [`VerificationError::Structure`]; a
/// missing fixed nonce maps to [`VerificationError::Unverifiable`].
pub fn hash_claim_contents(claim: &Claim, nonces: NonceSource<'_>) -> Result<HashedStatements, VerificationError> {
    let statements = claim.statements()?;
    Ok(hash_statements(&statements, nonces)?)
}

/// Verify that every statement of a (partial) claim is covered by `nonces`
/// and that its salted hash is a member of `hashes`.
///
/// All failing statements are collected into a single error.
///
/// # Errors
///
/// Returns [`Unverifiable::Statements`] listing every failing statement.
pub fn verify_disclosed_attributes(
    claim: &Claim,
    nonces: &NonceMap,
    hashes: &[Hash256],
) -> Result<(), VerificationError> {
    let statements = claim.statements()?;
    let mut causes = Vec::new();
    for statement in &statements {
        let digest = statement.digest();
        let Some(nonce) = nonces.get(&digest) else {
            causes.push(StatementError::NoProof {
                key: statement.key().to_string(),
                digest: digest.to_hex(),
            });
            continue;
        };
        if !hashes.contains(&salted_hash(nonce, statement)) {
            causes.push(StatementError::InvalidProof {
                key: statement.key().to_string(),
                digest: digest.to_hex(),
            });
        }
    }
    if causes.is_empty() {
        Ok(())
    } else {
        tracing::debug!(failures = causes.len(), "disclosed attributes not verifiable");
        Err(Unverifiable::Statements(causes).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcred_core::Did;
    use serde_json::json;

    fn claim() -> Claim {
        Claim::from_parts(
            kcred_core::blake2b_256(b"ctype"),
            json!({"name": "Bob", "age": 29}).as_object().cloned().unwrap(),
            Did::parse("did:kilt:4abc").unwrap(),
        )
    }

    #[test]
    fn test_generated_nonces_are_uuids() {
        let hashed = hash_claim_contents(&claim(), NonceSource::Generate).unwrap();
        assert_eq!(hashed.hashes.len(), 3);
        assert_eq!(hashed.nonce_map.len(), 3);
        for nonce in hashed.nonce_map.values() {
            assert!(Uuid::parse_str(nonce).is_ok());
        }
        assert!(hashed.hashes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_fixed_nonces_reproduce_hashes() {
        let first = hash_claim_contents(&claim(), NonceSource::Generate).unwrap();
        let second = hash_claim_contents(&claim(), NonceSource::Fixed(&first.nonce_map)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixed_nonces_missing_entry() {
        let empty = NonceMap::new();
        let err = hash_claim_contents(&claim(), NonceSource::Fixed(&empty)).unwrap_err();
        assert!(err.to_string().contains("no proof for statement"));
    }

    #[test]
    fn test_custom_generator_keyed_by_digest() {
        let generator = |digest: &Hash256| format!("nonce-{}", &digest.to_hex()[2..10]);
        let hashed = hash_claim_contents(&claim(), NonceSource::Custom(&generator)).unwrap();
        for (digest, nonce) in &hashed.nonce_map {
            assert_eq!(nonce, &generator(digest));
        }
    }

    #[test]
    fn test_verify_disclosed_collects_every_failure() {
        let hashed = hash_claim_contents(&claim(), NonceSource::Generate).unwrap();
        assert!(verify_disclosed_attributes(&claim(), &hashed.nonce_map, &hashed.hashes).is_ok());

        let mut tampered = hashed.nonce_map.clone();
        for nonce in tampered.values_mut() {
            nonce.push('x');
        }
        let err = verify_disclosed_attributes(&claim(), &tampered, &hashed.hashes).unwrap_err();
        match err {
            VerificationError::Unverifiable(Unverifiable::Statements(causes)) => {
                assert_eq!(causes.len(), 3);
                assert!(causes
                    .iter()
                    .all(|c| matches!(c, StatementError::InvalidProof { .. })));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_errors_do_not_leak_values() {
        let hashed = hash_claim_contents(&claim(), NonceSource::Generate).unwrap();
        let err = verify_disclosed_attributes(&claim(), &NonceMap::new(), &hashed.hashes).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("#name"));
        assert!(!msg.contains("Bob"));
    }
}
