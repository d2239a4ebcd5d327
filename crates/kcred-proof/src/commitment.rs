//! # Commitment Scheme
//!
//! Anchors a credential subject to an on-chain attestation without putting
//! any claim value on chain.
//!
//! ## Construction
//!
//! 1. The expanded subject is canonicalized into statements, each paired with
//!    its digest, and sorted by ascending digest bytes. This order is the
//!    index space of the proof's `salt` list.
//! 2. Per statement, 36 bytes of entropy are drawn and
//!    `commitment = blake2b_256(entropy ‖ "0x" ‖ hex(digest))`.
//! 3. `salt[i]` is the base58 entropy of the i-th statement. The commitments
//!    are sorted by raw bytes on their own, so `commitments[i]` does **not**
//!    belong to `salt[i]`.
//! 4. `root = blake2b_256(commitments ++ trust-model inputs)`.
//!
//! ## Security Invariant
//!
//! Removing a statement removes its salt but never its commitment. The root
//! hash is a function of the full commitment set, so a derived proof
//! reproduces the same root as the original.

use kcred_core::canonical::{expand_subject, statements};
use kcred_core::{blake2b_256_concat, CanonicalizationError, Hash256, Statement};
use rand::RngCore;
use serde_json::{Map, Value};

/// Entropy bytes per statement.
pub const ENTROPY_LEN: usize = 36;

/// Per-statement entropy.
pub type Entropy = [u8; ENTROPY_LEN];

/// Canonical statements of a credential subject paired with their digests,
/// in ascending digest order.
///
/// # Errors
///
/// Returns [`CanonicalizationError::MissingVocabulary`] when the subject has
/// no `@context.@vocab`.
pub fn normalize_claims(subject: &Map<String, Value>) -> Result<Vec<(Statement, Hash256)>, CanonicalizationError> {
    let expanded = expand_subject(subject)?;
    let mut normalized: Vec<(Statement, Hash256)> = statements(&expanded)?
        .into_iter()
        .map(|statement| {
            let digest = statement.digest();
            (statement, digest)
        })
        .collect();
    normalized.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(normalized)
}

/// `blake2b_256(entropy ‖ "0x" ‖ lowercase hex of digest)`.
pub fn commitment(entropy: &Entropy, digest: &Hash256) -> Hash256 {
    blake2b_256_concat([entropy.as_slice(), digest.to_hex().as_bytes()])
}

/// Entropy per digest, in digest order, and the commitment set sorted by
/// raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitments {
    /// Entropy for each digest, same order as the input digests.
    pub salts: Vec<Entropy>,
    /// Commitments, ascending.
    pub commitments: Vec<Hash256>,
}

/// Draw entropy for every digest and commit to it.
pub fn commit<R: RngCore + ?Sized>(digests: &[Hash256], rng: &mut R) -> Commitments {
    let mut salts = Vec::with_capacity(digests.len());
    let mut commitments = Vec::with_capacity(digests.len());
    for digest in digests {
        let mut entropy = [0u8; ENTROPY_LEN];
        rng.fill_bytes(&mut entropy);
        commitments.push(commitment(&entropy, digest));
        salts.push(entropy);
    }
    commitments.sort();
    Commitments { salts, commitments }
}

/// Root hash over commitments (as given) followed by trust-model inputs.
pub fn calculate_root_hash<I>(commitments: &[Hash256], trust_inputs: I) -> Hash256
where
    I: IntoIterator<Item = Hash256>,
{
    let trust: Vec<Hash256> = trust_inputs.into_iter().collect();
    blake2b_256_concat(commitments.iter().chain(trust.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcred_core::blake2b_256;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn subject() -> Map<String, Value> {
        json!({
            "@context": {"@vocab": "kilt:ctype:0x01#"},
            "id": "did:kilt:4abc",
            "name": "Bob",
            "age": 29,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_normalized_claims_sorted_by_digest() {
        let normalized = normalize_claims(&subject()).unwrap();
        assert_eq!(normalized.len(), 3);
        assert!(normalized.windows(2).all(|w| w[0].1 < w[1].1));
        for (statement, digest) in &normalized {
            assert_eq!(statement.digest(), *digest);
        }
    }

    #[test]
    fn test_commitment_buffer_layout() {
        let entropy = [9u8; ENTROPY_LEN];
        let digest = blake2b_256(b"statement");
        let mut buffer = entropy.to_vec();
        buffer.extend_from_slice(digest.to_hex().as_bytes());
        assert_eq!(buffer.len(), 102);
        assert_eq!(&buffer[36..38], b"0x");
        assert_eq!(commitment(&entropy, &digest), blake2b_256(&buffer));
    }

    #[test]
    fn test_commitments_sorted_independently_of_salts() {
        let digests: Vec<Hash256> = normalize_claims(&subject())
            .unwrap()
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let committed = commit(&digests, &mut rng);
        assert_eq!(committed.salts.len(), digests.len());
        assert!(committed.commitments.windows(2).all(|w| w[0] <= w[1]));
        for (entropy, digest) in committed.salts.iter().zip(&digests) {
            assert!(committed.commitments.contains(&commitment(entropy, digest)));
        }
    }

    #[test]
    fn test_root_hash_appends_trust_inputs() {
        let commitments = vec![blake2b_256(b"a"), blake2b_256(b"b")];
        let legit = blake2b_256(b"legit");
        let root = calculate_root_hash(&commitments, [legit]);
        assert_eq!(root, blake2b_256_concat([commitments[0], commitments[1], legit]));
        assert_ne!(root, calculate_root_hash(&commitments, std::iter::empty::<Hash256>()));
    }

    #[test]
    fn test_missing_vocab_rejected() {
        let mut s = subject();
        s.remove("@context");
        assert!(normalize_claims(&s).is_err());
    }
}
