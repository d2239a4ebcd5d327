//! # Statement Canonicalization
//!
//! This module defines [`Statement`], the sole construction path for bytes
//! that are hashed as claim statements.
//!
//! ## Security Invariant
//!
//! The `Statement` newtype has private fields. The only way to construct one
//! is [`Statement::new`], which serializes a single-key JSON object with
//! RFC 8785 (JCS) and then applies Unicode NFC normalization. Any function
//! that hashes claim material accepts `&Statement`, so a digest can never be
//! computed over non-canonical bytes.
//!
//! ## Key Expansion
//!
//! Statements are keyed by fully-qualified property names:
//!
//! 1. **Claim path**: the owner DID becomes the `@id` statement and every
//!    content key `k` becomes `<vocab>k`, where the vocabulary is the CType
//!    id followed by `#`.
//! 2. **Credential-subject path**: the vocabulary is read from
//!    `@context.@vocab`; `id`/`@id` expand to `@id`, `type`/`@type` expand to
//!    `@type`, every other key expands to `<vocab>k`. `@context` itself is
//!    never a statement. Two keys expanding to the same name are an error.
//!
//! The expanded claim is a `BTreeMap`, so the statement list is independent
//! of the insertion order of the input map.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::digest::{blake2b_256, Hash256};
use crate::error::CanonicalizationError;

/// JSON-LD identity key.
pub const ID_KEY: &str = "@id";
/// JSON-LD type key.
pub const TYPE_KEY: &str = "@type";
/// JSON-LD context key.
pub const CONTEXT_KEY: &str = "@context";
/// JSON-LD vocabulary key inside `@context`.
pub const VOCAB_KEY: &str = "@vocab";

/// Claim contents keyed by fully-qualified property name.
pub type ExpandedClaim = BTreeMap<String, Value>;

/// A canonical single-property statement.
///
/// # Invariants
///
/// - `text` is the JCS serialization of `{ key: value }`, NFC-normalized.
/// - `key` is the fully-qualified property name the statement was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    key: String,
    text: String,
}

impl Statement {
    /// Canonicalize one property.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::SerializationFailed`] if JCS
    /// serialization fails.
    pub fn new(key: &str, value: &Value) -> Result<Self, CanonicalizationError> {
        let mut object = Map::with_capacity(1);
        object.insert(key.to_string(), value.clone());
        let jcs = serde_jcs::to_string(&Value::Object(object))?;
        Ok(Self {
            key: key.to_string(),
            text: jcs.nfc().collect(),
        })
    }

    /// The fully-qualified property key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The canonical statement text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The canonical statement bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Blake2b-256 of the statement bytes.
    pub fn digest(&self) -> Hash256 {
        blake2b_256(self.as_bytes())
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Expand claim contents against a CType vocabulary.
///
/// `owner` becomes the `@id` entry when present.
pub fn expand_claim(vocab: &str, owner: Option<&str>, contents: &Map<String, Value>) -> ExpandedClaim {
    let mut expanded: ExpandedClaim = contents
        .iter()
        .map(|(k, v)| (format!("{vocab}{k}"), v.clone()))
        .collect();
    if let Some(owner) = owner {
        expanded.insert(ID_KEY.to_string(), Value::String(owner.to_string()));
    }
    expanded
}

/// Read `@context.@vocab` from a credential subject.
///
/// # Errors
///
/// Returns [`CanonicalizationError::MissingVocabulary`] when the context is
/// absent, not an object, or has no string `@vocab`.
pub fn subject_vocabulary(subject: &Map<String, Value>) -> Result<&str, CanonicalizationError> {
    subject
        .get(CONTEXT_KEY)
        .and_then(Value::as_object)
        .and_then(|ctx| ctx.get(VOCAB_KEY))
        .and_then(Value::as_str)
        .ok_or(CanonicalizationError::MissingVocabulary)
}

/// Fully-qualified name of a credential-subject key.
///
/// Returns `None` for `@context`, which never becomes a statement.
pub fn expand_subject_key(vocab: &str, key: &str) -> Option<String> {
    match key {
        CONTEXT_KEY => None,
        "id" | ID_KEY => Some(ID_KEY.to_string()),
        "type" | TYPE_KEY => Some(TYPE_KEY.to_string()),
        other => Some(format!("{vocab}{other}")),
    }
}

/// Expand a credential subject into fully-qualified properties.
///
/// # Errors
///
/// Returns [`CanonicalizationError::MissingVocabulary`] when the subject has
/// no `@context.@vocab`, and [`CanonicalizationError::DuplicateProperty`]
/// when two keys expand to the same property (`id` beside `@id`, `type`
/// beside `@type`).
pub fn expand_subject(subject: &Map<String, Value>) -> Result<ExpandedClaim, CanonicalizationError> {
    let vocab = subject_vocabulary(subject)?;
    let mut expanded = ExpandedClaim::new();
    let mut sources: BTreeMap<String, &str> = BTreeMap::new();
    for (key, value) in subject {
        let Some(fq) = expand_subject_key(vocab, key) else {
            continue;
        };
        if let Some(first) = sources.insert(fq.clone(), key) {
            return Err(CanonicalizationError::DuplicateProperty {
                expanded: fq,
                first: first.to_string(),
                second: key.clone(),
            });
        }
        expanded.insert(fq, value.clone());
    }
    Ok(expanded)
}

/// Canonicalize every property of an expanded claim, in key order.
///
/// # Errors
///
/// Propagates the first serialization failure.
pub fn statements(expanded: &ExpandedClaim) -> Result<Vec<Statement>, CanonicalizationError> {
    expanded.iter().map(|(k, v)| Statement::new(k, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!("test input is an object"),
        }
    }

    #[test]
    fn test_statement_is_single_key_jcs() {
        let s = Statement::new("kilt:ctype:0x01#name", &json!("Bob")).unwrap();
        assert_eq!(s.as_str(), r#"{"kilt:ctype:0x01#name":"Bob"}"#);
        assert_eq!(s.key(), "kilt:ctype:0x01#name");
    }

    #[test]
    fn test_nested_keys_sorted() {
        let s = Statement::new("k", &json!({"z": 1, "a": {"y": true, "b": null}})).unwrap();
        assert_eq!(s.as_str(), r#"{"k":{"a":{"b":null,"y":true},"z":1}}"#);
    }

    #[test]
    fn test_arrays_keep_order() {
        let s = Statement::new("k", &json!([3, 1, 2])).unwrap();
        assert_eq!(s.as_str(), r#"{"k":[3,1,2]}"#);
    }

    #[test]
    fn test_floats_use_ecmascript_formatting() {
        let s = Statement::new("k", &json!(1.5)).unwrap();
        assert_eq!(s.as_str(), r#"{"k":1.5}"#);
        let whole = Statement::new("k", &json!(26)).unwrap();
        assert_eq!(whole.as_str(), r#"{"k":26}"#);
    }

    #[test]
    fn test_nfc_normalization() {
        // "e" + combining acute accent composes to U+00E9.
        let decomposed = Statement::new("k", &json!("e\u{0301}")).unwrap();
        let composed = Statement::new("k", &json!("\u{00e9}")).unwrap();
        assert_eq!(decomposed.as_bytes(), composed.as_bytes());
        assert_eq!(decomposed.digest(), composed.digest());
    }

    #[test]
    fn test_expand_claim_prefixes_and_adds_owner() {
        let contents = obj(json!({"name": "Bob", "age": 29}));
        let expanded = expand_claim("kilt:ctype:0x01#", Some("did:kilt:4abc"), &contents);
        let keys: Vec<&str> = expanded.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["@id", "kilt:ctype:0x01#age", "kilt:ctype:0x01#name"]);
        assert_eq!(expanded["@id"], json!("did:kilt:4abc"));
    }

    #[test]
    fn test_expand_subject_aliases() {
        let subject = obj(json!({
            "@context": {"@vocab": "kilt:ctype:0x01#"},
            "id": "did:kilt:4abc",
            "type": "Person",
            "name": "Bob",
        }));
        let expanded = expand_subject(&subject).unwrap();
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded["@id"], json!("did:kilt:4abc"));
        assert_eq!(expanded["@type"], json!("Person"));
        assert_eq!(expanded["kilt:ctype:0x01#name"], json!("Bob"));
    }

    #[test]
    fn test_expand_subject_requires_vocab() {
        let subject = obj(json!({"id": "did:kilt:4abc", "name": "Bob"}));
        assert!(matches!(
            expand_subject(&subject),
            Err(CanonicalizationError::MissingVocabulary)
        ));
        let no_vocab = obj(json!({"@context": {}, "name": "Bob"}));
        assert!(expand_subject(&no_vocab).is_err());
    }

    #[test]
    fn test_expand_subject_rejects_alias_collisions() {
        for (alias, canonical) in [("@id", "id"), ("@type", "type")] {
            let mut subject = obj(json!({
                "@context": {"@vocab": "kilt:ctype:0x01#"},
                "name": "Bob",
            }));
            subject.insert(canonical.to_string(), json!("did:kilt:4abc"));
            subject.insert(alias.to_string(), json!("did:kilt:4other"));
            match expand_subject(&subject) {
                Err(CanonicalizationError::DuplicateProperty { expanded, .. }) => {
                    assert_eq!(expanded, alias);
                }
                other => panic!("expected collision on {alias}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_context_key_never_expands() {
        assert_eq!(expand_subject_key("v#", "@context"), None);
        assert_eq!(expand_subject_key("v#", "@id").as_deref(), Some("@id"));
        assert_eq!(expand_subject_key("v#", "x").as_deref(), Some("v#x"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_leaf() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(|n| json!(n)),
                "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
            ]
        }

        proptest! {
            #[test]
            fn statements_independent_of_insertion_order(
                entries in prop::collection::btree_map("[a-z]{1,8}", arb_leaf(), 1..8)
            ) {
                let forward: Map<String, Value> = entries.clone().into_iter().collect();
                let reversed: Map<String, Value> = entries.into_iter().rev().collect();
                let a = statements(&expand_claim("v#", Some("did:kilt:x"), &forward)).unwrap();
                let b = statements(&expand_claim("v#", Some("did:kilt:x"), &reversed)).unwrap();
                prop_assert_eq!(a, b);
            }

            #[test]
            fn statement_digest_deterministic(key in "[a-z]{1,8}", value in arb_leaf()) {
                let a = Statement::new(&key, &value).unwrap();
                let b = Statement::new(&key, &value).unwrap();
                prop_assert_eq!(a.digest(), b.digest());
                let parsed: Value = serde_json::from_str(a.as_str()).unwrap();
                prop_assert_eq!(parsed.as_object().map(Map::len), Some(1));
            }
        }
    }
}
