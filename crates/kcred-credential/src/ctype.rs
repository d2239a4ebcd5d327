//! # CType — Claim Type Identity
//!
//! A CType is a JSON Schema describing claim contents. Its identity is the
//! Blake2b-256 hash of the schema's JCS serialization with the `$id` member
//! removed, so the id can be derived from the schema and then embedded in it.
//! Validating claim contents against the schema is out of scope here.

use kcred_core::{blake2b_256, CTypeId, CanonicalizationError, Hash256};
use serde_json::Value;

const SCHEMA_ID_KEY: &str = "$id";

/// A claim type: its schema and the hash that identifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct CType {
    schema: Value,
    hash: Hash256,
}

impl CType {
    /// Hash a schema. Any `$id` member is ignored for hashing and kept in
    /// [`CType::schema`] as given.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::SerializationFailed`] if JCS
    /// serialization fails.
    pub fn from_schema(schema: Value) -> Result<Self, CanonicalizationError> {
        let hash = ctype_hash(&schema)?;
        Ok(Self { schema, hash })
    }

    /// The CType hash.
    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// The CType id, `kilt:ctype:0x<hash>`.
    pub fn id(&self) -> CTypeId {
        CTypeId::from_hash(self.hash)
    }

    /// The schema as given.
    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

/// Hash a CType schema, ignoring `$id`.
///
/// # Errors
///
/// Returns [`CanonicalizationError::SerializationFailed`] if JCS
/// serialization fails.
pub fn ctype_hash(schema: &Value) -> Result<Hash256, CanonicalizationError> {
    let bytes = match schema {
        Value::Object(map) if map.contains_key(SCHEMA_ID_KEY) => {
            let mut without_id = map.clone();
            without_id.remove(SCHEMA_ID_KEY);
            serde_jcs::to_vec(&Value::Object(without_id))?
        }
        other => serde_jcs::to_vec(other)?,
    };
    Ok(blake2b_256(&bytes))
}
