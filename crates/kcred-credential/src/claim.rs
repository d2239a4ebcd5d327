//! # Claim
//!
//! A claim binds a set of property values to an owner DID under a CType.
//! Its statement list is the canonical input to the claim hasher.

use kcred_core::canonical::{expand_claim, statements};
use kcred_core::{CTypeId, CanonicalizationError, Did, Hash256, Statement};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ctype::CType;

/// Claim contents under a CType, owned by a DID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    c_type_hash: Hash256,
    contents: Map<String, Value>,
    owner: Did,
}

impl Claim {
    /// Build a claim for `owner` with the given contents.
    pub fn new(ctype: &CType, contents: Map<String, Value>, owner: Did) -> Self {
        Self::from_parts(ctype.hash(), contents, owner)
    }

    /// Build a claim from a raw CType hash.
    pub fn from_parts(c_type_hash: Hash256, contents: Map<String, Value>, owner: Did) -> Self {
        Self {
            c_type_hash,
            contents,
            owner,
        }
    }

    /// The CType hash.
    pub fn c_type_hash(&self) -> Hash256 {
        self.c_type_hash
    }

    /// The CType id.
    pub fn c_type_id(&self) -> CTypeId {
        CTypeId::from_hash(self.c_type_hash)
    }

    /// The claim contents.
    pub fn contents(&self) -> &Map<String, Value> {
        &self.contents
    }

    /// The claim owner.
    pub fn owner(&self) -> &Did {
        &self.owner
    }

    /// A copy of this claim without the given contents keys.
    ///
    /// Returns the first key that is not present, if any.
    pub(crate) fn without(&self, keys: &[&str]) -> Result<Self, String> {
        let mut contents = self.contents.clone();
        for key in keys {
            if contents.remove(*key).is_none() {
                return Err((*key).to_string());
            }
        }
        Ok(Self {
            contents,
            ..self.clone()
        })
    }

    /// The claim's canonical statements: the owner as `@id` plus one statement
    /// per contents key under the CType vocabulary.
    ///
    /// # Errors
    ///
    /// Propagates JCS serialization failures.
    pub fn statements(&self) -> Result<Vec<Statement>, CanonicalizationError> {
        let vocab = self.c_type_id().vocabulary();
        statements(&expand_claim(&vocab, Some(self.owner.as_str()), &self.contents))
    }
}
