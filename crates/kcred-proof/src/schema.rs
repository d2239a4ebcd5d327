//! # Structural Validation
//!
//! JSON Schema (Draft 2020-12) checks run before deserialization, so callers
//! get every structural violation at once instead of the first serde error.
//! Schemas are embedded at compile time and compiled once per process.

use std::sync::OnceLock;

use jsonschema::{Draft, Validator};
use kcred_core::{SchemaError, SchemaViolation};
use serde_json::Value;

const PROOF_SCHEMA_NAME: &str = "kilt-attestation-proof-v1.schema.json";
const CREDENTIAL_SCHEMA_NAME: &str = "kilt-credential-v1.schema.json";

const PROOF_SCHEMA: &str = include_str!("../schemas/kilt-attestation-proof-v1.schema.json");
const CREDENTIAL_SCHEMA: &str = include_str!("../schemas/kilt-credential-v1.schema.json");

static PROOF_VALIDATOR: OnceLock<Result<Validator, SchemaError>> = OnceLock::new();
static CREDENTIAL_VALIDATOR: OnceLock<Result<Validator, SchemaError>> = OnceLock::new();

fn compile(name: &'static str, source: &str) -> Result<Validator, SchemaError> {
    let schema: Value = serde_json::from_str(source).map_err(|e| SchemaError::Compile {
        schema: name,
        reason: e.to_string(),
    })?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|e| SchemaError::Compile {
            schema: name,
            reason: e.to_string(),
        })
}

fn validate(
    cell: &'static OnceLock<Result<Validator, SchemaError>>,
    name: &'static str,
    source: &str,
    value: &Value,
) -> Result<(), SchemaError> {
    let validator = cell
        .get_or_init(|| compile(name, source))
        .as_ref()
        .map_err(Clone::clone)?;
    let violations: Vec<SchemaViolation> = validator
        .iter_errors(value)
        .map(|err| SchemaViolation {
            instance_path: err.instance_path.to_string(),
            schema_path: err.schema_path.to_string(),
            message: err.to_string(),
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Invalid {
            schema: name,
            violations,
        })
    }
}

/// Validate a `KiltAttestationProofV1` document.
///
/// # Errors
///
/// [`SchemaError::Invalid`] with every violation found.
pub fn validate_proof(value: &Value) -> Result<(), SchemaError> {
    validate(&PROOF_VALIDATOR, PROOF_SCHEMA_NAME, PROOF_SCHEMA, value)
}

/// Validate a `KiltCredentialV1` document, including its embedded proof.
///
/// # Errors
///
/// [`SchemaError::Invalid`] with every violation found.
pub fn validate_credential(value: &Value) -> Result<(), SchemaError> {
    validate(&CREDENTIAL_VALIDATOR, CREDENTIAL_SCHEMA_NAME, CREDENTIAL_SCHEMA, value)?;
    match value.get("proof") {
        Some(proof) => validate_proof(proof),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proof() -> Value {
        json!({
            "type": "KiltAttestationProofV1",
            "block": "",
            "commitments": ["3yZe7d"],
            "salt": ["4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi"],
        })
    }

    #[test]
    fn test_embedded_schemas_compile() {
        assert!(compile(PROOF_SCHEMA_NAME, PROOF_SCHEMA).is_ok());
        assert!(compile(CREDENTIAL_SCHEMA_NAME, CREDENTIAL_SCHEMA).is_ok());
    }

    #[test]
    fn test_valid_proof_passes() {
        validate_proof(&proof()).unwrap();
    }

    #[test]
    fn test_all_violations_reported() {
        let err = validate_proof(&json!({"type": "Other", "commitments": "x"})).unwrap_err();
        match err {
            SchemaError::Invalid { schema, violations } => {
                assert_eq!(schema, PROOF_SCHEMA_NAME);
                // wrong type const, commitments not an array, block and salt missing
                assert!(violations.len() >= 3, "{violations:?}");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_credential_with_bad_embedded_proof_rejected() {
        let credential = json!({
            "@context": [
                "https://www.w3.org/2018/credentials/v1",
                "https://www.kilt.io/contexts/credentials",
            ],
            "type": ["VerifiableCredential", "KiltCredentialV1"],
            "credentialSubject": {
                "@context": {"@vocab": "kilt:ctype:0x01#"},
                "id": "did:kilt:4abc",
            },
            "credentialSchema": {
                "id": format!("kilt:ctype:0x{}", "ab".repeat(32)),
                "type": "JsonSchema2023",
            },
            "issuer": "did:kilt:4issuer",
            "nonTransferable": true,
            "proof": {"type": "KiltAttestationProofV1", "block": ""},
        });
        let err = validate_credential(&credential).unwrap_err();
        assert!(err.to_string().contains(PROOF_SCHEMA_NAME));
    }
}
