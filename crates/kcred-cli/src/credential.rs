//! # Credential Subcommand
//!
//! Integrity checks and property removal on salted-hash credentials.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use kcred_credential::Credential;

/// Arguments for the `kcred credential` subcommand.
#[derive(Args, Debug)]
pub struct CredentialArgs {
    #[command(subcommand)]
    pub command: CredentialCommand,
}

/// Credential subcommands.
#[derive(Subcommand, Debug)]
pub enum CredentialCommand {
    /// Check structure, root hash and every disclosed statement.
    Verify {
        /// Credential JSON.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Remove claim properties, keeping the root hash.
    Reduce {
        /// Credential JSON.
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Properties to remove, comma separated.
        #[arg(long, value_delimiter = ',', required = true)]
        remove: Vec<String>,
        /// Write the reduced credential here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

/// Execute the credential subcommand.
pub fn run_credential(args: &CredentialArgs) -> Result<u8> {
    match &args.command {
        CredentialCommand::Verify { file } => {
            let credential = verify_file(file)?;
            println!("OK: credential root hash {}", credential.root_hash());
            Ok(0)
        }
        CredentialCommand::Reduce { file, remove, out } => {
            let reduced = reduce_file(file, &crate::as_strs(remove))?;
            crate::write_json(&reduced, out.as_deref())?;
            Ok(0)
        }
    }
}

/// Parse a credential file and check its integrity.
pub fn verify_file(path: &Path) -> Result<Credential> {
    let credential = Credential::parse(&crate::read_json(path)?)
        .with_context(|| format!("invalid credential: {}", path.display()))?;
    credential
        .verify_data_integrity()
        .with_context(|| format!("credential integrity check failed: {}", path.display()))?;
    Ok(credential)
}

/// Parse, check and reduce a credential file.
pub fn reduce_file(path: &Path, remove: &[&str]) -> Result<Credential> {
    let credential = verify_file(path)?;
    let reduced = credential
        .remove_claim_properties(remove)
        .context("failed to remove claim properties")?;
    tracing::info!(
        root_hash = %reduced.root_hash(),
        removed = remove.len(),
        "credential reduced"
    );
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcred_core::Did;
    use kcred_credential::{CType, Claim};
    use serde_json::json;

    fn write_credential(dir: &Path) -> PathBuf {
        let ctype = CType::from_schema(json!({
            "title": "Person",
            "properties": {"name": {"type": "string"}, "age": {"type": "integer"}},
            "type": "object",
        }))
        .unwrap();
        let claim = Claim::new(
            &ctype,
            json!({"name": "Bob", "age": 29}).as_object().cloned().unwrap(),
            Did::parse("did:kilt:4bob").unwrap(),
        );
        let credential = Credential::from_claim(claim).unwrap();
        let path = dir.join("credential.json");
        crate::write_json(&credential, Some(&path)).unwrap();
        path
    }

    #[test]
    fn verify_accepts_untouched_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credential(dir.path());
        verify_file(&path).unwrap();
    }

    #[test]
    fn verify_rejects_edited_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credential(dir.path());
        let mut json = crate::read_json(&path).unwrap();
        json["claim"]["contents"]["age"] = json!(30);
        crate::write_json(&json, Some(&path)).unwrap();

        let err = verify_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("integrity check failed"));
    }

    #[test]
    fn reduce_keeps_root_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credential(dir.path());
        let full = verify_file(&path).unwrap();
        let reduced = reduce_file(&path, &["age"]).unwrap();
        assert_eq!(reduced.root_hash(), full.root_hash());
        assert!(reduced.claim().contents().get("age").is_none());
    }

    #[test]
    fn reduce_rejects_unknown_property() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credential(dir.path());
        assert!(reduce_file(&path, &["email"]).is_err());
    }
}
