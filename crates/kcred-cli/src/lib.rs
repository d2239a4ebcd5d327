//! # kcred-cli — Command-Line Interface
//!
//! Provides the `kcred` binary.
//!
//! ## Subcommands
//!
//! - `kcred claim hash` — hash a claim into a credential with nonces and
//!   root hash.
//! - `kcred credential verify` — data-structure and data-integrity checks.
//! - `kcred credential reduce` — remove claim properties.
//! - `kcred proof issue` — build, attest (into a chain snapshot) and
//!   finalize a `KiltCredentialV1`.
//! - `kcred proof derive` — selective disclosure on a credential.
//! - `kcred proof verify` — verify a credential's proof against a snapshot.
//!
//! ```bash
//! kcred claim hash --ctype person.json --contents claim.json --owner did:kilt:4abc
//! kcred proof derive vc.json --disclose name,email
//! KCRED_CHAIN_SNAPSHOT=chain.json kcred proof verify presentation.json --status
//! ```
//!
//! Commands print JSON to stdout (or `--out`) and return a process exit
//! code; failures are `anyhow` errors with context.

pub mod claim;
pub mod config;
pub mod credential;
pub mod proof;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse JSON: {}", path.display()))
}

/// Pretty-print `value` to `out`, or stdout when `out` is `None`.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match out {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("failed to write file: {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Borrow a list of owned strings as `&str`s.
pub(crate) fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
