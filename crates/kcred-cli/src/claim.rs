//! # Claim Subcommand
//!
//! Hashes claim contents under a CType into a credential: sorted salted
//! claim hashes, the nonce map and the root hash.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use kcred_core::{Did, Hash256};
use kcred_credential::{CType, Claim, Credential, NonceMap, NonceSource};

/// Arguments for the `kcred claim` subcommand.
#[derive(Args, Debug)]
pub struct ClaimArgs {
    #[command(subcommand)]
    pub command: ClaimCommand,
}

/// Claim subcommands.
#[derive(Subcommand, Debug)]
pub enum ClaimCommand {
    /// Hash a claim into a credential.
    Hash {
        /// CType JSON schema.
        #[arg(long, value_name = "FILE")]
        ctype: PathBuf,
        /// Claim contents, a JSON object with un-prefixed keys.
        #[arg(long, value_name = "FILE")]
        contents: PathBuf,
        /// Claim owner DID.
        #[arg(long)]
        owner: String,
        /// Fixed nonces, a JSON object from statement digest to nonce.
        #[arg(long, value_name = "FILE")]
        nonces: Option<PathBuf>,
        /// Legitimating credentials, in root-hash order.
        #[arg(long = "legitimation", value_name = "FILE")]
        legitimations: Vec<PathBuf>,
        /// Delegation node id, 0x-hex.
        #[arg(long)]
        delegation: Option<String>,
        /// Write the credential here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

/// Execute the claim subcommand.
pub fn run_claim(args: &ClaimArgs) -> Result<u8> {
    match &args.command {
        ClaimCommand::Hash {
            ctype,
            contents,
            owner,
            nonces,
            legitimations,
            delegation,
            out,
        } => {
            let credential = hash_claim(
                ctype,
                contents,
                owner,
                nonces.as_deref(),
                legitimations,
                delegation.as_deref(),
            )?;
            crate::write_json(&credential, out.as_deref())?;
            Ok(0)
        }
    }
}

/// Build a credential from files.
pub fn hash_claim(
    ctype: &Path,
    contents: &Path,
    owner: &str,
    nonces: Option<&Path>,
    legitimations: &[PathBuf],
    delegation: Option<&str>,
) -> Result<Credential> {
    let ctype = CType::from_schema(crate::read_json(ctype)?).context("failed to hash CType")?;
    let Some(contents) = crate::read_json(contents)?.as_object().cloned() else {
        bail!("claim contents must be a JSON object");
    };
    let owner = Did::parse(owner).context("invalid owner DID")?;
    let claim = Claim::new(&ctype, contents, owner);

    let fixed: Option<NonceMap> = nonces
        .map(|path| {
            serde_json::from_value(crate::read_json(path)?)
                .with_context(|| format!("invalid nonce map: {}", path.display()))
        })
        .transpose()?;
    let legitimations = legitimations
        .iter()
        .map(|path| {
            Credential::parse(&crate::read_json(path)?)
                .with_context(|| format!("invalid legitimation: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut builder = Credential::builder(claim).legitimations(legitimations);
    if let Some(delegation) = delegation {
        let node = Hash256::from_hex(delegation).context("invalid delegation id")?;
        builder = builder.delegation_id(node);
    }
    if let Some(fixed) = &fixed {
        builder = builder.nonces(NonceSource::Fixed(fixed));
    }
    let credential = builder.build().context("failed to hash claim")?;
    tracing::info!(root_hash = %credential.root_hash(), "claim hashed");
    Ok(credential)
}
