//! # Proof Subcommand
//!
//! Attestation proofs over `KiltCredentialV1`, against a JSON chain
//! snapshot (see `MemoryChain`).
//!
//! `issue` stands in for an attester: it records the attestation in the
//! snapshot at a synthetic block derived from the root hash and timestamp.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};

use kcred_core::{blake2b_256_concat, Did, Hash256, Timestamp};
use kcred_credential::CType;
use kcred_proof::{
    apply_selective_disclosure, check_status, finalize_proof, initialize_proof, parse_credential,
    parse_proof, verify, AttestationRecord, ChainClient, CredentialInput, FinalizeArgs,
    KiltCredentialV1, Legitimation, MemoryChain, VerifiedProof,
};

use crate::config::CliConfig;

/// Arguments for the `kcred proof` subcommand.
#[derive(Args, Debug)]
pub struct ProofArgs {
    #[command(subcommand)]
    pub command: ProofCommand,
}

/// Proof subcommands.
#[derive(Subcommand, Debug)]
pub enum ProofCommand {
    /// Build a credential, attest it in the snapshot and finalize its proof.
    Issue(IssueArgs),
    /// Keep only the given subject properties.
    Derive(DeriveArgs),
    /// Verify a credential's proof against the snapshot.
    Verify(VerifyArgs),
}

/// Arguments for `kcred proof issue`.
#[derive(Args, Debug, Clone)]
pub struct IssueArgs {
    /// CType JSON schema.
    #[arg(long, value_name = "FILE")]
    pub ctype: PathBuf,
    /// Claims, a JSON object with un-prefixed keys.
    #[arg(long, value_name = "FILE")]
    pub claims: PathBuf,
    /// Credential subject DID.
    #[arg(long)]
    pub subject: String,
    /// Attester DID.
    #[arg(long)]
    pub issuer: String,
    /// Legitimating credentials (finalized, with proof).
    #[arg(long = "legitimation", value_name = "FILE")]
    pub legitimations: Vec<PathBuf>,
    /// Delegation node id, 0x-hex.
    #[arg(long)]
    pub delegation: Option<String>,
    /// Chain snapshot; created if missing, updated in place.
    #[arg(long, value_name = "FILE")]
    pub chain: Option<PathBuf>,
    /// Genesis hash, 0x-hex, for a new snapshot.
    #[arg(long)]
    pub genesis: Option<String>,
    /// Block timestamp in Unix milliseconds (default: now).
    #[arg(long)]
    pub timestamp: Option<u64>,
    /// Write the credential here instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Arguments for `kcred proof derive`.
#[derive(Args, Debug, Clone)]
pub struct DeriveArgs {
    /// Credential with embedded proof.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Subject properties to disclose, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub disclose: Vec<String>,
    /// Write the derived credential here instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Arguments for `kcred proof verify`.
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Credential JSON.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Detached proof; defaults to the credential's embedded proof.
    #[arg(long, value_name = "FILE")]
    pub proof: Option<PathBuf>,
    /// Chain snapshot.
    #[arg(long, value_name = "FILE")]
    pub chain: Option<PathBuf>,
    /// Verification timeout in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
    /// Also check the current attestation status (revocation).
    #[arg(long)]
    pub status: bool,
}

/// Execute the proof subcommand.
pub fn run_proof(args: &ProofArgs, config: &CliConfig) -> Result<u8> {
    match &args.command {
        ProofCommand::Issue(issue_args) => {
            let credential = issue(issue_args, config)?;
            crate::write_json(&credential, issue_args.out.as_deref())?;
            Ok(0)
        }
        ProofCommand::Derive(derive_args) => {
            let derived = derive(derive_args)?;
            crate::write_json(&derived, derive_args.out.as_deref())?;
            Ok(0)
        }
        ProofCommand::Verify(verify_args) => {
            let verified = verify_presentation(verify_args, config)?;
            crate::write_json(&verified, None)?;
            Ok(0)
        }
    }
}

/// Issue a credential and record its attestation in the snapshot.
pub fn issue(args: &IssueArgs, config: &CliConfig) -> Result<KiltCredentialV1> {
    let config = config.clone().with_overrides(args.chain.as_deref(), None);
    let snapshot = config
        .chain_snapshot
        .as_deref()
        .ok_or_else(|| anyhow!("no chain snapshot: pass --chain or set KCRED_CHAIN_SNAPSHOT"))?;
    let mut chain = if snapshot.exists() {
        load_chain(snapshot)?
    } else {
        let Some(genesis) = &args.genesis else {
            bail!("snapshot {} does not exist; pass --genesis to create it", snapshot.display());
        };
        MemoryChain::new(*Hash256::from_hex(genesis).context("invalid genesis hash")?.as_bytes())
    };

    let ctype = CType::from_schema(crate::read_json(&args.ctype)?).context("failed to hash CType")?;
    let Some(claims) = crate::read_json(&args.claims)?.as_object().cloned() else {
        bail!("claims must be a JSON object");
    };
    let issuer = Did::parse(&args.issuer).context("invalid issuer DID")?;
    let legitimations = args
        .legitimations
        .iter()
        .map(|path| {
            parse_credential(&crate::read_json(path)?)
                .map(|vc| Legitimation::Credential(Box::new(vc)))
                .with_context(|| format!("invalid legitimation: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let delegation_id = args
        .delegation
        .as_deref()
        .map(Hash256::from_hex)
        .transpose()
        .context("invalid delegation id")?;

    let unfinalized = KiltCredentialV1::from_input(CredentialInput {
        subject: Did::parse(&args.subject).context("invalid subject DID")?,
        claims,
        c_type_hash: ctype.hash(),
        issuer: issuer.clone(),
        legitimations,
        delegation_id,
    })
    .context("failed to build credential")?;
    let (proof, attestation) =
        initialize_proof(&unfinalized, &mut rand::thread_rng()).context("failed to initialize proof")?;

    let timestamp = match args.timestamp {
        Some(ms) => ms,
        None => u64::try_from(Timestamp::now().millis()).context("system clock before 1970")?,
    };
    let timestamp_bytes = timestamp.to_be_bytes();
    let block_hash = blake2b_256_concat([
        attestation.root_hash.as_bytes().as_slice(),
        timestamp_bytes.as_slice(),
    ]);
    chain.record_attestation(
        block_hash,
        timestamp,
        AttestationRecord {
            claim_hash: attestation.root_hash,
            c_type_hash: attestation.c_type_hash,
            owner: issuer,
            delegation_id: attestation.authorization.map(|d| d.node_id()),
            revoked: false,
        },
    );
    let (credential, _) = finalize_proof(
        &unfinalized,
        &proof,
        FinalizeArgs {
            block_hash,
            timestamp,
            genesis_hash: chain.genesis_hash(),
        },
    )
    .context("failed to finalize proof")?;

    let rendered = serde_json::to_string_pretty(&chain).context("failed to serialize snapshot")?;
    std::fs::write(snapshot, rendered)
        .with_context(|| format!("failed to write snapshot: {}", snapshot.display()))?;
    tracing::info!(
        root_hash = %attestation.root_hash,
        block = %block_hash,
        snapshot = %snapshot.display(),
        "credential issued"
    );
    Ok(credential)
}

/// Selective disclosure on a credential file.
pub fn derive(args: &DeriveArgs) -> Result<KiltCredentialV1> {
    let credential = parse_credential(&crate::read_json(&args.file)?)
        .with_context(|| format!("invalid credential: {}", args.file.display()))?;
    let proof = credential
        .proof
        .as_ref()
        .ok_or_else(|| anyhow!("credential has no embedded proof"))?;
    let (derived, _) = apply_selective_disclosure(&credential, proof, &crate::as_strs(&args.disclose))
        .context("selective disclosure failed")?;
    Ok(derived)
}

/// Verify a credential file against the snapshot within the timeout.
pub fn verify_presentation(args: &VerifyArgs, config: &CliConfig) -> Result<VerifiedProof> {
    let config = config
        .clone()
        .with_overrides(args.chain.as_deref(), args.timeout);
    tracing::debug!(?config, "verifying presentation");
    let snapshot = config
        .chain_snapshot
        .as_deref()
        .ok_or_else(|| anyhow!("no chain snapshot: pass --chain or set KCRED_CHAIN_SNAPSHOT"))?;
    let chain = load_chain(snapshot)?;

    let credential = parse_credential(&crate::read_json(&args.file)?)
        .with_context(|| format!("invalid credential: {}", args.file.display()))?;
    let proof = match &args.proof {
        Some(path) => parse_proof(&crate::read_json(path)?)
            .with_context(|| format!("invalid proof: {}", path.display()))?,
        None => credential
            .proof
            .clone()
            .ok_or_else(|| anyhow!("credential has no embedded proof; pass --proof"))?,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(async {
        let checks = async {
            let verified = verify(&credential, &proof, &chain).await?;
            if args.status {
                check_status(&credential, &chain).await?;
            }
            Ok::<_, kcred_core::VerificationError>(verified)
        };
        tokio::time::timeout(config.verify_timeout, checks)
            .await
            .map_err(|_| {
                anyhow!(
                    "verification timed out after {}s",
                    config.verify_timeout.as_secs()
                )
            })?
            .context("proof verification failed")
    })
}

fn load_chain(path: &Path) -> Result<MemoryChain> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    MemoryChain::from_json(&content).with_context(|| format!("invalid snapshot: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        dir: tempfile::TempDir,
        config: CliConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(
                dir.path().join("ctype.json"),
                json!({
                    "title": "Person",
                    "properties": {"name": {"type": "string"}, "age": {"type": "integer"}},
                    "type": "object",
                })
                .to_string(),
            )
            .unwrap();
            std::fs::write(
                dir.path().join("claims.json"),
                json!({"name": "Bob", "age": 29}).to_string(),
            )
            .unwrap();
            let config = CliConfig::default().with_overrides(Some(&dir.path().join("chain.json")), None);
            Self { dir, config }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn issue_args(&self) -> IssueArgs {
            IssueArgs {
                ctype: self.path("ctype.json"),
                claims: self.path("claims.json"),
                subject: "did:kilt:4bob".into(),
                issuer: "did:kilt:4issuer".into(),
                legitimations: vec![],
                delegation: None,
                chain: None,
                genesis: Some(Hash256::from_bytes([5; 32]).to_hex()),
                timestamp: Some(1_700_000_000_250),
                out: Some(self.path("vc.json")),
            }
        }

        fn issue(&self) -> KiltCredentialV1 {
            let vc = issue(&self.issue_args(), &self.config).unwrap();
            crate::write_json(&vc, Some(&self.path("vc.json"))).unwrap();
            vc
        }

        fn verify_args(&self, file: &str) -> VerifyArgs {
            VerifyArgs {
                file: self.path(file),
                proof: None,
                chain: None,
                timeout: None,
                status: true,
            }
        }
    }

    #[test]
    fn issue_then_verify() {
        let fixture = Fixture::new();
        let vc = fixture.issue();
        assert!(fixture.path("chain.json").exists());

        let verified = verify_presentation(&fixture.verify_args("vc.json"), &fixture.config).unwrap();
        assert_eq!(Some(verified.root_hash), vc.id.map(|id| id.root_hash()));
        assert_eq!(verified.timestamp.millis(), 1_700_000_000_250);
    }

    #[test]
    fn derived_presentation_verifies() {
        let fixture = Fixture::new();
        fixture.issue();
        let derived = derive(&DeriveArgs {
            file: fixture.path("vc.json"),
            disclose: vec!["age".into()],
            out: None,
        })
        .unwrap();
        assert!(derived.credential_subject.get("name").is_none());
        crate::write_json(&derived, Some(&fixture.path("presentation.json"))).unwrap();

        verify_presentation(&fixture.verify_args("presentation.json"), &fixture.config).unwrap();
    }

    #[test]
    fn revoked_attestation_fails_status_check() {
        let fixture = Fixture::new();
        let vc = fixture.issue();
        let mut chain = load_chain(&fixture.path("chain.json")).unwrap();
        assert!(chain.revoke(&vc.root_hash().unwrap()));
        std::fs::write(fixture.path("chain.json"), serde_json::to_string(&chain).unwrap()).unwrap();

        let err = verify_presentation(&fixture.verify_args("vc.json"), &fixture.config).unwrap_err();
        assert!(format!("{err:#}").contains("revoked"));

        let mut without_status = fixture.verify_args("vc.json");
        without_status.status = false;
        verify_presentation(&without_status, &fixture.config).unwrap();
    }

    #[test]
    fn second_issue_reuses_snapshot() {
        let fixture = Fixture::new();
        let first = fixture.issue();
        let mut args = fixture.issue_args();
        args.genesis = None;
        args.timestamp = Some(1_700_000_100_000);
        let second = issue(&args, &fixture.config).unwrap();
        assert_ne!(first.id, second.id);

        let chain = load_chain(&fixture.path("chain.json")).unwrap();
        assert_eq!(chain.genesis_hash(), [5; 32]);
    }

    #[test]
    fn issue_without_snapshot_or_genesis_fails() {
        let fixture = Fixture::new();
        let mut args = fixture.issue_args();
        args.genesis = None;
        let err = issue(&args, &fixture.config).unwrap_err();
        assert!(err.to_string().contains("--genesis"));
    }

    #[test]
    fn verify_without_snapshot_fails() {
        let fixture = Fixture::new();
        fixture.issue();
        let err = verify_presentation(&fixture.verify_args("vc.json"), &CliConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no chain snapshot"));
    }
}
