//! # kcred CLI entry point
//!
//! Parses command-line arguments, loads environment configuration and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kcred_cli::claim::{run_claim, ClaimArgs};
use kcred_cli::config::CliConfig;
use kcred_cli::credential::{run_credential, CredentialArgs};
use kcred_cli::proof::{run_proof, ProofArgs};

/// kcred: claim commitments, selective disclosure and attestation proofs.
///
/// Hashes claims into credentials, reduces them for presentation, and
/// issues and verifies KiltAttestationProofV1 proofs against a chain
/// snapshot.
#[derive(Parser, Debug)]
#[command(name = "kcred", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Salted claim hashing.
    Claim(ClaimArgs),

    /// Integrity checks and property removal on hashed credentials.
    Credential(CredentialArgs),

    /// Attestation proof issuance, disclosure and verification.
    Proof(ProofArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(?config, "kcred CLI starting");

    let result = match cli.command {
        Commands::Claim(args) => run_claim(&args),
        Commands::Credential(args) => run_credential(&args),
        Commands::Proof(args) => run_proof(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_disclosure_list() {
        let cli = Cli::try_parse_from(["kcred", "-vv", "proof", "derive", "vc.json", "--disclose", "name,age"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Proof(ProofArgs {
                command: kcred_cli::proof::ProofCommand::Derive(args),
            }) => assert_eq!(args.disclose, vec!["name", "age"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Cli::try_parse_from(["kcred", "proof", "verify", "vc.json", "--timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Cli::try_parse_from(["kcred", "proof", "verify", "vc.json", "--timeout", "1"]).is_ok());
    }

    #[test]
    fn reduce_requires_properties() {
        assert!(Cli::try_parse_from(["kcred", "credential", "reduce", "c.json"]).is_err());
    }

    #[test]
    fn verify_flags_parse() {
        let cli = Cli::try_parse_from([
            "kcred", "proof", "verify", "vc.json", "--chain", "chain.json", "--timeout", "3", "--status",
        ])
        .unwrap();
        match cli.command {
            Commands::Proof(ProofArgs {
                command: kcred_cli::proof::ProofCommand::Verify(args),
            }) => {
                assert_eq!(args.timeout, Some(3));
                assert!(args.status);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
