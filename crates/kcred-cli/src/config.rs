//! CLI configuration from the environment.
//!
//! Flags override these values; see [`CliConfig::with_overrides`].

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time limit for `proof verify`.
pub const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 30;

/// Settings shared by all subcommands.
#[derive(Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Chain snapshot used by proof commands when `--chain` is absent.
    pub chain_snapshot: Option<PathBuf>,
    /// Upper bound on one verification including chain queries.
    pub verify_timeout: Duration,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field(
                "chain_snapshot",
                &self
                    .chain_snapshot
                    .as_deref()
                    .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            )
            .field("verify_timeout_secs", &self.verify_timeout.as_secs())
            .finish()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            chain_snapshot: None,
            verify_timeout: Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `KCRED_CHAIN_SNAPSHOT` (default: unset)
    /// - `KCRED_VERIFY_TIMEOUT_SECS` (default: 30, must be positive)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] for a non-numeric or zero
    /// timeout.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// See [`CliConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let chain_snapshot = lookup("KCRED_CHAIN_SNAPSHOT")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let verify_timeout = match lookup("KCRED_VERIFY_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs(DEFAULT_VERIFY_TIMEOUT_SECS),
        };
        Ok(Self {
            chain_snapshot,
            verify_timeout,
        })
    }

    /// Apply command-line flags on top of the environment.
    ///
    /// The `--timeout` flag only accepts positive values; a zero
    /// `timeout_secs` keeps the configured timeout.
    pub fn with_overrides(mut self, chain: Option<&Path>, timeout_secs: Option<u64>) -> Self {
        if let Some(chain) = chain {
            self.chain_snapshot = Some(chain.to_path_buf());
        }
        if let Some(secs) = timeout_secs.filter(|s| *s > 0) {
            self.verify_timeout = Duration::from_secs(secs);
        }
        self
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `KCRED_VERIFY_TIMEOUT_SECS` is not a positive integer.
    #[error("KCRED_VERIFY_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = CliConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, CliConfig::default());
        assert_eq!(cfg.verify_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_snapshot_and_timeout() {
        let cfg = CliConfig::from_lookup(lookup(&[
            ("KCRED_CHAIN_SNAPSHOT", "/tmp/chain.json"),
            ("KCRED_VERIFY_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.chain_snapshot, Some(PathBuf::from("/tmp/chain.json")));
        assert_eq!(cfg.verify_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_timeout() {
        for bad in ["0", "soon", "-3"] {
            let result = CliConfig::from_lookup(lookup(&[("KCRED_VERIFY_TIMEOUT_SECS", bad)]));
            assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))), "{bad}");
        }
    }

    #[test]
    fn flags_override_environment() {
        let cfg = CliConfig::from_lookup(lookup(&[("KCRED_CHAIN_SNAPSHOT", "/env.json")]))
            .unwrap()
            .with_overrides(Some(Path::new("/flag.json")), Some(9));
        assert_eq!(cfg.chain_snapshot, Some(PathBuf::from("/flag.json")));
        assert_eq!(cfg.verify_timeout, Duration::from_secs(9));
    }

    #[test]
    fn debug_is_compact() {
        let rendered = format!("{:?}", CliConfig::default());
        assert_eq!(rendered, "CliConfig { chain_snapshot: \"<unset>\", verify_timeout_secs: 30 }");
    }
}
