//! Environment-injected configuration.
//!
//! Region identifiers and thresholds are never hardcoded in the
//! decision logic; they arrive here from the deployment environment.
//! Missing required identifiers abort before any collaborator call.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration surface for the disaster-recovery control plane.
#[derive(Debug, Clone)]
pub struct DrConfig {
    /// Region serving traffic under normal operation.
    pub primary_region: String,
    /// Warm standby region kept current by replication.
    pub standby_region: String,
    /// Application tables covered by backup and validation runs.
    pub tables: Vec<String>,
    /// Directory holding the per-region store files.
    pub state_dir: PathBuf,
    /// Root of the backup artifact store.
    pub backup_dir: PathBuf,
    /// Upper bound on a single store reachability probe.
    pub probe_timeout: Duration,
    /// Replication lag considered fully healthy (seconds).
    pub lag_threshold_secs: f64,
    /// Replication lag treated as a hard failure (seconds).
    pub lag_ceiling_secs: f64,
    /// Health score below which an evaluation counts as unhealthy.
    pub warn_threshold: f64,
    /// Health score below which automatic failover may fire.
    pub critical_threshold: f64,
    /// Unhealthy evaluations in a row before degrading.
    pub consecutive_unhealthy: u32,
    /// Whether critically unhealthy evaluations trigger failover
    /// without an operator directive.
    pub auto_failover: bool,
    /// Match percentage required to confirm data synchronization
    /// before a non-forced failback.
    pub sync_match_threshold: f64,
}

impl DrConfig {
    /// Assemble the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Assemble the configuration from an arbitrary lookup function.
    ///
    /// `from_env` is a thin wrapper over this; tests inject a map
    /// instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let primary_region =
            lookup("DR_PRIMARY_REGION").ok_or(ConfigError::Missing("DR_PRIMARY_REGION"))?;
        let standby_region =
            lookup("DR_STANDBY_REGION").ok_or(ConfigError::Missing("DR_STANDBY_REGION"))?;

        let tables = match lookup("DR_TABLES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec!["application".to_string()],
        };

        let state_dir = lookup("DR_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./dr-state"));
        let backup_dir = lookup("DR_BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./dr-artifacts"));

        let probe_timeout =
            Duration::from_secs(parse_or(&lookup, "DR_PROBE_TIMEOUT_SECS", 5u64)?);

        Ok(Self {
            primary_region,
            standby_region,
            tables,
            state_dir,
            backup_dir,
            probe_timeout,
            lag_threshold_secs: parse_or(&lookup, "DR_LAG_THRESHOLD_SECS", 60.0)?,
            lag_ceiling_secs: parse_or(&lookup, "DR_LAG_CEILING_SECS", 300.0)?,
            warn_threshold: parse_or(&lookup, "DR_WARN_THRESHOLD", 0.5)?,
            critical_threshold: parse_or(&lookup, "DR_CRITICAL_THRESHOLD", 0.2)?,
            consecutive_unhealthy: parse_or(&lookup, "DR_CONSECUTIVE_UNHEALTHY", 2u32)?,
            auto_failover: parse_or(&lookup, "DR_AUTO_FAILOVER", false)?,
            sync_match_threshold: parse_or(&lookup, "DR_SYNC_MATCH_THRESHOLD", 99.0)?,
        })
    }

    /// A configuration with default thresholds, for tests.
    pub fn for_tests(primary_region: &str, standby_region: &str) -> Self {
        Self::from_lookup(|var| match var {
            "DR_PRIMARY_REGION" => Some(primary_region.to_string()),
            "DR_STANDBY_REGION" => Some(standby_region.to_string()),
            _ => None,
        })
        .expect("defaults are valid")
    }
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
