//! Domain types persisted by the control plane.
//!
//! All types are JSON-serialized for storage in redb tables. Persisted
//! timestamps are unix seconds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Region identifier (e.g. "us-east-1").
pub type RegionId = String;

// ── Failover state ────────────────────────────────────────────────

/// Phase of the failover/failback state machine.
///
/// `Normal` and `FailedOver` are the two serving postures; the
/// in-progress phases exist so a crashed invocation leaves a record a
/// fresh invocation can resume from. There is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverPhase {
    Normal,
    Degraded,
    FailoverInProgress,
    FailedOver,
    FailbackInProgress,
}

impl fmt::Display for FailoverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Degraded => "degraded",
            Self::FailoverInProgress => "failover_in_progress",
            Self::FailedOver => "failed_over",
            Self::FailbackInProgress => "failback_in_progress",
        };
        write!(f, "{s}")
    }
}

/// The singleton record driving the failover state machine.
///
/// Mutated exclusively through compare-and-swap on `version`; a stale
/// writer gets a conflict instead of clobbering a concurrent advance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailoverState {
    pub current_state: FailoverPhase,
    /// Region currently intended to serve traffic.
    pub active_region: RegionId,
    /// Unix timestamp of the last phase change.
    pub last_transition_at: u64,
    /// Monotonically incrementing, compared at write time.
    pub version: u64,
    /// Consecutive unhealthy evaluations observed while `Normal`.
    /// Persisted because invocations share no memory.
    pub unhealthy_streak: u32,
}

impl FailoverState {
    /// The state written at first deploy.
    pub fn initial(primary_region: &str, now: u64) -> Self {
        Self {
            current_state: FailoverPhase::Normal,
            active_region: primary_region.to_string(),
            last_transition_at: now,
            version: 1,
            unhealthy_streak: 0,
        }
    }
}

// ── Backups ───────────────────────────────────────────────────────

/// Lifecycle status of a backup job. Transitions only
/// `Running → Succeeded | Failed`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Kind of export a backup job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    #[default]
    Full,
    Incremental,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

/// One row per backup job, append-only.
///
/// Created in `Running` when a job starts and finalized in the same
/// execution; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupMetadata {
    pub backup_id: String,
    pub table_name: String,
    pub backup_type: BackupKind,
    pub started_at: u64,
    pub completed_at: Option<u64>,
    pub status: BackupStatus,
    /// Object-store path of the artifact, set on success.
    pub artifact_location: Option<String>,
    /// Records contained in the artifact.
    pub item_count: u64,
    /// Error summary, set on failure.
    pub error: Option<String>,
}

impl BackupMetadata {
    /// A fresh job row in `Running` status.
    pub fn started(backup_id: &str, table_name: &str, backup_type: BackupKind, now: u64) -> Self {
        Self {
            backup_id: backup_id.to_string(),
            table_name: table_name.to_string(),
            backup_type,
            started_at: now,
            completed_at: None,
            status: BackupStatus::Running,
            artifact_location: None,
            item_count: 0,
            error: None,
        }
    }
}

// ── Sentinels ─────────────────────────────────────────────────────

/// Synthetic low-value record used to estimate replication latency:
/// written into the primary, observed (or not) in the standby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentinelRecord {
    pub id: String,
    pub timestamp: u64,
    /// Component that wrote the sentinel.
    pub source: String,
}

// ── Application records ───────────────────────────────────────────

/// A record in an application table: the unit the validator compares
/// across regions and the backup manager exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRecord {
    pub table: String,
    pub id: String,
    pub payload: serde_json::Value,
    pub updated_at: u64,
}

impl TableRecord {
    /// Composite key for the records table.
    pub fn table_key(&self) -> String {
        format!("{}/{}", self.table, self.id)
    }
}
