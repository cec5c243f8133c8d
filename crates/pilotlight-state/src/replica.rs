//! The replicated-store interface consumed by the decision components.
//!
//! In deployment every call crosses the network to a managed
//! replicated store, so the interface is async and each call is
//! expected to be wrapped in a caller-side timeout. The core never
//! assumes more than the read/write/consistency semantics expressed
//! here.

use async_trait::async_trait;

use crate::error::StateResult;
use crate::types::{BackupMetadata, FailoverState, SentinelRecord, TableRecord};

/// One region's view of the replicated store.
#[async_trait]
pub trait Replica: Send + Sync {
    /// Region this replica lives in.
    fn region(&self) -> &str;

    /// Lightweight reachability probe (a bounded read).
    async fn probe(&self) -> StateResult<()>;

    // ── Sentinels ─────────────────────────────────────────────────

    async fn put_sentinel(&self, sentinel: &SentinelRecord) -> StateResult<()>;

    /// The most recent sentinel visible in this replica, if any.
    async fn latest_sentinel(&self) -> StateResult<Option<SentinelRecord>>;

    // ── Failover singleton ────────────────────────────────────────

    async fn failover_state(&self) -> StateResult<Option<FailoverState>>;

    /// Create the singleton at first deploy. Idempotent: returns the
    /// existing record if one is already present.
    async fn init_failover_state(&self, primary_region: &str) -> StateResult<FailoverState>;

    /// Replace the singleton iff its stored version equals
    /// `expected_version`. On success the written record (with
    /// `version = expected_version + 1`) is returned; a concurrent
    /// advance yields [`StateError::VersionConflict`] and writes
    /// nothing.
    ///
    /// [`StateError::VersionConflict`]: crate::StateError::VersionConflict
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: FailoverState,
    ) -> StateResult<FailoverState>;

    // ── Backup metadata ───────────────────────────────────────────

    /// Append a new backup job row (must be in `Running` status).
    async fn append_backup(&self, meta: &BackupMetadata) -> StateResult<()>;

    /// Finalize a running backup row. Rejects any change to a row
    /// that already left `Running`.
    async fn finalize_backup(&self, meta: &BackupMetadata) -> StateResult<()>;

    async fn get_backup(&self, backup_id: &str) -> StateResult<Option<BackupMetadata>>;

    /// All backup rows for a table, oldest first.
    async fn list_backups(&self, table: &str) -> StateResult<Vec<BackupMetadata>>;

    // ── Application records ───────────────────────────────────────

    async fn put_record(&self, record: &TableRecord) -> StateResult<()>;

    async fn get_record(&self, table: &str, id: &str) -> StateResult<Option<TableRecord>>;

    /// Scan a table's records, optionally restricted to records
    /// updated strictly after `updated_since`, optionally bounded to
    /// the first `limit` records in key order.
    async fn scan_records(
        &self,
        table: &str,
        updated_since: Option<u64>,
        limit: Option<usize>,
    ) -> StateResult<Vec<TableRecord>>;
}
