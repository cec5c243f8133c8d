//! Test doubles for the [`Replica`] interface.
//!
//! The decision components are tested against real in-memory
//! [`RegionStore`]s wherever possible; these wrappers exist to inject
//! the failure modes a live replicated store exhibits — unreachable
//! endpoints, slow probes, and reads that race a concurrent writer.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StateError, StateResult};
use crate::replica::Replica;
use crate::store::RegionStore;
use crate::types::{BackupMetadata, FailoverState, SentinelRecord, TableRecord};

/// A replica that can be told to fail or stall specific call classes.
pub struct FlakyReplica {
    inner: RegionStore,
    pub fail_probe: AtomicBool,
    pub fail_sentinel_writes: AtomicBool,
    pub fail_sentinel_reads: AtomicBool,
    pub fail_record_reads: AtomicBool,
    pub fail_record_writes: AtomicBool,
    /// Added to every probe, to exercise caller-side timeouts.
    pub probe_delay_ms: AtomicU64,
}

impl FlakyReplica {
    pub fn new(inner: RegionStore) -> Self {
        Self {
            inner,
            fail_probe: AtomicBool::new(false),
            fail_sentinel_writes: AtomicBool::new(false),
            fail_sentinel_reads: AtomicBool::new(false),
            fail_record_reads: AtomicBool::new(false),
            fail_record_writes: AtomicBool::new(false),
            probe_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &RegionStore {
        &self.inner
    }

    fn injected(&self, flag: &AtomicBool) -> StateResult<()> {
        if flag.load(Ordering::Relaxed) {
            Err(StateError::Unreachable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Replica for FlakyReplica {
    fn region(&self) -> &str {
        self.inner.region()
    }

    async fn probe(&self) -> StateResult<()> {
        let delay = self.probe_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.injected(&self.fail_probe)?;
        Replica::probe(&self.inner).await
    }

    async fn put_sentinel(&self, sentinel: &SentinelRecord) -> StateResult<()> {
        self.injected(&self.fail_sentinel_writes)?;
        self.inner.put_sentinel(sentinel)
    }

    async fn latest_sentinel(&self) -> StateResult<Option<SentinelRecord>> {
        self.injected(&self.fail_sentinel_reads)?;
        self.inner.latest_sentinel()
    }

    async fn failover_state(&self) -> StateResult<Option<FailoverState>> {
        self.inner.failover_state()
    }

    async fn init_failover_state(&self, primary_region: &str) -> StateResult<FailoverState> {
        self.inner.init_failover_state(primary_region)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: FailoverState,
    ) -> StateResult<FailoverState> {
        self.inner.compare_and_swap(expected_version, next)
    }

    async fn append_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        self.inner.append_backup(meta)
    }

    async fn finalize_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        self.inner.finalize_backup(meta)
    }

    async fn get_backup(&self, backup_id: &str) -> StateResult<Option<BackupMetadata>> {
        self.inner.get_backup(backup_id)
    }

    async fn list_backups(&self, table: &str) -> StateResult<Vec<BackupMetadata>> {
        self.injected(&self.fail_record_reads)?;
        self.inner.list_backups(table)
    }

    async fn put_record(&self, record: &TableRecord) -> StateResult<()> {
        self.injected(&self.fail_record_writes)?;
        self.inner.put_record(record)
    }

    async fn get_record(&self, table: &str, id: &str) -> StateResult<Option<TableRecord>> {
        self.injected(&self.fail_record_reads)?;
        self.inner.get_record(table, id)
    }

    async fn scan_records(
        &self,
        table: &str,
        updated_since: Option<u64>,
        limit: Option<usize>,
    ) -> StateResult<Vec<TableRecord>> {
        self.injected(&self.fail_record_reads)?;
        self.inner.scan_records(table, updated_since, limit)
    }
}

/// A replica whose `failover_state` replays the snapshot taken on the
/// first read, while writes go through to the shared store.
///
/// This reproduces the interleaving where two invocations read the
/// same version and race to compare-and-swap: the second writer sees
/// a stale version and must get a conflict.
pub struct StaleReadReplica {
    inner: RegionStore,
    snapshot: Mutex<Option<FailoverState>>,
}

impl StaleReadReplica {
    pub fn new(inner: RegionStore) -> Self {
        Self {
            inner,
            snapshot: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Replica for StaleReadReplica {
    fn region(&self) -> &str {
        self.inner.region()
    }

    async fn probe(&self) -> StateResult<()> {
        Replica::probe(&self.inner).await
    }

    async fn put_sentinel(&self, sentinel: &SentinelRecord) -> StateResult<()> {
        self.inner.put_sentinel(sentinel)
    }

    async fn latest_sentinel(&self) -> StateResult<Option<SentinelRecord>> {
        self.inner.latest_sentinel()
    }

    async fn failover_state(&self) -> StateResult<Option<FailoverState>> {
        let mut snapshot = self.snapshot.lock().unwrap();
        if snapshot.is_none() {
            *snapshot = self.inner.failover_state()?;
        }
        Ok(snapshot.clone())
    }

    async fn init_failover_state(&self, primary_region: &str) -> StateResult<FailoverState> {
        self.inner.init_failover_state(primary_region)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: FailoverState,
    ) -> StateResult<FailoverState> {
        self.inner.compare_and_swap(expected_version, next)
    }

    async fn append_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        self.inner.append_backup(meta)
    }

    async fn finalize_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        self.inner.finalize_backup(meta)
    }

    async fn get_backup(&self, backup_id: &str) -> StateResult<Option<BackupMetadata>> {
        self.inner.get_backup(backup_id)
    }

    async fn list_backups(&self, table: &str) -> StateResult<Vec<BackupMetadata>> {
        self.inner.list_backups(table)
    }

    async fn put_record(&self, record: &TableRecord) -> StateResult<()> {
        self.inner.put_record(record)
    }

    async fn get_record(&self, table: &str, id: &str) -> StateResult<Option<TableRecord>> {
        self.inner.get_record(table, id)
    }

    async fn scan_records(
        &self,
        table: &str,
        updated_since: Option<u64>,
        limit: Option<usize>,
    ) -> StateResult<Vec<TableRecord>> {
        self.inner.scan_records(table, updated_since, limit)
    }
}
