//! RegionStore — redb-backed implementation of [`Replica`].
//!
//! One store per region. Supports on-disk and in-memory backends (the
//! latter for testing). Every observable state change is a single
//! atomic record write inside one transaction; nothing spans two
//! calls.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::replica::Replica;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe per-region store backed by redb.
#[derive(Clone)]
pub struct RegionStore {
    db: Arc<Database>,
    region: String,
}

impl RegionStore {
    /// Open (or create) a persistent store for the given region.
    pub fn open(path: &Path, region: &str) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            region: region.to_string(),
        };
        store.ensure_tables()?;
        debug!(?path, %region, "region store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory(region: &str) -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            region: region.to_string(),
        };
        store.ensure_tables()?;
        debug!(%region, "in-memory region store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(FAILOVER).map_err(map_err!(Table))?;
        txn.open_table(BACKUPS).map_err(map_err!(Table))?;
        txn.open_table(SENTINELS).map_err(map_err!(Table))?;
        txn.open_table(RECORDS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    // ── Failover singleton ────────────────────────────────────────

    /// Read the failover singleton, if it has been initialized.
    pub fn failover_state(&self) -> StateResult<Option<FailoverState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(FAILOVER).map_err(map_err!(Table))?;
        match table.get(STATE_KEY).map_err(map_err!(Read))? {
            Some(guard) => {
                let state: FailoverState =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Create the failover singleton at first deploy. Idempotent.
    pub fn init_failover_state(&self, primary_region: &str) -> StateResult<FailoverState> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let state;
        {
            let mut table = txn.open_table(FAILOVER).map_err(map_err!(Table))?;
            let existing = match table.get(STATE_KEY).map_err(map_err!(Read))? {
                Some(guard) => Some(
                    serde_json::from_slice::<FailoverState>(guard.value())
                        .map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            match existing {
                Some(current) => state = current,
                None => {
                    let initial = FailoverState::initial(primary_region, epoch_secs());
                    let value = serde_json::to_vec(&initial).map_err(map_err!(Serialize))?;
                    table
                        .insert(STATE_KEY, value.as_slice())
                        .map_err(map_err!(Write))?;
                    state = initial;
                }
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(version = state.version, "failover state initialized");
        Ok(state)
    }

    /// Replace the failover singleton iff its version still matches.
    ///
    /// The read, compare, and write happen in one transaction, so two
    /// invocations racing on the same `expected_version` cannot both
    /// succeed.
    pub fn compare_and_swap(
        &self,
        expected_version: u64,
        mut next: FailoverState,
    ) -> StateResult<FailoverState> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(FAILOVER).map_err(map_err!(Table))?;
            let current: FailoverState = match table.get(STATE_KEY).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound("failover state".to_string())),
            };
            if current.version != expected_version {
                return Err(StateError::VersionConflict {
                    expected: expected_version,
                    found: current.version,
                });
            }
            next.version = expected_version + 1;
            let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
            table
                .insert(STATE_KEY, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            version = next.version,
            state = %next.current_state,
            "failover state advanced"
        );
        Ok(next)
    }

    // ── Backup metadata ───────────────────────────────────────────

    /// Append a new backup job row.
    pub fn append_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        let value = serde_json::to_vec(meta).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(BACKUPS).map_err(map_err!(Table))?;
            table
                .insert(meta.backup_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(backup_id = %meta.backup_id, table = %meta.table_name, "backup row appended");
        Ok(())
    }

    /// Finalize a running backup row.
    ///
    /// A row that already left `Running` is immutable; attempting to
    /// change it again is an `InvalidTransition`.
    pub fn finalize_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(BACKUPS).map_err(map_err!(Table))?;
            let current: BackupMetadata = match table
                .get(meta.backup_id.as_str())
                .map_err(map_err!(Read))?
            {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound(meta.backup_id.clone())),
            };
            if current.status != BackupStatus::Running {
                return Err(StateError::InvalidTransition {
                    backup_id: meta.backup_id.clone(),
                    status: current.status.to_string(),
                });
            }
            let value = serde_json::to_vec(meta).map_err(map_err!(Serialize))?;
            table
                .insert(meta.backup_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(backup_id = %meta.backup_id, status = %meta.status, "backup row finalized");
        Ok(())
    }

    /// Get a backup row by ID.
    pub fn get_backup(&self, backup_id: &str) -> StateResult<Option<BackupMetadata>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BACKUPS).map_err(map_err!(Table))?;
        match table.get(backup_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let meta: BackupMetadata =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    /// All backup rows for a table, oldest first.
    pub fn list_backups(&self, table_name: &str) -> StateResult<Vec<BackupMetadata>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BACKUPS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let meta: BackupMetadata =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if meta.table_name == table_name {
                results.push(meta);
            }
        }
        results.sort_by_key(|m| m.started_at);
        Ok(results)
    }

    // ── Sentinels ─────────────────────────────────────────────────

    /// Insert or update a sentinel record.
    pub fn put_sentinel(&self, sentinel: &SentinelRecord) -> StateResult<()> {
        let value = serde_json::to_vec(sentinel).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SENTINELS).map_err(map_err!(Table))?;
            table
                .insert(sentinel.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// The most recent sentinel visible in this store.
    pub fn latest_sentinel(&self) -> StateResult<Option<SentinelRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SENTINELS).map_err(map_err!(Table))?;
        let mut latest: Option<SentinelRecord> = None;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let sentinel: SentinelRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if latest
                .as_ref()
                .is_none_or(|l| sentinel.timestamp > l.timestamp)
            {
                latest = Some(sentinel);
            }
        }
        Ok(latest)
    }

    // ── Application records ───────────────────────────────────────

    /// Insert or update an application record.
    pub fn put_record(&self, record: &TableRecord) -> StateResult<()> {
        let key = record.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Point read of a single application record.
    pub fn get_record(&self, table_name: &str, id: &str) -> StateResult<Option<TableRecord>> {
        let key = format!("{table_name}/{id}");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: TableRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Scan a table's records in key order.
    pub fn scan_records(
        &self,
        table_name: &str,
        updated_since: Option<u64>,
        limit: Option<usize>,
    ) -> StateResult<Vec<TableRecord>> {
        let prefix = format!("{table_name}/");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if !key.value().starts_with(&prefix) {
                continue;
            }
            let record: TableRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if let Some(since) = updated_since {
                if record.updated_at <= since {
                    continue;
                }
            }
            results.push(record);
            if let Some(limit) = limit {
                if results.len() >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }
}

#[async_trait]
impl Replica for RegionStore {
    fn region(&self) -> &str {
        RegionStore::region(self)
    }

    async fn probe(&self) -> StateResult<()> {
        // A lightweight read against the singleton table.
        RegionStore::failover_state(self).map(|_| ())
    }

    async fn put_sentinel(&self, sentinel: &SentinelRecord) -> StateResult<()> {
        RegionStore::put_sentinel(self, sentinel)
    }

    async fn latest_sentinel(&self) -> StateResult<Option<SentinelRecord>> {
        RegionStore::latest_sentinel(self)
    }

    async fn failover_state(&self) -> StateResult<Option<FailoverState>> {
        RegionStore::failover_state(self)
    }

    async fn init_failover_state(&self, primary_region: &str) -> StateResult<FailoverState> {
        RegionStore::init_failover_state(self, primary_region)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        next: FailoverState,
    ) -> StateResult<FailoverState> {
        RegionStore::compare_and_swap(self, expected_version, next)
    }

    async fn append_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        RegionStore::append_backup(self, meta)
    }

    async fn finalize_backup(&self, meta: &BackupMetadata) -> StateResult<()> {
        RegionStore::finalize_backup(self, meta)
    }

    async fn get_backup(&self, backup_id: &str) -> StateResult<Option<BackupMetadata>> {
        RegionStore::get_backup(self, backup_id)
    }

    async fn list_backups(&self, table: &str) -> StateResult<Vec<BackupMetadata>> {
        RegionStore::list_backups(self, table)
    }

    async fn put_record(&self, record: &TableRecord) -> StateResult<()> {
        RegionStore::put_record(self, record)
    }

    async fn get_record(&self, table: &str, id: &str) -> StateResult<Option<TableRecord>> {
        RegionStore::get_record(self, table, id)
    }

    async fn scan_records(
        &self,
        table: &str,
        updated_since: Option<u64>,
        limit: Option<usize>,
    ) -> StateResult<Vec<TableRecord>> {
        RegionStore::scan_records(self, table, updated_since, limit)
    }
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
