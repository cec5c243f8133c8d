//! The backup manager and its wire surface.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use object_store::ObjectStore;
use object_store::path::Path;
use pilotlight_state::{BackupKind, BackupMetadata, BackupStatus, Replica};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::BackupResult;

/// Prefix under which artifacts are written in the object store.
const ARTIFACT_PREFIX: &str = "backups";

/// Deterministic, timestamp-qualified job identifier.
pub fn backup_id(table: &str, kind: BackupKind, now: u64) -> String {
    format!("{table}-{kind}-{now}")
}

/// Exports tables into an object store and records each job as an
/// append-only metadata row.
pub struct BackupManager {
    replica: Arc<dyn Replica>,
    artifacts: Arc<dyn ObjectStore>,
    /// Tables covered when a request names none.
    tables: Vec<String>,
}

impl BackupManager {
    pub fn new(
        replica: Arc<dyn Replica>,
        artifacts: Arc<dyn ObjectStore>,
        tables: Vec<String>,
    ) -> Self {
        Self {
            replica,
            artifacts,
            tables,
        }
    }

    /// Run one backup job for one table.
    ///
    /// The job row is appended in `running` before the export starts
    /// and finalized before this returns; export errors become a
    /// `failed` row with an error summary rather than escaping. Only a
    /// broken metadata store makes this return `Err`.
    pub async fn backup_table(
        &self,
        table: &str,
        kind: BackupKind,
    ) -> BackupResult<BackupMetadata> {
        let now = epoch_secs();
        let id = backup_id(table, kind, now);
        let mut meta = BackupMetadata::started(&id, table, kind, now);
        self.replica.append_backup(&meta).await?;

        match self.export(table, kind, &id).await {
            Ok((location, count)) => {
                info!(backup_id = %id, table, kind = %kind, items = count, "backup succeeded");
                meta.status = BackupStatus::Succeeded;
                meta.artifact_location = Some(location);
                meta.item_count = count;
            }
            Err(e) => {
                warn!(backup_id = %id, table, kind = %kind, error = %e, "backup failed");
                meta.status = BackupStatus::Failed;
                meta.error = Some(e.to_string());
            }
        }
        meta.completed_at = Some(epoch_secs());
        self.replica.finalize_backup(&meta).await?;
        Ok(meta)
    }

    /// Scan the table and write the artifact. Returns the artifact
    /// location and the number of records it holds.
    async fn export(
        &self,
        table: &str,
        kind: BackupKind,
        backup_id: &str,
    ) -> BackupResult<(String, u64)> {
        let since = match kind {
            BackupKind::Full => None,
            BackupKind::Incremental => self.incremental_baseline(table).await?,
        };
        let records = self.replica.scan_records(table, since, None).await?;
        let body = serde_json::to_vec(&records)?;

        let path = Path::from(format!("{ARTIFACT_PREFIX}/{table}/{backup_id}.json"));
        self.artifacts.put(&path, Bytes::from(body).into()).await?;
        Ok((path.to_string(), records.len() as u64))
    }

    /// Completion time of the most recent succeeded backup of the
    /// table, if any. An incremental run without a baseline exports
    /// everything.
    async fn incremental_baseline(&self, table: &str) -> BackupResult<Option<u64>> {
        let baseline = self
            .replica
            .list_backups(table)
            .await?
            .into_iter()
            .filter(|m| m.status == BackupStatus::Succeeded)
            .filter_map(|m| m.completed_at)
            .max();
        Ok(baseline)
    }

    /// Serve one backup request: the named table, or every configured
    /// table.
    pub async fn handle(&self, request: &BackupRequest) -> BackupResult<Vec<BackupResponse>> {
        let tables: Vec<String> = match &request.table_name {
            Some(table) => vec![table.clone()],
            None => self.tables.clone(),
        };

        let mut responses = Vec::with_capacity(tables.len());
        for table in &tables {
            let meta = self.backup_table(table, request.backup_type).await?;
            responses.push(BackupResponse::from_metadata(&meta));
        }
        Ok(responses)
    }
}

/// Request payload for a backup invocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    /// Table to back up; defaults to the configured set.
    pub table_name: Option<String>,
    #[serde(default)]
    pub backup_type: BackupKind,
}

/// Response payload for one completed job.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupResponse {
    pub backup_id: String,
    pub table_name: String,
    /// "succeeded" or "failed".
    pub status: String,
    pub items_backed_up: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackupResponse {
    pub fn from_metadata(meta: &BackupMetadata) -> Self {
        Self {
            backup_id: meta.backup_id.clone(),
            table_name: meta.table_name.clone(),
            status: meta.status.to_string(),
            items_backed_up: meta.item_count,
            artifact_location: meta.artifact_location.clone(),
            error: meta.error.clone(),
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
