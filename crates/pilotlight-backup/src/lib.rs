//! pilotlight-backup — table exports for the DR control plane.
//!
//! The backup manager exports application tables as JSON artifacts
//! into an [`object_store::ObjectStore`] and tracks each job with an
//! append-only `BackupMetadata` row. The row lifecycle is the hard
//! invariant here: a job row is created in `running` and finalized to
//! `succeeded` or `failed` in the same execution, whatever the export
//! does — a returning invocation never leaves a row behind in
//! `running`.

pub mod error;
pub mod manager;

pub use error::{BackupError, BackupResult};
pub use manager::{BackupManager, BackupRequest, BackupResponse, backup_id};
