use pilotlight_state::StateError;
use thiserror::Error;

/// Errors raised while running a backup job. Inside
/// [`BackupManager::backup_table`] these are absorbed into a `failed`
/// job row; they only escape when the metadata store itself is
/// unusable.
///
/// [`BackupManager::backup_table`]: crate::BackupManager::backup_table
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("state store: {0}")]
    State(#[from] StateError),

    #[error("artifact store: {0}")]
    Artifact(#[from] object_store::Error),

    #[error("artifact encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type BackupResult<T> = Result<T, BackupError>;
