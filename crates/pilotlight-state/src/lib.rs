//! pilotlight-state — persisted records for the DR control plane.
//!
//! The control plane keeps no cross-invocation state in process memory.
//! Everything a later invocation needs lives in four record families:
//! the `FailoverState` singleton (guarded by version-checked
//! compare-and-swap), append-only `BackupMetadata` rows, sentinel
//! records used for replication-lag probing, and the application
//! `TableRecord`s the validator and backup manager operate on.
//!
//! # Architecture
//!
//! The [`Replica`] trait is the interface of the replicated store the
//! core treats as a black box: bounded read/write calls against one
//! region's replica. [`RegionStore`] is the redb-backed implementation
//! (on-disk or in-memory), JSON-serializing domain types into `&[u8]`
//! value columns with composite string keys.
//!
//! Compare-and-swap on the failover singleton happens inside a single
//! redb write transaction, so a concurrent invocation that already
//! advanced `version` is always detected and never overwritten.

pub mod error;
pub mod replica;
pub mod store;
pub mod tables;
pub mod testing;
pub mod types;

pub use error::{StateError, StateResult};
pub use replica::Replica;
pub use store::RegionStore;
pub use types::*;
