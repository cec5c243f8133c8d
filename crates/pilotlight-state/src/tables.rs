//! redb table definitions for the per-region store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized
//! domain types). Application records use composite `{table}/{id}`
//! keys so one redb table can hold every application table and still
//! support prefix scans.

use redb::TableDefinition;

/// The failover singleton, stored under [`STATE_KEY`].
pub const FAILOVER: TableDefinition<&str, &[u8]> = TableDefinition::new("failover_state");

/// Key of the single row in [`FAILOVER`].
pub const STATE_KEY: &str = "failover";

/// Backup job rows keyed by `{backup_id}`.
pub const BACKUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("backup_metadata");

/// Sentinel records keyed by `{id}`.
pub const SENTINELS: TableDefinition<&str, &[u8]> = TableDefinition::new("sentinels");

/// Application records keyed by `{table}/{id}`.
pub const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");
