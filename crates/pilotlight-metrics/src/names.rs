//! Metric names emitted by the control plane.
//!
//! These names are consumed by downstream dashboards and alarm
//! definitions; renaming them is a breaking change to that contract.

/// Store reachability of a region: 1.0 reachable, 0.0 not. Dimension: region.
pub const STORE_HEALTH: &str = "DynamoDBHealth";

/// Estimated cross-region replication lag in seconds. Dimension: region.
pub const REPLICATION_LAG: &str = "ReplicationLag";

/// Per-table match percentage between the two regions' replicas.
/// Dimensions: tableName, sourceRegion, targetRegion.
pub const MATCH_PERCENTAGE: &str = "DataReplicationMatchPercentage";

/// Count of completed failover/failback transitions.
/// Dimensions: action, targetRegion.
pub const FAILOVER_EVENT: &str = "FailoverEvent";
