//! pilotlight-health — health evaluation for the DR control plane.
//!
//! The monitor performs a bounded-time reachability probe against a
//! region's replica, estimates cross-region replication lag with a
//! sentinel write-then-read, and folds both into a scalar health
//! score. Probe errors never escape: the monitor always returns a
//! best-effort [`HealthRecord`], degrading the score instead of
//! failing the invocation.
//!
//! The score itself is a pure function of the probe result and the
//! configured thresholds (see [`score::health_score`]), so the
//! decision logic is testable without live collaborators.

pub mod monitor;
pub mod score;

pub use monitor::{
    HealthMonitor, HealthRecord, HealthRequest, HealthResponse, HealthSource, MonitorConfig,
};
pub use score::health_score;
