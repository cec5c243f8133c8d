//! The health monitor: probes, lag estimation, and the wire surface.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use pilot_core::DrConfig;
use pilotlight_metrics::{MetricSample, MetricsSink, Unit, names};
use pilotlight_state::{Replica, SentinelRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::score::health_score;

/// Component name written into sentinel records.
const SENTINEL_SOURCE: &str = "health-monitor";

/// Thresholds and bounds the monitor evaluates against.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Upper bound on a single reachability probe.
    pub probe_timeout: Duration,
    /// Lag considered fully healthy (seconds).
    pub lag_threshold_secs: f64,
    /// Lag treated as a hard failure (seconds).
    pub lag_ceiling_secs: f64,
    /// Scores below this are reported degraded.
    pub warn_threshold: f64,
    /// Scores at or below this are reported unhealthy.
    pub critical_threshold: f64,
}

impl From<&DrConfig> for MonitorConfig {
    fn from(config: &DrConfig) -> Self {
        Self {
            probe_timeout: config.probe_timeout,
            lag_threshold_secs: config.lag_threshold_secs,
            lag_ceiling_secs: config.lag_ceiling_secs,
            warn_threshold: config.warn_threshold,
            critical_threshold: config.critical_threshold,
        }
    }
}

/// Outcome of one health evaluation of one region.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub region: String,
    /// Unix timestamp of the evaluation.
    pub timestamp: u64,
    pub store_reachable: bool,
    /// Estimated cross-region replication lag; `None` when the
    /// estimate could not be taken.
    pub replication_lag_seconds: Option<f64>,
    /// Scalar score in `0.0..=1.0`, see [`health_score`].
    pub health_score: f64,
}

/// What the failover controller consumes: some source of health
/// evaluations for a named region.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn check(&self, region: &str) -> HealthRecord;
}

/// Evaluates region health from a reachability probe plus a
/// sentinel-based replication-lag estimate.
///
/// Every failure mode of the underlying store is absorbed into the
/// returned record; `check` itself never fails.
pub struct HealthMonitor {
    primary: Arc<dyn Replica>,
    standby: Arc<dyn Replica>,
    metrics: Arc<dyn MetricsSink>,
    config: MonitorConfig,
}

impl HealthMonitor {
    pub fn new(
        primary: Arc<dyn Replica>,
        standby: Arc<dyn Replica>,
        metrics: Arc<dyn MetricsSink>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            primary,
            standby,
            metrics,
            config,
        }
    }

    /// Evaluate the named region and emit the health metrics.
    pub async fn evaluate(&self, region: &str) -> HealthRecord {
        let replica = if region == self.standby.region() {
            &self.standby
        } else {
            &self.primary
        };

        let reachable = self.probe(replica.as_ref()).await;
        let lag = if reachable {
            self.estimate_lag().await
        } else {
            None
        };
        let score = health_score(
            reachable,
            lag,
            self.config.lag_threshold_secs,
            self.config.lag_ceiling_secs,
        );

        let record = HealthRecord {
            region: region.to_string(),
            timestamp: epoch_secs(),
            store_reachable: reachable,
            replication_lag_seconds: lag,
            health_score: score,
        };
        debug!(
            region,
            reachable,
            lag = ?record.replication_lag_seconds,
            score,
            "health evaluation"
        );

        self.metrics.record(
            MetricSample::new(names::STORE_HEALTH, if reachable { 1.0 } else { 0.0 })
                .with_dimension("region", region),
        );
        if let Some(lag) = lag {
            self.metrics.record(
                MetricSample::new(names::REPLICATION_LAG, lag)
                    .with_unit(Unit::Seconds)
                    .with_dimension("region", region),
            );
        }
        record
    }

    /// Bounded-time reachability probe.
    async fn probe(&self, replica: &dyn Replica) -> bool {
        match tokio::time::timeout(self.config.probe_timeout, replica.probe()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(region = replica.region(), error = %e, "store probe failed");
                false
            }
            Err(_) => {
                warn!(
                    region = replica.region(),
                    timeout_ms = self.config.probe_timeout.as_millis() as u64,
                    "store probe timed out"
                );
                false
            }
        }
    }

    /// Estimate replication lag: write a sentinel into the primary,
    /// then read the newest sentinel visible in the standby. The lag
    /// is the age of that sentinel; `None` when either side fails or
    /// the standby has never seen one.
    async fn estimate_lag(&self) -> Option<f64> {
        let now = epoch_secs();
        let sentinel = SentinelRecord {
            id: format!("sentinel-{now}"),
            timestamp: now,
            source: SENTINEL_SOURCE.to_string(),
        };
        if let Err(e) = self.primary.put_sentinel(&sentinel).await {
            warn!(error = %e, "sentinel write failed, lag unknown");
            return None;
        }

        match self.standby.latest_sentinel().await {
            Ok(Some(seen)) => Some(now.saturating_sub(seen.timestamp) as f64),
            Ok(None) => {
                debug!("no sentinel visible in standby yet, lag unknown");
                None
            }
            Err(e) => {
                warn!(error = %e, "standby sentinel read failed, lag unknown");
                None
            }
        }
    }

    /// Serve one health request.
    pub async fn handle(&self, request: &HealthRequest) -> HealthResponse {
        let region = request
            .region
            .clone()
            .unwrap_or_else(|| self.primary.region().to_string());
        let record = self.evaluate(&region).await;
        HealthResponse::from_record(&record, &self.config)
    }
}

#[async_trait]
impl HealthSource for HealthMonitor {
    async fn check(&self, region: &str) -> HealthRecord {
        self.evaluate(region).await
    }
}

/// Request payload for a health check invocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRequest {
    /// Region to evaluate; defaults to the primary.
    pub region: Option<String>,
}

/// Response payload for a health check invocation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub region: String,
    /// "healthy", "degraded", or "unhealthy".
    pub status: String,
    pub health_score: f64,
    pub store_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_lag_seconds: Option<f64>,
}

impl HealthResponse {
    pub fn from_record(record: &HealthRecord, config: &MonitorConfig) -> Self {
        let status = if record.health_score >= config.warn_threshold {
            "healthy"
        } else if record.health_score > config.critical_threshold {
            "degraded"
        } else {
            "unhealthy"
        };
        Self {
            region: record.region.clone(),
            status: status.to_string(),
            health_score: record.health_score,
            store_reachable: record.store_reachable,
            replication_lag_seconds: record.replication_lag_seconds,
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilotlight_metrics::MemorySink;
    use pilotlight_state::{RegionStore, testing::FlakyReplica};
    use std::sync::atomic::Ordering;

    fn stores() -> (RegionStore, RegionStore) {
        (
            RegionStore::open_in_memory("us-east-1").unwrap(),
            RegionStore::open_in_memory("us-west-2").unwrap(),
        )
    }

    fn monitor(
        primary: Arc<dyn Replica>,
        standby: Arc<dyn Replica>,
    ) -> (HealthMonitor, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let config = MonitorConfig::from(&DrConfig::for_tests("us-east-1", "us-west-2"));
        (
            HealthMonitor::new(primary, standby, sink.clone(), config),
            sink,
        )
    }

    fn seed_standby_sentinel(standby: &RegionStore, age_secs: u64) {
        let now = epoch_secs();
        standby
            .put_sentinel(&SentinelRecord {
                id: format!("sentinel-{}", now - age_secs),
                timestamp: now - age_secs,
                source: SENTINEL_SOURCE.to_string(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_sentinel_scores_fully_healthy() {
        let (primary, standby) = stores();
        seed_standby_sentinel(&standby, 0);
        let (monitor, sink) = monitor(Arc::new(primary), Arc::new(standby));

        let record = monitor.evaluate("us-east-1").await;
        assert!(record.store_reachable);
        assert_eq!(record.health_score, 1.0);
        assert!(record.replication_lag_seconds.unwrap() < 2.0);

        assert_eq!(sink.last_value(names::STORE_HEALTH), Some(1.0));
        assert!(sink.last_value(names::REPLICATION_LAG).is_some());
    }

    #[tokio::test]
    async fn stale_sentinel_degrades_the_score() {
        let (primary, standby) = stores();
        // Halfway between the default threshold (60s) and ceiling (300s).
        seed_standby_sentinel(&standby, 180);
        let (monitor, _sink) = monitor(Arc::new(primary), Arc::new(standby));

        let record = monitor.evaluate("us-east-1").await;
        assert!(record.store_reachable);
        let score = record.health_score;
        assert!(score > 0.45 && score < 0.55, "score was {score}");
    }

    #[tokio::test]
    async fn unreachable_store_scores_zero_and_skips_lag() {
        let (primary, standby) = stores();
        let flaky = FlakyReplica::new(primary);
        flaky.fail_probe.store(true, Ordering::Relaxed);
        let (monitor, sink) = monitor(Arc::new(flaky), Arc::new(standby));

        let record = monitor.evaluate("us-east-1").await;
        assert!(!record.store_reachable);
        assert_eq!(record.health_score, 0.0);
        assert!(record.replication_lag_seconds.is_none());

        assert_eq!(sink.last_value(names::STORE_HEALTH), Some(0.0));
        assert!(sink.named(names::REPLICATION_LAG).is_empty());
    }

    #[tokio::test]
    async fn slow_probe_counts_as_unreachable() {
        let (primary, standby) = stores();
        let flaky = FlakyReplica::new(primary);
        flaky.probe_delay_ms.store(200, Ordering::Relaxed);

        let sink = Arc::new(MemorySink::new());
        let mut config = MonitorConfig::from(&DrConfig::for_tests("us-east-1", "us-west-2"));
        config.probe_timeout = Duration::from_millis(20);
        let monitor = HealthMonitor::new(Arc::new(flaky), Arc::new(standby), sink, config);

        let record = monitor.evaluate("us-east-1").await;
        assert!(!record.store_reachable);
        assert_eq!(record.health_score, 0.0);
    }

    #[tokio::test]
    async fn unknown_lag_yields_half_score() {
        let (primary, standby) = stores();
        let flaky_standby = FlakyReplica::new(standby);
        flaky_standby.fail_sentinel_reads.store(true, Ordering::Relaxed);
        let (monitor, sink) = monitor(Arc::new(primary), Arc::new(flaky_standby));

        let record = monitor.evaluate("us-east-1").await;
        assert!(record.store_reachable);
        assert!(record.replication_lag_seconds.is_none());
        assert_eq!(record.health_score, 0.5);
        assert!(sink.named(names::REPLICATION_LAG).is_empty());
    }

    #[tokio::test]
    async fn empty_standby_yields_unknown_lag() {
        let (primary, standby) = stores();
        let (monitor, _sink) = monitor(Arc::new(primary), Arc::new(standby));

        let record = monitor.evaluate("us-east-1").await;
        assert!(record.replication_lag_seconds.is_none());
        assert_eq!(record.health_score, 0.5);
    }

    #[tokio::test]
    async fn standby_region_probes_the_standby_replica() {
        let (primary, standby) = stores();
        let flaky_standby = FlakyReplica::new(standby);
        flaky_standby.fail_probe.store(true, Ordering::Relaxed);
        let (monitor, _sink) = monitor(Arc::new(primary), Arc::new(flaky_standby));

        let record = monitor.evaluate("us-west-2").await;
        assert_eq!(record.region, "us-west-2");
        assert!(!record.store_reachable);
    }

    #[tokio::test]
    async fn response_payload_is_camel_case() {
        let (primary, standby) = stores();
        seed_standby_sentinel(&standby, 0);
        let (monitor, _sink) = monitor(Arc::new(primary), Arc::new(standby));

        let response = monitor.handle(&HealthRequest::default()).await;
        assert_eq!(response.status, "healthy");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("healthScore").is_some());
        assert!(json.get("storeReachable").is_some());
        assert!(json.get("replicationLagSeconds").is_some());
        assert!(json.get("health_score").is_none());
    }
}
