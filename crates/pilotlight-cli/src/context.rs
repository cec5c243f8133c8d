//! Concrete wiring: on-disk stores, the filesystem artifact store,
//! and the collaborator graph each command needs.

use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;
use pilot_core::DrConfig;
use pilotlight_failover::{ControllerConfig, FailoverController, LogRouting, SyncProbe};
use pilotlight_health::{HealthMonitor, MonitorConfig};
use pilotlight_metrics::{LogSink, MetricsSink};
use pilotlight_state::{RegionStore, Replica, StateResult};
use pilotlight_validate::{
    DataValidator, ValidationAction, ValidationType, ValidatorConfig,
};

pub struct Context {
    pub config: DrConfig,
    /// Home of the failover singleton; stands in for the replicated
    /// control table.
    pub control: Arc<dyn Replica>,
    pub primary: Arc<dyn Replica>,
    pub standby: Arc<dyn Replica>,
    pub metrics: Arc<dyn MetricsSink>,
    pub artifacts: Arc<dyn ObjectStore>,
}

impl Context {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = DrConfig::from_env()?;
        std::fs::create_dir_all(&config.state_dir)?;
        std::fs::create_dir_all(&config.backup_dir)?;

        let primary = RegionStore::open(
            &config.state_dir.join(format!("{}.redb", config.primary_region)),
            &config.primary_region,
        )?;
        let standby = RegionStore::open(
            &config.state_dir.join(format!("{}.redb", config.standby_region)),
            &config.standby_region,
        )?;
        let control = RegionStore::open(&config.state_dir.join("control.redb"), "control")?;
        let artifacts = LocalFileSystem::new_with_prefix(&config.backup_dir)?;

        Ok(Self {
            config,
            control: Arc::new(control),
            primary: Arc::new(primary),
            standby: Arc::new(standby),
            metrics: Arc::new(LogSink),
            artifacts: Arc::new(artifacts),
        })
    }

    pub fn replica(&self, region: &str) -> Arc<dyn Replica> {
        if region == self.standby.region() {
            self.standby.clone()
        } else {
            self.primary.clone()
        }
    }

    pub fn other_region(&self, region: &str) -> &str {
        if region == self.config.primary_region {
            &self.config.standby_region
        } else {
            &self.config.primary_region
        }
    }

    pub fn monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            self.primary.clone(),
            self.standby.clone(),
            self.metrics.clone(),
            MonitorConfig::from(&self.config),
        )
    }

    pub fn controller(&self) -> FailoverController {
        let sync_probe = ValidatorSync {
            primary: self.primary.clone(),
            standby: self.standby.clone(),
            metrics: self.metrics.clone(),
            config: self.config.clone(),
        };
        FailoverController::new(
            self.control.clone(),
            self.primary.clone(),
            self.standby.clone(),
            Arc::new(self.monitor()),
            Arc::new(sync_probe),
            Arc::new(LogRouting),
            self.metrics.clone(),
            ControllerConfig::from(&self.config),
        )
    }

    /// Validator reading from `source_region` and checking against the
    /// other region.
    pub fn validator(&self, source_region: &str) -> DataValidator {
        DataValidator::new(
            self.replica(source_region),
            self.replica(self.other_region(source_region)),
            self.metrics.clone(),
            ValidatorConfig::from(&self.config),
        )
    }
}

/// Failback sync confirmation backed by a full validation run from
/// the surviving region into the failback target.
struct ValidatorSync {
    primary: Arc<dyn Replica>,
    standby: Arc<dyn Replica>,
    metrics: Arc<dyn MetricsSink>,
    config: DrConfig,
}

#[async_trait]
impl SyncProbe for ValidatorSync {
    async fn confirm_sync(&self, target_region: &str) -> StateResult<bool> {
        let (source, target) = if target_region == self.standby.region() {
            (self.primary.clone(), self.standby.clone())
        } else {
            (self.standby.clone(), self.primary.clone())
        };
        let validator = DataValidator::new(
            source,
            target,
            self.metrics.clone(),
            ValidatorConfig::from(&self.config),
        );
        let report = validator
            .run(ValidationType::Full, None, ValidationAction::Report)
            .await?;
        Ok(report.match_percentage >= self.config.sync_match_threshold)
    }
}
