//! The data validator and its wire surface.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pilot_core::DrConfig;
use pilotlight_metrics::{MetricSample, MetricsSink, Unit, names};
use pilotlight_state::{Replica, StateResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Records drawn per table on an incremental run.
const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Scope of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    /// Bounded sample per table.
    #[default]
    Incremental,
    /// Every record of every covered table.
    Full,
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// What to do about detected mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    /// Report only.
    #[default]
    Report,
    /// Copy missing or differing records source → target.
    Sync,
}

/// Tables, sample bound, and the consistency threshold.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Tables covered when a request names none.
    pub tables: Vec<String>,
    /// Per-table sample bound for incremental runs.
    pub sample_size: usize,
    /// Match percentage at or above which a run reports consistent.
    pub match_threshold: f64,
}

impl From<&DrConfig> for ValidatorConfig {
    fn from(config: &DrConfig) -> Self {
        Self {
            tables: config.tables.clone(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            match_threshold: config.sync_match_threshold,
        }
    }
}

/// Outcome of one validation run, aggregated over the covered tables.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub validation_type: ValidationType,
    pub sampled_count: u64,
    pub mismatch_count: u64,
    /// `(sampled - mismatches) / sampled * 100`; an empty sample is
    /// 100 by convention — nothing checked is nothing wrong.
    pub match_percentage: f64,
    /// Records copied to the target; only non-zero under the sync
    /// action.
    pub synced_count: u64,
    /// Unix timestamp of the run.
    pub generated_at: u64,
}

/// Compares the two regions' replicas record by record.
pub struct DataValidator {
    source: Arc<dyn Replica>,
    target: Arc<dyn Replica>,
    metrics: Arc<dyn MetricsSink>,
    config: ValidatorConfig,
}

impl DataValidator {
    pub fn new(
        source: Arc<dyn Replica>,
        target: Arc<dyn Replica>,
        metrics: Arc<dyn MetricsSink>,
        config: ValidatorConfig,
    ) -> Self {
        Self {
            source,
            target,
            metrics,
            config,
        }
    }

    /// Validate one table and emit its match-percentage sample.
    ///
    /// Returns `(sampled, mismatches, synced)`.
    async fn validate_table(
        &self,
        table: &str,
        validation_type: ValidationType,
        action: ValidationAction,
    ) -> StateResult<(u64, u64, u64)> {
        let limit = match validation_type {
            ValidationType::Incremental => Some(self.config.sample_size),
            ValidationType::Full => None,
        };
        let sample = self.source.scan_records(table, None, limit).await?;

        let mut mismatches = 0u64;
        let mut synced = 0u64;
        for record in &sample {
            let matches = match self.target.get_record(table, &record.id).await? {
                Some(found) => found.payload == record.payload,
                None => false,
            };
            if matches {
                continue;
            }
            mismatches += 1;
            debug!(table, id = %record.id, "record mismatch");

            if action == ValidationAction::Sync {
                match self.target.put_record(record).await {
                    Ok(()) => synced += 1,
                    Err(e) => {
                        warn!(table, id = %record.id, error = %e, "sync copy failed")
                    }
                }
            }
        }

        let sampled = sample.len() as u64;
        self.metrics.record(
            MetricSample::new(names::MATCH_PERCENTAGE, match_percentage(sampled, mismatches))
                .with_unit(Unit::Percent)
                .with_dimension("tableName", table)
                .with_dimension("sourceRegion", self.source.region())
                .with_dimension("targetRegion", self.target.region()),
        );
        Ok((sampled, mismatches, synced))
    }

    /// Run a validation over the covered tables.
    pub async fn run(
        &self,
        validation_type: ValidationType,
        table_name: Option<&str>,
        action: ValidationAction,
    ) -> StateResult<ValidationReport> {
        let tables: Vec<String> = match table_name {
            Some(table) => vec![table.to_string()],
            None => self.config.tables.clone(),
        };

        let mut sampled_count = 0u64;
        let mut mismatch_count = 0u64;
        let mut synced_count = 0u64;
        for table in &tables {
            let (sampled, mismatches, synced) =
                self.validate_table(table, validation_type, action).await?;
            sampled_count += sampled;
            mismatch_count += mismatches;
            synced_count += synced;
        }

        let report = ValidationReport {
            validation_type,
            sampled_count,
            mismatch_count,
            match_percentage: match_percentage(sampled_count, mismatch_count),
            synced_count,
            generated_at: epoch_secs(),
        };
        info!(
            kind = %validation_type,
            sampled = report.sampled_count,
            mismatches = report.mismatch_count,
            pct = report.match_percentage,
            synced = report.synced_count,
            "validation run complete"
        );
        Ok(report)
    }

    /// Serve one validation request.
    pub async fn handle(&self, request: &ValidationRequest) -> StateResult<ValidationResponse> {
        let report = self
            .run(
                request.validation_type,
                request.table_name.as_deref(),
                request.action,
            )
            .await?;
        Ok(ValidationResponse::from_report(
            &report,
            self.config.match_threshold,
        ))
    }
}

fn match_percentage(sampled: u64, mismatches: u64) -> f64 {
    if sampled == 0 {
        return 100.0;
    }
    (sampled - mismatches) as f64 / sampled as f64 * 100.0
}

/// Request payload for a validation invocation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    #[serde(default)]
    pub validation_type: ValidationType,
    /// Table to validate; defaults to the configured set.
    pub table_name: Option<String>,
    #[serde(default)]
    pub action: ValidationAction,
}

/// Response payload for a validation invocation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub match_percentage: f64,
    pub mismatch_count: u64,
    pub sampled_count: u64,
    /// "consistent" or "inconsistent" against the configured
    /// threshold.
    pub status: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub synced_count: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl ValidationResponse {
    pub fn from_report(report: &ValidationReport, match_threshold: f64) -> Self {
        let status = if report.match_percentage >= match_threshold {
            "consistent"
        } else {
            "inconsistent"
        };
        Self {
            match_percentage: report.match_percentage,
            mismatch_count: report.mismatch_count,
            sampled_count: report.sampled_count,
            status: status.to_string(),
            synced_count: report.synced_count,
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
