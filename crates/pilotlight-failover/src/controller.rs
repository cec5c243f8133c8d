//! The failover controller.
//!
//! Every phase change goes through compare-and-swap on the state
//! version; the controller never retries a lost race. Transition
//! sequences (failover, failback) are two swaps around the side
//! effects: in-progress first, then the terminal phase — so a crashed
//! invocation leaves an in-progress record a later directive for the
//! same target can resume.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use pilot_core::DrConfig;
use pilotlight_health::{HealthRecord, HealthSource};
use pilotlight_metrics::{MetricSample, MetricsSink, Unit, names};
use pilotlight_state::{FailoverPhase, FailoverState, Replica, SentinelRecord, StateResult};
use tracing::{info, warn};

use crate::directive::{Directive, DirectiveResponse, Outcome};
use crate::routing::{RoutingIntent, RoutingSink};

/// Component name written into write-verification sentinels.
const SENTINEL_SOURCE: &str = "failover-controller";

/// Thresholds and region identities the controller decides against.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub primary_region: String,
    pub standby_region: String,
    /// Scores below this count as unhealthy evaluations.
    pub warn_threshold: f64,
    /// Scores below this may trigger automatic failover.
    pub critical_threshold: f64,
    /// Lag above this degrades immediately, streak or not.
    pub lag_ceiling_secs: f64,
    /// Unhealthy evaluations in a row before degrading.
    pub consecutive_unhealthy: u32,
    /// Whether critical health runs the failover sequence without a
    /// directive.
    pub auto_failover: bool,
}

impl From<&DrConfig> for ControllerConfig {
    fn from(config: &DrConfig) -> Self {
        Self {
            primary_region: config.primary_region.clone(),
            standby_region: config.standby_region.clone(),
            warn_threshold: config.warn_threshold,
            critical_threshold: config.critical_threshold,
            lag_ceiling_secs: config.lag_ceiling_secs,
            consecutive_unhealthy: config.consecutive_unhealthy,
            auto_failover: config.auto_failover,
        }
    }
}

/// Confirmation that a failback target's data set has caught up.
/// Backed by a validation run in deployment.
#[async_trait]
pub trait SyncProbe: Send + Sync {
    async fn confirm_sync(&self, target_region: &str) -> StateResult<bool>;
}

/// Shape of one transition sequence; failover and failback share the
/// swap-verify-announce-swap structure.
struct Sequence {
    action: &'static str,
    in_progress: FailoverPhase,
    terminal: FailoverPhase,
    revert: FailoverPhase,
}

const FAILOVER_SEQ: Sequence = Sequence {
    action: "failover",
    in_progress: FailoverPhase::FailoverInProgress,
    terminal: FailoverPhase::FailedOver,
    revert: FailoverPhase::Degraded,
};

const FAILBACK_SEQ: Sequence = Sequence {
    action: "failback",
    in_progress: FailoverPhase::FailbackInProgress,
    terminal: FailoverPhase::Normal,
    revert: FailoverPhase::FailedOver,
};

/// Drives the five-phase state machine from health evaluations and
/// operator directives.
pub struct FailoverController {
    /// Home of the failover singleton. In deployment this is the
    /// replicated control table, reachable even with the primary down.
    control: Arc<dyn Replica>,
    primary: Arc<dyn Replica>,
    standby: Arc<dyn Replica>,
    health: Arc<dyn HealthSource>,
    sync_probe: Arc<dyn SyncProbe>,
    routing: Arc<dyn RoutingSink>,
    metrics: Arc<dyn MetricsSink>,
    config: ControllerConfig,
}

impl FailoverController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control: Arc<dyn Replica>,
        primary: Arc<dyn Replica>,
        standby: Arc<dyn Replica>,
        health: Arc<dyn HealthSource>,
        sync_probe: Arc<dyn SyncProbe>,
        routing: Arc<dyn RoutingSink>,
        metrics: Arc<dyn MetricsSink>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            control,
            primary,
            standby,
            health,
            sync_probe,
            routing,
            metrics,
            config,
        }
    }

    fn replica_for(&self, region: &str) -> &Arc<dyn Replica> {
        if region == self.standby.region() {
            &self.standby
        } else {
            &self.primary
        }
    }

    fn other_region(&self, region: &str) -> String {
        if region == self.config.primary_region {
            self.config.standby_region.clone()
        } else {
            self.config.primary_region.clone()
        }
    }

    /// Current failover state, initializing the singleton on first use.
    pub async fn status(&self) -> StateResult<FailoverState> {
        match self.control.failover_state().await? {
            Some(state) => Ok(state),
            None => {
                self.control
                    .init_failover_state(&self.config.primary_region)
                    .await
            }
        }
    }

    /// CAS through the control replica. `None` means a concurrent
    /// invocation advanced the version first.
    async fn try_swap(
        &self,
        expected: u64,
        next: FailoverState,
    ) -> StateResult<Option<FailoverState>> {
        match self.control.compare_and_swap(expected, next).await {
            Ok(written) => Ok(Some(written)),
            Err(e) if e.is_conflict() => {
                warn!(expected, "state version moved under us");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Conflict response, reporting whatever the winner left behind.
    async fn conflict(&self) -> StateResult<DirectiveResponse> {
        let state = self.status().await?;
        Ok(DirectiveResponse::new(Outcome::Conflict, &state)
            .with_message("a concurrent transition advanced the state"))
    }

    // ── Health-driven evaluation ──────────────────────────────────

    /// One periodic evaluation: check the active region's health and
    /// apply the degradation/recovery rules.
    pub async fn evaluate(&self) -> StateResult<DirectiveResponse> {
        let state = self.status().await?;
        let record = self.health.check(&state.active_region).await;
        self.apply_evaluation(state, &record).await
    }

    async fn apply_evaluation(
        &self,
        state: FailoverState,
        record: &HealthRecord,
    ) -> StateResult<DirectiveResponse> {
        match state.current_state {
            FailoverPhase::Normal => self.evaluate_normal(state, record).await,
            FailoverPhase::Degraded => self.evaluate_degraded(state, record).await,
            // In-progress and failed-over postures are directive
            // territory; periodic evaluation keeps its hands off.
            _ => Ok(DirectiveResponse::new(Outcome::NoOp, &state)),
        }
    }

    async fn evaluate_normal(
        &self,
        state: FailoverState,
        record: &HealthRecord,
    ) -> StateResult<DirectiveResponse> {
        let lag_over_ceiling = record
            .replication_lag_seconds
            .is_some_and(|lag| lag > self.config.lag_ceiling_secs);
        let unhealthy = lag_over_ceiling || record.health_score < self.config.warn_threshold;

        if !unhealthy {
            if state.unhealthy_streak == 0 {
                return Ok(DirectiveResponse::new(Outcome::NoOp, &state));
            }
            // Healthy again before the streak ran out.
            let next = FailoverState {
                unhealthy_streak: 0,
                ..state.clone()
            };
            return match self.try_swap(state.version, next).await? {
                Some(written) => Ok(DirectiveResponse::new(Outcome::NoOp, &written)
                    .with_message("unhealthy streak reset")),
                None => self.conflict().await,
            };
        }

        let streak = state.unhealthy_streak + 1;
        if lag_over_ceiling || streak >= self.config.consecutive_unhealthy {
            let next = FailoverState {
                current_state: FailoverPhase::Degraded,
                last_transition_at: epoch_secs(),
                unhealthy_streak: streak,
                ..state.clone()
            };
            return match self.try_swap(state.version, next).await? {
                Some(written) => {
                    info!(
                        region = %written.active_region,
                        score = record.health_score,
                        lag = ?record.replication_lag_seconds,
                        streak,
                        "entering degraded"
                    );
                    Ok(DirectiveResponse::new(Outcome::Transitioned, &written)
                        .with_message("active region degraded"))
                }
                None => self.conflict().await,
            };
        }

        // Count the evaluation, stay normal.
        let next = FailoverState {
            unhealthy_streak: streak,
            ..state.clone()
        };
        match self.try_swap(state.version, next).await? {
            Some(written) => Ok(DirectiveResponse::new(Outcome::NoOp, &written).with_message(
                format!(
                    "unhealthy evaluation {streak} of {}",
                    self.config.consecutive_unhealthy
                ),
            )),
            None => self.conflict().await,
        }
    }

    async fn evaluate_degraded(
        &self,
        state: FailoverState,
        record: &HealthRecord,
    ) -> StateResult<DirectiveResponse> {
        if record.health_score >= self.config.warn_threshold {
            let next = FailoverState {
                current_state: FailoverPhase::Normal,
                last_transition_at: epoch_secs(),
                unhealthy_streak: 0,
                ..state.clone()
            };
            return match self.try_swap(state.version, next).await? {
                Some(written) => {
                    info!(region = %written.active_region, "recovered to normal");
                    Ok(DirectiveResponse::new(Outcome::Transitioned, &written)
                        .with_message("health recovered"))
                }
                None => self.conflict().await,
            };
        }

        if self.config.auto_failover && record.health_score < self.config.critical_threshold {
            let target = self.other_region(&state.active_region);
            info!(
                score = record.health_score,
                target = %target,
                "critical health, automatic failover"
            );
            return self.run_sequence(state, &target, &FAILOVER_SEQ).await;
        }

        Ok(DirectiveResponse::new(Outcome::NoOp, &state)
            .with_message("degraded, awaiting recovery or directive"))
    }

    // ── Directive execution ───────────────────────────────────────

    /// Execute one operator directive.
    pub async fn execute(&self, directive: &Directive) -> StateResult<DirectiveResponse> {
        let state = self.status().await?;

        if directive.target_region.is_empty() {
            return Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                .with_message("empty target region"));
        }
        if directive.target_region != self.config.primary_region
            && directive.target_region != self.config.standby_region
        {
            return Ok(DirectiveResponse::new(Outcome::Rejected, &state).with_message(format!(
                "unknown target region {:?}",
                directive.target_region
            )));
        }

        match directive.action.as_str() {
            "failover" => self.handle_failover(state, directive).await,
            "failback" => self.handle_failback(state, directive).await,
            other => Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                .with_message(format!("unknown action {other:?}"))),
        }
    }

    async fn handle_failover(
        &self,
        state: FailoverState,
        directive: &Directive,
    ) -> StateResult<DirectiveResponse> {
        let target = directive.target_region.as_str();
        match state.current_state {
            FailoverPhase::FailedOver if state.active_region == target => {
                // Redelivered directive for a completed failover.
                Ok(DirectiveResponse::new(Outcome::NoOp, &state)
                    .with_message(format!("already failed over to {target}")))
            }
            FailoverPhase::FailedOver => {
                Ok(DirectiveResponse::new(Outcome::Rejected, &state).with_message(format!(
                    "failed over to {}; fail back first",
                    state.active_region
                )))
            }
            FailoverPhase::FailoverInProgress if state.active_region == target => {
                info!(target, "resuming interrupted failover");
                self.finish_sequence(state, target, &FAILOVER_SEQ).await
            }
            FailoverPhase::FailoverInProgress | FailoverPhase::FailbackInProgress => {
                Ok(DirectiveResponse::new(Outcome::Rejected, &state).with_message(format!(
                    "{} already in progress",
                    state.current_state
                )))
            }
            FailoverPhase::Normal | FailoverPhase::Degraded => {
                if state.active_region == target {
                    return Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                        .with_message(format!("{target} is already active")));
                }
                if state.current_state == FailoverPhase::Normal && !directive.force {
                    return Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                        .with_message("system is healthy; use force to fail over anyway"));
                }
                if state.current_state == FailoverPhase::Degraded && !directive.force {
                    // The degradation may have passed since the
                    // directive was issued; re-check before moving
                    // traffic.
                    let record = self.health.check(&state.active_region).await;
                    if record.health_score >= self.config.warn_threshold {
                        let next = FailoverState {
                            current_state: FailoverPhase::Normal,
                            last_transition_at: epoch_secs(),
                            unhealthy_streak: 0,
                            ..state.clone()
                        };
                        return match self.try_swap(state.version, next).await? {
                            Some(written) => {
                                info!("health recovered, failover aborted");
                                Ok(DirectiveResponse::new(Outcome::Rejected, &written)
                                    .with_message("health recovered; failover aborted"))
                            }
                            None => self.conflict().await,
                        };
                    }
                }
                self.run_sequence(state, target, &FAILOVER_SEQ).await
            }
        }
    }

    async fn handle_failback(
        &self,
        state: FailoverState,
        directive: &Directive,
    ) -> StateResult<DirectiveResponse> {
        let target = directive.target_region.as_str();
        match state.current_state {
            FailoverPhase::Normal if state.active_region == target => {
                Ok(DirectiveResponse::new(Outcome::NoOp, &state)
                    .with_message(format!("already serving from {target}")))
            }
            FailoverPhase::FailbackInProgress if state.active_region == target => {
                info!(target, "resuming interrupted failback");
                self.finish_sequence(state, target, &FAILBACK_SEQ).await
            }
            FailoverPhase::FailedOver => {
                if state.active_region == target {
                    return Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                        .with_message(format!("{target} is already active")));
                }
                if !directive.force {
                    let record = self.health.check(target).await;
                    if !record.store_reachable
                        || record.health_score < self.config.warn_threshold
                    {
                        return Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                            .with_message(format!(
                                "{target} is not healthy; use force to fail back anyway"
                            )));
                    }
                    match self.sync_probe.confirm_sync(target).await {
                        Ok(true) => {}
                        Ok(false) => {
                            return Ok(DirectiveResponse::new(Outcome::Rejected, &state)
                                .with_message(
                                    "target data not synchronized; run a sync validation first",
                                ));
                        }
                        Err(e) => {
                            return Ok(DirectiveResponse::new(Outcome::Failed, &state)
                                .with_message(format!("sync confirmation failed: {e}")));
                        }
                    }
                }
                self.run_sequence(state, target, &FAILBACK_SEQ).await
            }
            _ => Ok(DirectiveResponse::new(Outcome::Rejected, &state).with_message(format!(
                "failback requires failed_over, currently {}",
                state.current_state
            ))),
        }
    }

    // ── Transition sequences ──────────────────────────────────────

    async fn run_sequence(
        &self,
        state: FailoverState,
        target: &str,
        seq: &Sequence,
    ) -> StateResult<DirectiveResponse> {
        let next = FailoverState {
            current_state: seq.in_progress,
            active_region: target.to_string(),
            last_transition_at: epoch_secs(),
            ..state.clone()
        };
        match self.try_swap(state.version, next).await? {
            Some(in_progress) => self.finish_sequence(in_progress, target, seq).await,
            None => self.conflict().await,
        }
    }

    /// Complete a sequence from its in-progress record: verify the
    /// target's write path, announce routing, land the terminal phase.
    async fn finish_sequence(
        &self,
        in_progress: FailoverState,
        target: &str,
        seq: &Sequence,
    ) -> StateResult<DirectiveResponse> {
        if let Err(e) = self.verify_write_path(target).await {
            warn!(target, action = seq.action, error = %e, "write verification failed, reverting");
            let revert = FailoverState {
                current_state: seq.revert,
                active_region: self.other_region(target),
                last_transition_at: epoch_secs(),
                ..in_progress.clone()
            };
            return match self.try_swap(in_progress.version, revert).await? {
                Some(reverted) => Ok(DirectiveResponse::new(Outcome::Failed, &reverted)
                    .with_message(format!("{} write verification failed: {e}", seq.action))),
                None => self.conflict().await,
            };
        }

        self.routing
            .announce(&RoutingIntent::new(target, seq.action));

        let next = FailoverState {
            current_state: seq.terminal,
            active_region: target.to_string(),
            last_transition_at: epoch_secs(),
            unhealthy_streak: 0,
            ..in_progress.clone()
        };
        match self.try_swap(in_progress.version, next).await? {
            Some(written) => {
                self.metrics.record(
                    MetricSample::new(names::FAILOVER_EVENT, 1.0)
                        .with_unit(Unit::Count)
                        .with_dimension("action", seq.action)
                        .with_dimension("targetRegion", target),
                );
                info!(target, action = seq.action, version = written.version, "transition complete");
                Ok(DirectiveResponse::new(Outcome::Transitioned, &written))
            }
            None => self.conflict().await,
        }
    }

    /// Prove the region can take writes before pointing traffic at it.
    async fn verify_write_path(&self, region: &str) -> StateResult<()> {
        let now = epoch_secs();
        self.replica_for(region)
            .put_sentinel(&SentinelRecord {
                id: format!("verify-{region}-{now}"),
                timestamp: now,
                source: SENTINEL_SOURCE.to_string(),
            })
            .await
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
    use crate::routing::MemoryRouting;
    use pilotlight_metrics::MemorySink;
    use pilotlight_state::RegionStore;
    use pilotlight_state::testing::FlakyReplica;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Health source returning whatever the test dialed in.
    struct StubHealth {
        score: Mutex<f64>,
        lag: Mutex<Option<f64>>,
        reachable: AtomicBool,
    }

    impl StubHealth {
        fn healthy() -> Self {
            Self {
                score: Mutex::new(1.0),
                lag: Mutex::new(Some(1.0)),
                reachable: AtomicBool::new(true),
            }
        }

        fn set_score(&self, score: f64) {
            *self.score.lock().unwrap() = score;
        }

        fn set_lag(&self, lag: Option<f64>) {
            *self.lag.lock().unwrap() = lag;
        }

        fn set_reachable(&self, reachable: bool) {
            self.reachable.store(reachable, Ordering::Relaxed);
        }
    }

    #[async_trait]
    impl HealthSource for StubHealth {
        async fn check(&self, region: &str) -> HealthRecord {
            HealthRecord {
                region: region.to_string(),
                timestamp: epoch_secs(),
                store_reachable: self.reachable.load(Ordering::Relaxed),
                replication_lag_seconds: *self.lag.lock().unwrap(),
                health_score: *self.score.lock().unwrap(),
            }
        }
    }

    struct StaticSync(bool);

    #[async_trait]
    impl SyncProbe for StaticSync {
        async fn confirm_sync(&self, _target_region: &str) -> StateResult<bool> {
            Ok(self.0)
        }
    }

    struct Harness {
        controller: FailoverController,
        control: RegionStore,
        standby: Arc<FlakyReplica>,
        health: Arc<StubHealth>,
        routing: Arc<MemoryRouting>,
        metrics: Arc<MemorySink>,
    }

    fn harness(auto_failover: bool, synced: bool) -> Harness {
        let control = RegionStore::open_in_memory("control").unwrap();
        let primary = RegionStore::open_in_memory("us-east-1").unwrap();
        let standby = Arc::new(FlakyReplica::new(
            RegionStore::open_in_memory("us-west-2").unwrap(),
        ));
        let health = Arc::new(StubHealth::healthy());
        let routing = Arc::new(MemoryRouting::new());
        let metrics = Arc::new(MemorySink::new());

        let mut config = ControllerConfig::from(&DrConfig::for_tests("us-east-1", "us-west-2"));
        config.auto_failover = auto_failover;

        let controller = FailoverController::new(
            Arc::new(control.clone()),
            Arc::new(primary),
            standby.clone(),
            health.clone(),
            Arc::new(StaticSync(synced)),
            routing.clone(),
            metrics.clone(),
            config,
        );
        Harness {
            controller,
            control,
            standby,
            health,
            routing,
            metrics,
        }
    }

    fn current(h: &Harness) -> FailoverState {
        h.control.failover_state().unwrap().unwrap()
    }

    /// Drive the machine to `Degraded` through two unhealthy
    /// evaluations.
    async fn degrade(h: &Harness) {
        h.health.set_score(0.0);
        h.controller.evaluate().await.unwrap();
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.current_state, FailoverPhase::Degraded);
    }

    // ── Evaluation rules ──────────────────────────────────────────

    #[tokio::test]
    async fn healthy_evaluation_is_a_noop() {
        let h = harness(false, true);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::NoOp);
        assert_eq!(response.current_state, FailoverPhase::Normal);

        // Nothing written beyond initialization.
        assert_eq!(current(&h).version, 1);
    }

    #[tokio::test]
    async fn degradation_requires_consecutive_unhealthy_evaluations() {
        let h = harness(false, true);
        h.health.set_score(0.1);

        let first = h.controller.evaluate().await.unwrap();
        assert_eq!(first.outcome, Outcome::NoOp);
        assert_eq!(first.current_state, FailoverPhase::Normal);
        assert_eq!(current(&h).unhealthy_streak, 1);

        let second = h.controller.evaluate().await.unwrap();
        assert_eq!(second.outcome, Outcome::Transitioned);
        assert_eq!(second.current_state, FailoverPhase::Degraded);
    }

    #[tokio::test]
    async fn single_recovery_resets_the_streak() {
        let h = harness(false, true);
        h.health.set_score(0.1);
        h.controller.evaluate().await.unwrap();
        assert_eq!(current(&h).unhealthy_streak, 1);

        h.health.set_score(0.9);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::NoOp);
        assert_eq!(current(&h).unhealthy_streak, 0);

        // The earlier blip does not stack with a later one.
        h.health.set_score(0.1);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.current_state, FailoverPhase::Normal);
        assert_eq!(current(&h).unhealthy_streak, 1);
    }

    #[tokio::test]
    async fn lag_over_ceiling_degrades_immediately() {
        let h = harness(false, true);
        // Score alone is fine; the ceiling rule fires regardless.
        h.health.set_score(0.9);
        h.health.set_lag(Some(400.0));

        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::Degraded);
    }

    #[tokio::test]
    async fn degraded_recovers_to_normal() {
        let h = harness(false, true);
        degrade(&h).await;

        h.health.set_score(0.9);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::Normal);
        assert_eq!(current(&h).unhealthy_streak, 0);
    }

    #[tokio::test]
    async fn degraded_without_auto_failover_waits() {
        let h = harness(false, true);
        degrade(&h).await;

        h.health.set_score(0.0);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::NoOp);
        assert_eq!(response.current_state, FailoverPhase::Degraded);
        assert!(h.routing.intents().is_empty());
    }

    #[tokio::test]
    async fn auto_failover_fires_below_critical() {
        let h = harness(true, true);
        degrade(&h).await;

        h.health.set_score(0.1);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::FailedOver);
        assert_eq!(response.active_region, "us-west-2");

        let intent = h.routing.last().unwrap();
        assert_eq!(intent.active_region, "us-west-2");
        assert_eq!(intent.reason, "failover");
        assert_eq!(h.metrics.last_value(names::FAILOVER_EVENT), Some(1.0));
    }

    #[tokio::test]
    async fn degraded_above_critical_does_not_auto_fail_over() {
        let h = harness(true, true);
        degrade(&h).await;

        // Unhealthy but not critical.
        h.health.set_score(0.3);
        let response = h.controller.evaluate().await.unwrap();
        assert_eq!(response.outcome, Outcome::NoOp);
        assert_eq!(response.current_state, FailoverPhase::Degraded);
    }

    // ── Directive validation ──────────────────────────────────────

    #[tokio::test]
    async fn unknown_action_is_rejected_without_side_effects() {
        let h = harness(false, true);
        let before = h.controller.status().await.unwrap();

        let directive = Directive {
            action: "reboot".to_string(),
            target_region: "us-west-2".to_string(),
            force: false,
        };
        let response = h.controller.execute(&directive).await.unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
        assert_eq!(current(&h), before);
    }

    #[tokio::test]
    async fn empty_target_is_rejected() {
        let h = harness(false, true);
        let response = h
            .controller
            .execute(&Directive::failover("", true))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
        assert_eq!(current(&h).version, 1);
    }

    #[tokio::test]
    async fn unknown_target_region_is_rejected() {
        let h = harness(false, true);
        let response = h
            .controller
            .execute(&Directive::failover("eu-central-1", true))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn failover_from_healthy_normal_requires_force() {
        let h = harness(false, true);
        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
        assert_eq!(current(&h).current_state, FailoverPhase::Normal);
    }

    // ── Failover sequences ────────────────────────────────────────

    #[tokio::test]
    async fn failover_directive_from_degraded_completes() {
        let h = harness(false, true);
        degrade(&h).await;

        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::FailedOver);
        assert_eq!(response.active_region, "us-west-2");

        let state = current(&h);
        assert_eq!(state.current_state, FailoverPhase::FailedOver);
        assert_eq!(state.unhealthy_streak, 0);

        // The standby's write path was proven with a sentinel.
        let sentinel = h.standby.inner().latest_sentinel().unwrap().unwrap();
        assert_eq!(sentinel.source, SENTINEL_SOURCE);
    }

    #[tokio::test]
    async fn redelivered_failover_is_a_noop_with_unchanged_version() {
        let h = harness(false, true);
        degrade(&h).await;
        let directive = Directive::failover("us-west-2", false);
        h.controller.execute(&directive).await.unwrap();
        let version = current(&h).version;

        let response = h.controller.execute(&directive).await.unwrap();
        assert_eq!(response.outcome, Outcome::NoOp);
        assert_eq!(response.current_state, FailoverPhase::FailedOver);
        assert_eq!(current(&h).version, version);

        // Exactly one routing announcement and one event.
        assert_eq!(h.routing.intents().len(), 1);
        assert_eq!(h.metrics.named(names::FAILOVER_EVENT).len(), 1);
    }

    #[tokio::test]
    async fn unforced_failover_after_recovery_is_rejected_and_reverts() {
        let h = harness(false, true);
        degrade(&h).await;

        // Health recovered between the degradation and the directive.
        h.health.set_score(0.9);
        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
        assert_eq!(response.current_state, FailoverPhase::Normal);
        assert_eq!(current(&h).current_state, FailoverPhase::Normal);
        assert!(h.routing.intents().is_empty());
    }

    #[tokio::test]
    async fn forced_failover_from_normal_is_an_operator_override() {
        let h = harness(false, true);
        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", true))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::FailedOver);
    }

    #[tokio::test]
    async fn failed_write_verification_reverts_to_degraded() {
        let h = harness(false, true);
        degrade(&h).await;
        h.standby.fail_sentinel_writes.store(true, Ordering::Relaxed);

        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Failed);
        assert_eq!(response.current_state, FailoverPhase::Degraded);

        let state = current(&h);
        assert_eq!(state.current_state, FailoverPhase::Degraded);
        assert_eq!(state.active_region, "us-east-1");
        assert!(h.routing.intents().is_empty());

        // One attempt per directive; the next one may retry.
        h.standby.fail_sentinel_writes.store(false, Ordering::Relaxed);
        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
    }

    #[tokio::test]
    async fn interrupted_failover_is_resumable() {
        let h = harness(false, true);
        degrade(&h).await;

        // Simulate a crash after the first swap: the record is parked
        // in failover_in_progress.
        let state = current(&h);
        let parked = FailoverState {
            current_state: FailoverPhase::FailoverInProgress,
            active_region: "us-west-2".to_string(),
            ..state.clone()
        };
        h.control.compare_and_swap(state.version, parked).unwrap();

        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::FailedOver);
        assert_eq!(h.routing.last().unwrap().active_region, "us-west-2");
    }

    // ── Failback ──────────────────────────────────────────────────

    async fn fail_over(h: &Harness) {
        degrade(h).await;
        let response = h
            .controller
            .execute(&Directive::failover("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
    }

    #[tokio::test]
    async fn failback_requires_failed_over() {
        let h = harness(false, true);
        let response = h
            .controller
            .execute(&Directive::failback("us-east-1", false))
            .await
            .unwrap();
        // Normal with the target already active: a redelivered
        // completed failback, so a no-op.
        assert_eq!(response.outcome, Outcome::NoOp);

        degrade(&h).await;
        let response = h
            .controller
            .execute(&Directive::failback("us-west-2", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn unforced_failback_requires_sync_confirmation() {
        let h = harness(false, false);
        fail_over(&h).await;

        h.health.set_score(0.9);
        let response = h
            .controller
            .execute(&Directive::failback("us-east-1", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
        assert_eq!(current(&h).current_state, FailoverPhase::FailedOver);
    }

    #[tokio::test]
    async fn unforced_failback_requires_healthy_target() {
        let h = harness(false, true);
        fail_over(&h).await;

        h.health.set_score(0.1);
        let response = h
            .controller
            .execute(&Directive::failback("us-east-1", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);

        h.health.set_score(0.9);
        h.health.set_reachable(false);
        let response = h
            .controller
            .execute(&Directive::failback("us-east-1", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn failback_lands_in_normal_and_announces_routing() {
        let h = harness(false, true);
        fail_over(&h).await;

        h.health.set_score(0.9);
        let response = h
            .controller
            .execute(&Directive::failback("us-east-1", false))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::Normal);
        assert_eq!(response.active_region, "us-east-1");

        let intent = h.routing.last().unwrap();
        assert_eq!(intent.active_region, "us-east-1");
        assert_eq!(intent.reason, "failback");

        let events = h.metrics.named(names::FAILOVER_EVENT);
        assert_eq!(events.len(), 2);
        assert!(events[1]
            .dimensions
            .contains(&("action".to_string(), "failback".to_string())));
    }

    #[tokio::test]
    async fn forced_failback_skips_the_preconditions() {
        let h = harness(false, false);
        fail_over(&h).await;

        // Primary still unhealthy and unsynced, but the operator says
        // go.
        h.health.set_score(0.0);
        let response = h
            .controller
            .execute(&Directive::failback("us-east-1", true))
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Transitioned);
        assert_eq!(response.current_state, FailoverPhase::Normal);
    }

    // ── Concurrency ───────────────────────────────────────────────

    #[tokio::test]
    async fn racing_transitions_produce_one_winner_and_one_conflict() {
        let h = harness(false, true);
        degrade(&h).await;
        let stale = current(&h);

        // A concurrent invocation advances the state first.
        let rival = FailoverState {
            current_state: FailoverPhase::FailoverInProgress,
            active_region: "us-west-2".to_string(),
            ..stale.clone()
        };
        h.control.compare_and_swap(stale.version, rival).unwrap();

        // Our controller read `stale` before the rival's write: feed
        // the stale snapshot straight into the evaluation path.
        h.health.set_score(0.9);
        let record = h.health.check("us-east-1").await;
        let response = h
            .controller
            .apply_evaluation(stale, &record)
            .await
            .unwrap();
        assert_eq!(response.outcome, Outcome::Conflict);

        // The winner's write is intact.
        let state = current(&h);
        assert_eq!(state.current_state, FailoverPhase::FailoverInProgress);
        assert_eq!(state.version, 4);
    }
}
