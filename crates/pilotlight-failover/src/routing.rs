//! The routing-intent seam.
//!
//! Moving traffic between regions is DNS/router territory, outside the
//! control plane. The controller announces where traffic should go;
//! the deployment wires the sink to whatever actually shifts it.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::info;

/// A declaration of which region should serve traffic, and why.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingIntent {
    pub active_region: String,
    /// The transition that produced the intent ("failover"/"failback").
    pub reason: String,
    /// Unix timestamp of the announcement.
    pub timestamp: u64,
}

impl RoutingIntent {
    pub fn new(active_region: &str, reason: &str) -> Self {
        Self {
            active_region: active_region.to_string(),
            reason: reason.to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// Sink for routing intents. Announcing must never fail the caller;
/// the external router converges on the latest intent.
pub trait RoutingSink: Send + Sync {
    fn announce(&self, intent: &RoutingIntent);
}

/// Renders intents as structured log events.
pub struct LogRouting;

impl RoutingSink for LogRouting {
    fn announce(&self, intent: &RoutingIntent) {
        info!(
            target: "pilotlight::routing",
            active_region = %intent.active_region,
            reason = %intent.reason,
            "routing intent"
        );
    }
}

/// Captures intents in memory for test assertions.
#[derive(Default)]
pub struct MemoryRouting {
    intents: Mutex<Vec<RoutingIntent>>,
}

impl MemoryRouting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> Vec<RoutingIntent> {
        self.intents.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<RoutingIntent> {
        self.intents.lock().unwrap().last().cloned()
    }
}

impl RoutingSink for MemoryRouting {
    fn announce(&self, intent: &RoutingIntent) {
        self.intents.lock().unwrap().push(intent.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_routing_keeps_announcement_order() {
        let routing = MemoryRouting::new();
        routing.announce(&RoutingIntent::new("us-west-2", "failover"));
        routing.announce(&RoutingIntent::new("us-east-1", "failback"));

        assert_eq!(routing.intents().len(), 2);
        let last = routing.last().unwrap();
        assert_eq!(last.active_region, "us-east-1");
        assert_eq!(last.reason, "failback");
    }
}
