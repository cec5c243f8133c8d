//! pilotlight-failover — the failover/failback state machine.
//!
//! The controller owns the `FailoverState` singleton: five phases,
//! `Normal`, `Degraded`, `FailoverInProgress`, `FailedOver`,
//! `FailbackInProgress`, advanced only through version-checked
//! compare-and-swap. Two invocations can race freely; exactly one of
//! any pair of conflicting transitions wins, the other reports
//! `conflict` and changes nothing.
//!
//! Inputs arrive two ways: periodic health evaluations (which may
//! degrade, recover, or — when enabled — auto-fail-over) and operator
//! directives (`failover` / `failback`). Traffic routing itself is an
//! external collaborator; the controller only announces a
//! [`RoutingIntent`] through the [`RoutingSink`] seam.

pub mod controller;
pub mod directive;
pub mod routing;

pub use controller::{ControllerConfig, FailoverController, SyncProbe};
pub use directive::{Directive, DirectiveResponse, Outcome};
pub use routing::{LogRouting, MemoryRouting, RoutingIntent, RoutingSink};
