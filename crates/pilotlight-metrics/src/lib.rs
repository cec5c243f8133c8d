//! pilotlight-metrics — the observability sink used by every
//! decision component.
//!
//! The control plane does not ship dashboards or alarm definitions;
//! it only emits named, dimensioned, timestamped numeric samples into
//! a [`MetricsSink`]. The deployment wires the sink to whatever the
//! observability stack consumes; [`LogSink`] renders samples as
//! structured log events and [`MemorySink`] captures them for test
//! assertions.

pub mod names;
pub mod sink;

pub use sink::{LogSink, MemorySink, MetricSample, MetricsSink, Unit};
