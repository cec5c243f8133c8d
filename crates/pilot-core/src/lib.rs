//! pilot-core — shared configuration for the PilotLight control plane.
//!
//! Every component of the control plane is an independently invoked,
//! stateless unit of execution. The only thing they share in-process is
//! this configuration surface, injected from the environment by the
//! external invoker. Cross-invocation state lives in the persisted
//! records of `pilotlight-state`, never here.

pub mod config;

pub use config::{ConfigError, DrConfig};
