//! pilotlight-validate — cross-region consistency checks.
//!
//! The validator samples records from the source region's replica and
//! point-reads each one against the target, producing a match
//! percentage per run. With the `sync` action it additionally copies
//! missing or differing records source → target, which is how a
//! failback confirms the primary has caught up before traffic moves
//! home.

pub mod validator;

pub use validator::{
    DataValidator, ValidationAction, ValidationReport, ValidationRequest, ValidationResponse,
    ValidationType, ValidatorConfig,
};
