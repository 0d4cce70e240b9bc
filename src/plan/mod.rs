//! Plan types and definitions
//!
//! This module contains all types for authoring executable plans:
//! - `step` - Step, its status lifecycle, and retry bookkeeping
//! - `plan` - Plan and Suite aggregates with their status machines
//! - `environment` - Named variable sets handed to work callbacks
//! - `work` - The `StepWork` seam where callers inject real work

pub mod environment;
pub mod plan;
pub mod step;
pub mod work;

// Re-export all public types for convenience
pub use environment::Environment;
pub use plan::{Plan, PlanError, PlanStatus, Suite, SuiteStatus};
pub use step::{FailureKind, Step, StepStatus};
pub use work::{work_fn, StepWork, WorkFn, WorkOutput};
