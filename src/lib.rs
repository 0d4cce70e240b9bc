//! # stepchain
//!
//! A workflow step execution engine: drives ordered collections of discrete
//! steps with retry, timeout, dependency, cancellation, and aggregated-report
//! semantics.
//!
//! ## Features
//!
//! - **Sequential chain mode** - Steps run strictly in order; step *n+1*
//!   never starts before step *n* is terminal
//! - **Parallel fan-out mode** - Independent plans in a suite run
//!   concurrently and are joined before the suite is finalized
//! - **Bounded retries** - Fixed 5-second delay by default, with exponential
//!   and jittered strategies available
//! - **Per-step timeouts and cancellation** - Honored at every suspension
//!   point
//! - **Reports** - Immutable post-run snapshots with counts, findings, and
//!   rule-based recommendations
//!
//! The engine has zero knowledge of deployment or test semantics: callers
//! inject a [`StepWork`] callback, which may be a process call, an HTTP
//! probe, or an assertion.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stepchain::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let plan = Plan::new("deploy")
//!         .with_step(Step::new("provision", 1))
//!         .with_step(Step::new("smoke-test", 2).with_max_retries(2));
//!
//!     let mut registry = RunRegistry::new(EngineConfig::default());
//!     registry.register_environment(Environment::new("staging"));
//!     let plan_id = registry.submit(plan);
//!
//!     let work = work_fn(|step: Step, env: Environment| async move {
//!         WorkOutput::passed(format!("{} on {}", step.name, env.name))
//!     });
//!
//!     let report = registry.start(&plan_id, "staging", &work).await?;
//!     println!("success rate: {}", report.summary.success_rate);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod plan;

// Re-export main types
pub use engine::{
    EngineConfig, EngineError, Finding, PlanDriver, RegistrySnapshot, Report, ReportGenerator,
    ReportSummary, RetryPolicy, RunRegistry, StepOutcome, StepRunner, Trend,
    DEFAULT_RETRY_DELAY_MS,
};
pub use plan::{
    work_fn, Environment, FailureKind, Plan, PlanError, PlanStatus, Step, StepStatus, StepWork,
    Suite, SuiteStatus, WorkFn, WorkOutput,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{
        EngineConfig, EngineError, PlanDriver, RegistrySnapshot, Report, ReportGenerator,
        RetryPolicy, RunRegistry, StepRunner,
    };
    pub use crate::plan::{
        work_fn, Environment, FailureKind, Plan, PlanStatus, Step, StepStatus, StepWork, Suite,
        SuiteStatus, WorkOutput,
    };
}
