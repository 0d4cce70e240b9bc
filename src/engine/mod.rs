//! Plan execution engine module
//!
//! This module contains:
//! - `config` - Engine configuration (failure policy, retry strategy)
//! - `error` - Engine error types
//! - `step_runner` - Single-step execution with retry/timeout/cancellation
//! - `driver` - Sequential chain and suite fan-out drivers
//! - `report` - Report generation from terminal plans and suites
//! - `registry` - Observable run state and the submit/start surface

pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
pub mod report;
pub mod step_runner;

pub use config::{EngineConfig, RetryPolicy, DEFAULT_RETRY_DELAY_MS};
pub use driver::PlanDriver;
pub use error::EngineError;
pub use registry::{RegistrySnapshot, RunRegistry};
pub use report::{Finding, Report, ReportGenerator, ReportSummary, Trend};
pub use step_runner::{StepOutcome, StepRunner};
