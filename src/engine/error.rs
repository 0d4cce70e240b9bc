//! Engine error types

use crate::plan::PlanError;

/// Errors that can occur during plan execution
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("step '{step}' timed out after {timeout_ms} ms")]
    StepTimeout { step: String, timeout_ms: u64 },

    #[error("step '{step}' exhausted its retry budget after {attempts} attempts: {message}")]
    StepExhaustedRetries {
        step: String,
        attempts: u32,
        message: String,
    },

    #[error("plan not found: {0}")]
    PlanNotFound(String),

    #[error("suite not found: {0}")]
    SuiteNotFound(String),

    #[error("environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("plan '{plan}' aborted at step '{step}': {message}")]
    PlanAborted {
        plan: String,
        step: String,
        message: String,
    },

    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("a run is already in progress: {0}")]
    AlreadyRunning(String),

    #[error("run cancelled")]
    Cancelled,
}
