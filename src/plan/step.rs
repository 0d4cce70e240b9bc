//! Step definitions
//!
//! A step is the smallest unit of work in a plan. The engine owns its status
//! lifecycle: `pending -> running -> {passed | failed | skipped}`, with
//! bounded retries looping back through `pending`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Whether this status is terminal (the step will not run again)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }
}

/// Classification of a terminal step failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The work callback did not finish within the step timeout
    Timeout,
    /// Every attempt in the retry budget reported a failure
    ExhaustedRetries,
}

/// A single step in a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique id, referenced by other steps' `dependencies`
    pub id: String,

    /// Human-readable name (for logging and findings)
    pub name: String,

    /// Sequence position within the plan
    pub order: u32,

    /// Current lifecycle status
    pub status: StepStatus,

    /// Stamped on the first `pending -> running` transition
    pub started_at: Option<DateTime<Utc>>,

    /// Stamped when the step reaches a terminal status
    pub ended_at: Option<DateTime<Utc>>,

    /// Number of retries consumed so far; never exceeds `max_retries`
    #[serde(default)]
    pub retry_count: u32,

    /// Retry budget for this step
    #[serde(default)]
    pub max_retries: u32,

    /// Ids of earlier steps that must be `passed` before this step starts
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Timeout for this step in milliseconds
    pub timeout: Option<u64>,

    /// Last failure message, present only when `status == failed`
    pub error: Option<String>,

    /// Classification of the failure, present only when `status == failed`
    pub failure: Option<FailureKind>,
}

impl Step {
    /// Create a new pending step with a generated id
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            order,
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            retry_count: 0,
            max_retries: 0,
            dependencies: Vec::new(),
            timeout: None,
            error: None,
            failure: None,
        }
    }

    /// Set an explicit id (useful when other steps depend on this one)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the step timeout in milliseconds
    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a dependency on an earlier step's id
    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }

    /// Whether the step has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Elapsed milliseconds between start and end, once both are stamped
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    /// Transition to `running`; stamps `started_at` on the first attempt only
    pub(crate) fn mark_running(&mut self) {
        self.status = StepStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    /// Terminal success transition
    pub(crate) fn mark_passed(&mut self) {
        self.status = StepStatus::Passed;
        self.ended_at = Some(Utc::now());
        self.error = None;
        self.failure = None;
    }

    /// Terminal failure transition with the last error message
    pub(crate) fn mark_failed(&mut self, error: impl Into<String>, kind: FailureKind) {
        self.status = StepStatus::Failed;
        self.ended_at = Some(Utc::now());
        self.error = Some(error.into());
        self.failure = Some(kind);
    }

    /// Terminal skip transition (an earlier step in the chain failed)
    pub(crate) fn mark_skipped(&mut self) {
        self.status = StepStatus::Skipped;
        self.ended_at = Some(Utc::now());
    }

    /// Reset to `pending` for the next retry attempt
    pub(crate) fn reset_for_retry(&mut self) {
        self.status = StepStatus::Pending;
        self.ended_at = None;
        self.error = None;
        self.failure = None;
    }

    /// Full reset to the authored state, for re-running a finished plan
    pub(crate) fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.started_at = None;
        self.ended_at = None;
        self.retry_count = 0;
        self.error = None;
        self.failure = None;
    }
}
