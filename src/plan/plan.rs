//! Plan and Suite definitions
//!
//! A plan is one executable pipeline: an ordered collection of steps. A suite
//! is a collection of independent plans that run and report together.
//!
//! Steps always run in `order`; dependencies are positional (a step may only
//! depend on strictly earlier steps), so a plan is a chain, not a DAG.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::step::{Step, StepStatus};

/// Status of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    InProgress,
    Completed,
    Failed,
    /// Set by deployment-style callers after compensating actions; the
    /// engine itself never transitions into this state.
    RolledBack,
}

impl PlanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }
}

/// Status of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SuiteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Errors detected when validating a plan before execution
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    #[error("step '{step}' depends on unknown step id '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("step '{step}' depends on '{dependency}', which does not precede it")]
    ForwardDependency { step: String, dependency: String },

    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),
}

/// An ordered collection of steps representing one executable pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub steps: Vec<Step>,
    pub status: PlanStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Plan {
    /// Create an empty draft plan with a generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            steps: Vec::new(),
            status: PlanStatus::Draft,
            started_at: None,
            completed_at: None,
        }
    }

    /// Append a step to the plan
    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Builder-style step append
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Elapsed milliseconds for the whole run, once terminal
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    /// Validate step ids and dependency ordering.
    ///
    /// Every dependency must name an existing step with a strictly smaller
    /// `order`. The sequential driver relies on this: by the time a step
    /// starts, all of its dependencies have already reached a terminal state.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut orders: HashMap<&str, u32> = HashMap::new();
        for step in &self.steps {
            if orders.insert(step.id.as_str(), step.order).is_some() {
                return Err(PlanError::DuplicateStepId(step.id.clone()));
            }
        }

        for step in &self.steps {
            for dep in &step.dependencies {
                match orders.get(dep.as_str()) {
                    None => {
                        return Err(PlanError::UnknownDependency {
                            step: step.name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    Some(&dep_order) if dep_order >= step.order => {
                        return Err(PlanError::ForwardDependency {
                            step: step.name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    /// Count of steps currently in the given status
    pub fn count_status(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

/// A collection of independent plans run and reported on together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub id: String,
    pub name: String,
    pub plans: Vec<Plan>,
    pub status: SuiteStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Percentage of member plans that completed, set when the suite
    /// reaches a terminal status
    pub coverage: Option<f64>,
}

impl Suite {
    /// Create an empty pending suite with a generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            plans: Vec::new(),
            status: SuiteStatus::Pending,
            started_at: None,
            completed_at: None,
            coverage: None,
        }
    }

    /// Append a member plan
    pub fn add_plan(&mut self, plan: Plan) {
        self.plans.push(plan);
    }

    /// Builder-style plan append
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Elapsed milliseconds for the whole suite run, once terminal
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }

    /// Validate every member plan
    pub fn validate(&self) -> Result<(), PlanError> {
        for plan in &self.plans {
            plan.validate()?;
        }
        Ok(())
    }
}
