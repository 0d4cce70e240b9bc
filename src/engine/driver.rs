//! Plan driver - sequential chain and suite fan-out execution
//!
//! Sequential chain mode drives one plan: steps run strictly in `order`, and
//! step *n+1* never starts before step *n* is terminal. Steps typically form
//! an ordered pipeline (provision, deploy, smoke-test, cutover) where later
//! stages are meaningless after an earlier one fails, so a hard failure
//! halts the chain and the remaining steps are marked skipped.
//!
//! Fan-out mode drives a suite: every member plan is submitted to sequential
//! mode concurrently and the driver joins on all of them. One plan's failure
//! never aborts its siblings; the suite must report on every case.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::config::EngineConfig;
use super::error::EngineError;
use super::step_runner::StepRunner;
use crate::plan::{Environment, Plan, PlanStatus, StepStatus, StepWork, Suite, SuiteStatus};

/// Drives plans and suites to a terminal status
#[derive(Debug, Clone)]
pub struct PlanDriver {
    config: EngineConfig,
}

impl PlanDriver {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a plan in sequential chain mode: `draft -> in_progress ->
    /// {completed | failed}`.
    ///
    /// With `abort_on_first_failure` set, the first step to exhaust its
    /// retries surfaces as [`EngineError::PlanAborted`]; the plan is still
    /// left in its terminal `failed` state first. Otherwise the failure is
    /// recorded only in the plan's terminal status.
    #[instrument(skip(self, plan, work, env, cancel), fields(plan = %plan.name))]
    pub async fn run_plan(
        &self,
        plan: &mut Plan,
        work: &dyn StepWork,
        env: &Environment,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        plan.validate()?;
        plan.steps.sort_by_key(|s| s.order);

        // Re-running a finished plan starts from the authored state; the
        // previously generated report keeps its own frozen copies
        for step in &mut plan.steps {
            step.reset();
        }

        info!(steps = plan.steps.len(), env = %env.name, "starting plan");
        plan.status = PlanStatus::InProgress;
        plan.started_at = Some(Utc::now());
        plan.completed_at = None;

        let runner = StepRunner::new(&self.config);
        let mut first_failure: Option<(String, String)> = None;

        for index in 0..plan.steps.len() {
            if first_failure.is_some() {
                plan.steps[index].mark_skipped();
                continue;
            }

            if !self.dependencies_passed(plan, index) {
                debug!(step = %plan.steps[index].name, "dependencies not passed, skipping");
                plan.steps[index].mark_skipped();
                continue;
            }

            let step = &mut plan.steps[index];
            let outcome = match runner.execute(step, work, env, cancel).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Cancellation: leave the plan non-terminal
                    return Err(e);
                }
            };

            if !outcome.success {
                first_failure = Some((step.name.clone(), outcome.message));
            }
        }

        plan.completed_at = Some(Utc::now());

        if let Some((step, message)) = first_failure {
            plan.status = PlanStatus::Failed;
            warn!(step = %step, "plan failed: {}", message);
            if self.config.abort_on_first_failure {
                return Err(EngineError::PlanAborted {
                    plan: plan.name.clone(),
                    step,
                    message,
                });
            }
            return Ok(());
        }

        // Completed iff every step passed; a skipped step counts against it
        let all_passed = plan.steps.iter().all(|s| s.status == StepStatus::Passed);
        plan.status = if all_passed {
            PlanStatus::Completed
        } else {
            PlanStatus::Failed
        };
        info!(status = ?plan.status, elapsed_ms = plan.duration_ms().unwrap_or(0), "plan finished");
        Ok(())
    }

    /// Run a suite in fan-out mode: all member plans run concurrently
    /// (bounded by `max_concurrent_plans`) and the suite is finalized only
    /// after every plan has reached a terminal state.
    #[instrument(skip(self, suite, work, env, cancel), fields(suite = %suite.name))]
    pub async fn run_suite(
        &self,
        suite: &mut Suite,
        work: &dyn StepWork,
        env: &Environment,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        suite.validate()?;

        info!(plans = suite.plans.len(), env = %env.name, "starting suite");
        suite.status = SuiteStatus::Running;
        suite.started_at = Some(Utc::now());

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_plans.max(1)));

        let futures: Vec<_> = suite
            .plans
            .iter_mut()
            .map(|plan| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    match self.run_plan(plan, work, env, cancel).await {
                        Ok(()) => Ok(()),
                        Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
                        Err(e) => {
                            // Individual plan failures are tolerated; the
                            // plan's own terminal status carries the detail
                            warn!(plan = %plan.name, "plan failed within suite: {}", e);
                            Ok(())
                        }
                    }
                }
            })
            .collect();

        let results = join_all(futures).await;
        if results.iter().any(|r| r.is_err()) {
            return Err(EngineError::Cancelled);
        }

        suite.completed_at = Some(Utc::now());

        let total = suite.plans.len();
        let passed = suite
            .plans
            .iter()
            .filter(|p| p.status == PlanStatus::Completed)
            .count();
        suite.coverage = Some(if total == 0 {
            100.0
        } else {
            passed as f64 / total as f64 * 100.0
        });
        suite.status = if passed == total {
            SuiteStatus::Completed
        } else {
            SuiteStatus::Failed
        };

        info!(
            status = ?suite.status,
            coverage = suite.coverage.unwrap_or(0.0),
            "suite finished"
        );
        Ok(())
    }

    /// Whether every dependency of `plan.steps[index]` reached `passed`.
    ///
    /// Validation guarantees dependencies precede the step, so by the time
    /// the chain reaches it they are all terminal.
    fn dependencies_passed(&self, plan: &Plan, index: usize) -> bool {
        let (earlier, rest) = plan.steps.split_at(index);
        rest[0].dependencies.iter().all(|dep| {
            earlier
                .iter()
                .any(|s| s.id == *dep && s.status == StepStatus::Passed)
        })
    }
}
