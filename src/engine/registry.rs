//! Run registry - observable engine state
//!
//! The registry is an explicit context object (one per engine instance, not
//! a process-wide singleton) holding the known plans, suites, and reports,
//! plus the single currently-running pointer and flag. Exactly one run is
//! active at a time; while it runs, only the driver mutates the plan, and
//! external observers only ever see cloned snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::config::EngineConfig;
use super::driver::PlanDriver;
use super::error::EngineError;
use super::report::{Report, ReportGenerator};
use crate::plan::{Environment, Plan, PlanStatus, StepWork, Suite};

/// Read-only projection of the registry for external observers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub plans: Vec<Plan>,
    pub suites: Vec<Suite>,
    pub reports: Vec<Report>,

    /// Id of the plan or suite currently running, if any
    pub current_run: Option<String>,
    pub running: bool,
}

/// Holds engine state across runs and drives submitted plans
pub struct RunRegistry {
    driver: PlanDriver,
    plans: HashMap<String, Plan>,
    suites: HashMap<String, Suite>,
    reports: Vec<Report>,
    environments: HashMap<String, Environment>,
    current_run: Option<String>,
    running: bool,
    cancel: CancellationToken,
    snapshot_tx: watch::Sender<RegistrySnapshot>,
    // Kept so publishing never fails with no outside subscribers
    _snapshot_rx: watch::Receiver<RegistrySnapshot>,
}

impl RunRegistry {
    pub fn new(config: EngineConfig) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(RegistrySnapshot::default());
        Self {
            driver: PlanDriver::new(config),
            plans: HashMap::new(),
            suites: HashMap::new(),
            reports: Vec::new(),
            environments: HashMap::new(),
            current_run: None,
            running: false,
            cancel: CancellationToken::new(),
            snapshot_tx,
            _snapshot_rx: snapshot_rx,
        }
    }

    /// Register a named environment for later runs
    pub fn register_environment(&mut self, env: Environment) {
        self.environments.insert(env.name.clone(), env);
    }

    /// Add a plan in draft state; returns its id
    pub fn submit(&mut self, mut plan: Plan) -> String {
        plan.status = PlanStatus::Draft;
        let id = plan.id.clone();
        info!(plan = %plan.name, id = %id, "plan submitted");
        self.plans.insert(id.clone(), plan);
        self.publish();
        id
    }

    /// Add a suite in pending state; returns its id
    pub fn submit_suite(&mut self, suite: Suite) -> String {
        let id = suite.id.clone();
        info!(suite = %suite.name, id = %id, "suite submitted");
        self.suites.insert(id.clone(), suite);
        self.publish();
        id
    }

    /// Whether a run is currently active
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Id of the currently running plan or suite
    pub fn current_run(&self) -> Option<&str> {
        self.current_run.as_deref()
    }

    /// Request cancellation of the current run
    pub fn cancel_current(&self) {
        self.cancel.cancel();
    }

    /// A cancellation handle usable from other tasks while `start` is
    /// awaited. Handles stay connected to the run they were taken for;
    /// the token is only replaced after a run finishes.
    pub fn cancellation_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cloned, read-only view of all registry state
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut plans: Vec<Plan> = self.plans.values().cloned().collect();
        plans.sort_by(|a, b| a.name.cmp(&b.name));
        let mut suites: Vec<Suite> = self.suites.values().cloned().collect();
        suites.sort_by(|a, b| a.name.cmp(&b.name));

        RegistrySnapshot {
            plans,
            suites,
            reports: self.reports.clone(),
            current_run: self.current_run.clone(),
            running: self.running,
        }
    }

    /// Subscribe to snapshot updates; the receiver always holds the latest
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Validate, run, and report on a submitted plan.
    ///
    /// The stored plan is replaced with its terminal copy and a report is
    /// generated and stored before this returns, including under policy-A
    /// aborts; only then does the abort error propagate. Cancellation stores
    /// the plan back as-is without a report.
    #[instrument(skip(self, work), fields(plan_id = %plan_id, env = %env_name))]
    pub async fn start(
        &mut self,
        plan_id: &str,
        env_name: &str,
        work: &dyn StepWork,
    ) -> Result<Report, EngineError> {
        if self.running {
            return Err(EngineError::AlreadyRunning(
                self.current_run.clone().unwrap_or_default(),
            ));
        }
        let env = self
            .environments
            .get(env_name)
            .cloned()
            .ok_or_else(|| EngineError::EnvironmentNotFound(env_name.to_string()))?;
        let mut plan = self
            .plans
            .remove(plan_id)
            .ok_or_else(|| EngineError::PlanNotFound(plan_id.to_string()))?;

        self.begin_run(plan_id);
        let cancel = self.cancel.clone();
        let result = self.driver.run_plan(&mut plan, work, &env, &cancel).await;

        let outcome = match result {
            Ok(()) => {
                let report = ReportGenerator::generate(&plan);
                self.reports.push(report.clone());
                Ok(report)
            }
            Err(e) => {
                if plan.is_terminal() {
                    let report = ReportGenerator::generate(&plan);
                    self.reports.push(report);
                }
                Err(e)
            }
        };

        self.plans.insert(plan_id.to_string(), plan);
        self.finish_run();
        outcome
    }

    /// Validate, run, and report on a submitted suite (fan-out mode)
    #[instrument(skip(self, work), fields(suite_id = %suite_id, env = %env_name))]
    pub async fn start_suite(
        &mut self,
        suite_id: &str,
        env_name: &str,
        work: &dyn StepWork,
    ) -> Result<Report, EngineError> {
        if self.running {
            return Err(EngineError::AlreadyRunning(
                self.current_run.clone().unwrap_or_default(),
            ));
        }
        let env = self
            .environments
            .get(env_name)
            .cloned()
            .ok_or_else(|| EngineError::EnvironmentNotFound(env_name.to_string()))?;
        let mut suite = self
            .suites
            .remove(suite_id)
            .ok_or_else(|| EngineError::SuiteNotFound(suite_id.to_string()))?;

        self.begin_run(suite_id);
        let cancel = self.cancel.clone();
        let result = self.driver.run_suite(&mut suite, work, &env, &cancel).await;

        let outcome = match result {
            Ok(()) => {
                let report = ReportGenerator::generate_suite(&suite);
                self.reports.push(report.clone());
                Ok(report)
            }
            Err(e) => {
                if suite.is_terminal() {
                    let report = ReportGenerator::generate_suite(&suite);
                    self.reports.push(report);
                }
                Err(e)
            }
        };

        self.suites.insert(suite_id.to_string(), suite);
        self.finish_run();
        outcome
    }

    /// All reports generated so far, oldest first
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    fn begin_run(&mut self, id: &str) {
        self.current_run = Some(id.to_string());
        self.running = true;
        self.publish();
    }

    fn finish_run(&mut self) {
        self.current_run = None;
        self.running = false;
        // A consumed token must not poison the next run; handles taken
        // before `start` stay bound to the run that just finished
        self.cancel = CancellationToken::new();
        self.publish();
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }
}
