//! Report generation
//!
//! A report is an immutable post-run snapshot derived from a terminal plan
//! or suite. It holds copies of the steps it summarizes, so re-running the
//! same plan id never retroactively alters an already generated report.
//!
//! Generation is a pure function over terminal state: the same plan always
//! yields the same summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::{FailureKind, Plan, Step, StepStatus, Suite};

/// Aggregate counts for a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_steps: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: Option<i64>,

    /// `passed / total * 100`; defined as 0 when there are no steps
    pub success_rate: f64,
}

/// One entry per failed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub step_name: String,
    pub error: String,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Comparison against a previously generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Id of the prior report compared against
    pub baseline_report_id: String,
    pub success_rate_delta: f64,
    pub duration_delta_ms: Option<i64>,
}

/// Immutable post-run summary of a terminal plan or suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,

    /// Id of the plan or suite this report summarizes
    pub subject_id: String,
    pub subject_name: String,
    pub generated_at: DateTime<Utc>,

    pub summary: ReportSummary,

    /// Copies of the summarized steps, frozen at generation time
    pub steps: Vec<Step>,

    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,

    /// Percentage of member plans that completed; suites only
    pub coverage: Option<f64>,

    /// Optional comparison against a prior report
    pub trend: Option<Trend>,
}

impl Report {
    /// Attach a trend computed against the most recent prior report
    pub fn with_trend(mut self, prior: &[Report]) -> Self {
        self.trend = prior
            .iter()
            .max_by_key(|r| r.generated_at)
            .map(|baseline| Trend {
                baseline_report_id: baseline.id.clone(),
                success_rate_delta: self.summary.success_rate - baseline.summary.success_rate,
                duration_delta_ms: match (self.summary.duration_ms, baseline.summary.duration_ms) {
                    (Some(current), Some(prev)) => Some(current - prev),
                    _ => None,
                },
            });
        self
    }
}

/// Turns terminal plans and suites into reports
pub struct ReportGenerator;

impl ReportGenerator {
    /// Generate a report from a terminal plan
    pub fn generate(plan: &Plan) -> Report {
        let steps: Vec<Step> = plan.steps.clone();
        let summary = Self::summarize(&steps, plan.duration_ms());
        let findings = Self::findings(&steps);
        let recommendations = Self::recommendations(&summary, &steps);

        Report {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: plan.id.clone(),
            subject_name: plan.name.clone(),
            generated_at: Utc::now(),
            summary,
            steps,
            findings,
            recommendations,
            coverage: None,
            trend: None,
        }
    }

    /// Generate a report from a terminal suite, flattening all member steps
    pub fn generate_suite(suite: &Suite) -> Report {
        let steps: Vec<Step> = suite
            .plans
            .iter()
            .flat_map(|p| p.steps.iter().cloned())
            .collect();
        let summary = Self::summarize(&steps, suite.duration_ms());
        let findings = Self::findings(&steps);
        let mut recommendations = Self::recommendations(&summary, &steps);

        let failed_plans = suite
            .plans
            .iter()
            .filter(|p| !matches!(p.status, crate::plan::PlanStatus::Completed))
            .count();
        if failed_plans > 0 {
            recommendations.push(format!(
                "{} of {} plans in this suite did not complete; review their findings individually",
                failed_plans,
                suite.plans.len()
            ));
        }

        Report {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: suite.id.clone(),
            subject_name: suite.name.clone(),
            generated_at: Utc::now(),
            summary,
            steps,
            findings,
            recommendations,
            coverage: suite.coverage,
            trend: None,
        }
    }

    fn summarize(steps: &[Step], duration_ms: Option<i64>) -> ReportSummary {
        let total = steps.len();
        let passed = steps.iter().filter(|s| s.status == StepStatus::Passed).count();
        let failed = steps.iter().filter(|s| s.status == StepStatus::Failed).count();
        let skipped = steps.iter().filter(|s| s.status == StepStatus::Skipped).count();

        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        ReportSummary {
            total_steps: total,
            passed,
            failed,
            skipped,
            duration_ms,
            success_rate,
        }
    }

    fn findings(steps: &[Step]) -> Vec<Finding> {
        steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .map(|s| Finding {
                step_name: s.name.clone(),
                error: s.error.clone().unwrap_or_else(|| "unknown failure".to_string()),
                ended_at: s.ended_at,
            })
            .collect()
    }

    fn recommendations(summary: &ReportSummary, steps: &[Step]) -> Vec<String> {
        let mut out = Vec::new();

        if summary.failed > 0 {
            out.push(format!(
                "Investigate {} failed step(s) before re-running the plan",
                summary.failed
            ));
        }
        if summary.skipped > 0 {
            out.push(format!(
                "{} step(s) never ran; re-run after resolving upstream failures",
                summary.skipped
            ));
        }

        let timed_out = steps
            .iter()
            .filter(|s| s.failure == Some(FailureKind::Timeout))
            .count();
        if timed_out > 0 {
            out.push(format!(
                "{} step(s) hit their timeout; raise the budget or split long-running work",
                timed_out
            ));
        }

        let retried = steps
            .iter()
            .filter(|s| s.status == StepStatus::Passed && s.retry_count > 0)
            .count();
        if retried > 0 {
            out.push(format!(
                "{} step(s) passed only after retries; check for flaky dependencies",
                retried
            ));
        }

        if summary.failed == 0 && summary.skipped == 0 && summary.total_steps > 0 {
            out.push("All steps passed; no action required".to_string());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanStatus;

    fn terminal_plan() -> Plan {
        let mut plan = Plan::new("deploy")
            .with_step(Step::new("provision", 1))
            .with_step(Step::new("deploy", 2))
            .with_step(Step::new("smoke-test", 3));

        plan.steps[0].mark_running();
        plan.steps[0].mark_passed();
        plan.steps[1].mark_running();
        plan.steps[1].mark_failed("step 'deploy' exceeded its budget", FailureKind::Timeout);
        plan.steps[2].mark_skipped();
        plan.status = PlanStatus::Failed;
        plan
    }

    #[test]
    fn test_summary_counts() {
        let report = ReportGenerator::generate(&terminal_plan());

        assert_eq!(report.summary.total_steps, 3);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert!((report.summary.success_rate - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_findings_carry_step_detail() {
        let report = ReportGenerator::generate(&terminal_plan());

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].step_name, "deploy");
        assert!(report.findings[0].error.contains("exceeded its budget"));
        assert!(report.findings[0].ended_at.is_some());
    }

    #[test]
    fn test_recommendations_rules() {
        let report = ReportGenerator::generate(&terminal_plan());

        assert!(report.recommendations.iter().any(|r| r.contains("Investigate 1 failed")));
        assert!(report.recommendations.iter().any(|r| r.contains("never ran")));
        assert!(report.recommendations.iter().any(|r| r.contains("timeout")));
    }

    #[test]
    fn test_timeout_rule_uses_failure_kind_not_message() {
        // The message carries no timeout wording; only the kind does
        let mut plan = Plan::new("deploy").with_step(Step::new("probe", 1));
        plan.steps[0].mark_running();
        plan.steps[0].mark_failed("gave up waiting", FailureKind::Timeout);
        plan.status = PlanStatus::Failed;

        let report = ReportGenerator::generate(&plan);
        assert!(report.recommendations.iter().any(|r| r.contains("timeout")));

        // And timeout wording in the message alone does not trigger the rule
        let mut plan = Plan::new("deploy").with_step(Step::new("probe", 1));
        plan.steps[0].mark_running();
        plan.steps[0].mark_failed("upstream reported: timed out", FailureKind::ExhaustedRetries);
        plan.status = PlanStatus::Failed;

        let report = ReportGenerator::generate(&plan);
        assert!(!report.recommendations.iter().any(|r| r.contains("timeout")));
    }

    #[test]
    fn test_empty_plan_success_rate_is_zero() {
        let mut plan = Plan::new("empty");
        plan.status = PlanStatus::Completed;

        let report = ReportGenerator::generate(&plan);
        assert_eq!(report.summary.total_steps, 0);
        assert_eq!(report.summary.passed, 0);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(report.summary.skipped, 0);
        assert_eq!(report.summary.success_rate, 0.0);
    }

    #[test]
    fn test_generate_is_idempotent_over_summary() {
        let plan = terminal_plan();
        let a = ReportGenerator::generate(&plan);
        let b = ReportGenerator::generate(&plan);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.findings, b.findings);
        assert_eq!(a.recommendations, b.recommendations);
    }

    #[test]
    fn test_report_holds_copies() {
        let mut plan = terminal_plan();
        let report = ReportGenerator::generate(&plan);

        plan.steps[0].mark_failed("mutated after the fact", FailureKind::ExhaustedRetries);
        assert_eq!(report.steps[0].status, StepStatus::Passed);
        assert_eq!(report.summary.passed, 1);
    }

    #[test]
    fn test_trend_against_prior() {
        let plan = terminal_plan();
        let mut prior = ReportGenerator::generate(&plan);
        prior.summary.success_rate = 100.0;

        let current = ReportGenerator::generate(&plan).with_trend(std::slice::from_ref(&prior));
        let trend = current.trend.unwrap();
        assert_eq!(trend.baseline_report_id, prior.id);
        assert!(trend.success_rate_delta < 0.0);
    }

    #[test]
    fn test_trend_with_no_priors() {
        let report = ReportGenerator::generate(&terminal_plan()).with_trend(&[]);
        assert!(report.trend.is_none());
    }
}
