mod common;

use common::*;
use stepchain::prelude::*;
use tokio_util::sync::CancellationToken;

fn driver() -> PlanDriver {
    PlanDriver::new(EngineConfig::default())
}

fn five_case_suite() -> Suite {
    let mut suite = Suite::new("regression");
    for i in 1..=5 {
        let mut plan = Plan::new(format!("case-{}", i));
        plan.add_step(Step::new(format!("check-{}", i), 1));
        suite.add_plan(plan);
    }
    suite
}

#[tokio::test]
async fn test_suite_all_pass() {
    let mut suite = five_case_suite();
    let env = Environment::new("qa");

    driver()
        .run_suite(&mut suite, &passing_work(), &env, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(suite.status, SuiteStatus::Completed);
    assert_eq!(suite.coverage, Some(100.0));
    for plan in &suite.plans {
        assert_eq!(plan.status, PlanStatus::Completed);
    }
}

#[tokio::test]
async fn test_one_failure_fails_suite_with_coverage() {
    let mut suite = five_case_suite();
    let env = Environment::new("qa");

    // check-3 fails; its siblings must be unaffected
    driver()
        .run_suite(&mut suite, &fail_step_named("check-3"), &env, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(suite.status, SuiteStatus::Failed);
    assert_eq!(suite.coverage, Some(80.0));
    for plan in &suite.plans {
        if plan.name == "case-3" {
            assert_eq!(plan.status, PlanStatus::Failed);
        } else {
            assert_eq!(plan.status, PlanStatus::Completed);
        }
    }
}

#[tokio::test]
async fn test_fanout_isolation_under_abort_policy() {
    let abort_driver = PlanDriver::new(EngineConfig {
        abort_on_first_failure: true,
        ..EngineConfig::default()
    });
    let mut suite = five_case_suite();
    let env = Environment::new("qa");

    // The aborting plan's error is caught inside the suite; siblings and
    // the join are unaffected
    abort_driver
        .run_suite(&mut suite, &fail_step_named("check-2"), &env, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(suite.status, SuiteStatus::Failed);
    assert_eq!(suite.coverage, Some(80.0));
    assert_eq!(
        suite.plans.iter().filter(|p| p.status == PlanStatus::Completed).count(),
        4
    );
}

#[tokio::test]
async fn test_empty_suite_completes() {
    let mut suite = Suite::new("empty");
    let env = Environment::new("qa");

    driver()
        .run_suite(&mut suite, &passing_work(), &env, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(suite.status, SuiteStatus::Completed);
    assert_eq!(suite.coverage, Some(100.0));
}

#[tokio::test]
async fn test_suite_bounded_concurrency() {
    let bounded = PlanDriver::new(EngineConfig {
        max_concurrent_plans: 1,
        ..EngineConfig::default()
    });
    let mut suite = five_case_suite();
    let env = Environment::new("qa");

    bounded
        .run_suite(&mut suite, &passing_work(), &env, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(suite.status, SuiteStatus::Completed);
    // Every plan still reaches a terminal state before the suite finalizes
    for plan in &suite.plans {
        assert!(plan.is_terminal());
    }
}

#[tokio::test]
async fn test_cancelled_suite_propagates() {
    let mut suite = five_case_suite();
    let env = Environment::new("qa");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = driver()
        .run_suite(&mut suite, &passing_work(), &env, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
    assert!(!suite.is_terminal());
}
