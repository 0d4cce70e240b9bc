#![allow(dead_code)]

use stepchain::prelude::*;

/// Install a tracing subscriber once for test output (RUST_LOG controlled)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Work that succeeds for every step
pub fn passing_work() -> impl StepWork {
    work_fn(|step: Step, _env: Environment| async move {
        WorkOutput::passed(format!("{} ok", step.name))
    })
}

/// Work that fails for every step
pub fn failing_work(message: &'static str) -> impl StepWork {
    work_fn(move |_step: Step, _env: Environment| async move { WorkOutput::failed(message) })
}

/// Work that fails only for steps with the given name
pub fn fail_step_named(name: &'static str) -> impl StepWork {
    work_fn(move |step: Step, _env: Environment| async move {
        if step.name == name {
            WorkOutput::failed("intentional test failure")
        } else {
            WorkOutput::passed("ok")
        }
    })
}

/// Work that never resolves
pub fn hanging_work() -> impl StepWork {
    work_fn(|_step: Step, _env: Environment| async move {
        futures::future::pending::<()>().await;
        WorkOutput::passed("unreachable")
    })
}

/// A plan of `count` passing-ready steps named step-1..step-count
pub fn chain_plan(name: &str, count: u32) -> Plan {
    let mut plan = Plan::new(name);
    for i in 1..=count {
        plan.add_step(Step::new(format!("step-{}", i), i).with_id(format!("step-{}", i)));
    }
    plan
}
