//! The work seam
//!
//! The engine has zero knowledge of deployment or test semantics. Callers
//! inject a [`StepWork`] implementation; in production that is a process
//! call, an HTTP probe, or an assertion, and in tests a canned closure.

use async_trait::async_trait;
use std::future::Future;

use super::environment::Environment;
use super::step::Step;

/// Outcome of one work invocation
#[derive(Debug, Clone)]
pub struct WorkOutput {
    pub success: bool,
    pub message: String,
}

impl WorkOutput {
    /// Successful outcome with a message
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed outcome with a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// The external "do the work" callback invoked once per step attempt
#[async_trait]
pub trait StepWork: Send + Sync {
    async fn run(&self, step: &Step, env: &Environment) -> WorkOutput;
}

/// Adapter that lets a plain async closure act as [`StepWork`]
pub struct WorkFn<F> {
    f: F,
}

/// Wrap an async closure as a [`StepWork`] implementation
pub fn work_fn<F, Fut>(f: F) -> WorkFn<F>
where
    F: Fn(Step, Environment) -> Fut + Send + Sync,
    Fut: Future<Output = WorkOutput> + Send,
{
    WorkFn { f }
}

#[async_trait]
impl<F, Fut> StepWork for WorkFn<F>
where
    F: Fn(Step, Environment) -> Fut + Send + Sync,
    Fut: Future<Output = WorkOutput> + Send,
{
    async fn run(&self, step: &Step, env: &Environment) -> WorkOutput {
        (self.f)(step.clone(), env.clone()).await
    }
}
