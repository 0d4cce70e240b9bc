//! Step runner - executes a single step with retry, timeout, and cancellation
//!
//! The runner owns the full lifecycle of one step: it transitions the step
//! through `pending -> running`, invokes the caller-supplied work callback
//! under the step's timeout, and either resubmits after the configured retry
//! delay or stamps the terminal status.
//!
//! Retryable failures are recovered internally and are invisible to the
//! caller; only budget exhaustion is reported, as a terminal outcome.

use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::config::{EngineConfig, RetryPolicy};
use super::error::EngineError;
use crate::plan::{Environment, FailureKind, Step, StepWork};

/// Terminal outcome of one step execution, retries included
#[derive(Debug)]
pub struct StepOutcome {
    pub success: bool,
    pub message: String,

    /// Total attempts made (first run plus retries)
    pub attempts: u32,

    /// Classification of the terminal failure, if any
    pub failure: Option<EngineError>,
}

/// Executes one step at a time
#[derive(Debug, Clone)]
pub struct StepRunner {
    retry: RetryPolicy,
    default_timeout_ms: Option<u64>,
}

impl StepRunner {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            retry: config.retry.clone(),
            default_timeout_ms: config.default_timeout_ms,
        }
    }

    /// Run a step to a terminal status.
    ///
    /// Returns `Ok` with the terminal outcome whether the step passed or
    /// failed; `Err` is reserved for cancellation, which leaves the step
    /// non-terminal.
    #[instrument(skip(self, step, work, env, cancel), fields(step = %step.name))]
    pub async fn execute(
        &self,
        step: &mut Step,
        work: &dyn StepWork,
        env: &Environment,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, EngineError> {
        let timeout_ms = step.timeout.or(self.default_timeout_ms);

        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            step.mark_running();
            debug!(attempt = step.retry_count + 1, "running step");

            let attempt = self.attempt(step, work, env, cancel, timeout_ms).await?;

            match attempt {
                Attempt::Passed(message) => {
                    step.mark_passed();
                    info!(
                        elapsed_ms = step.duration_ms().unwrap_or(0),
                        attempts = step.retry_count + 1,
                        "step passed"
                    );
                    return Ok(StepOutcome {
                        success: true,
                        message,
                        attempts: step.retry_count + 1,
                        failure: None,
                    });
                }
                Attempt::Failed { message, timed_out } => {
                    if step.retry_count < step.max_retries {
                        step.retry_count += 1;
                        step.reset_for_retry();
                        let delay = self.retry.delay_for(step.retry_count);
                        warn!(
                            retry = step.retry_count,
                            max_retries = step.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "step failed, retrying: {}",
                            message
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        continue;
                    }

                    let (failure, kind) = if timed_out {
                        (
                            EngineError::StepTimeout {
                                step: step.name.clone(),
                                timeout_ms: timeout_ms.unwrap_or(0),
                            },
                            FailureKind::Timeout,
                        )
                    } else {
                        (
                            EngineError::StepExhaustedRetries {
                                step: step.name.clone(),
                                attempts: step.retry_count + 1,
                                message: message.clone(),
                            },
                            FailureKind::ExhaustedRetries,
                        )
                    };
                    step.mark_failed(failure.to_string(), kind);
                    error!(
                        elapsed_ms = step.duration_ms().unwrap_or(0),
                        attempts = step.retry_count + 1,
                        "step failed: {}",
                        message
                    );
                    return Ok(StepOutcome {
                        success: false,
                        message,
                        attempts: step.retry_count + 1,
                        failure: Some(failure),
                    });
                }
            }
        }
    }

    /// Run one attempt of the work callback under the step timeout
    async fn attempt(
        &self,
        step: &Step,
        work: &dyn StepWork,
        env: &Environment,
        cancel: &CancellationToken,
        timeout_ms: Option<u64>,
    ) -> Result<Attempt, EngineError> {
        let output = match timeout_ms {
            Some(ms) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    result = timeout(Duration::from_millis(ms), work.run(step, env)) => {
                        match result {
                            Ok(output) => output,
                            Err(_) => {
                                return Ok(Attempt::Failed {
                                    message: format!("timed out after {} ms", ms),
                                    timed_out: true,
                                });
                            }
                        }
                    }
                }
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                    output = work.run(step, env) => output,
                }
            }
        };

        if output.success {
            Ok(Attempt::Passed(output.message))
        } else {
            Ok(Attempt::Failed {
                message: output.message,
                timed_out: false,
            })
        }
    }
}

enum Attempt {
    Passed(String),
    Failed { message: String, timed_out: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{work_fn, StepStatus, WorkOutput};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn runner() -> StepRunner {
        StepRunner::new(&EngineConfig::default())
    }

    #[tokio::test]
    async fn test_pass_first_try() {
        let mut step = Step::new("deploy", 1);
        let work = work_fn(|_s, _e| async { WorkOutput::passed("ok") });

        let outcome = runner()
            .execute(&mut step, &work, &Environment::new("dev"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(step.status, StepStatus::Passed);
        assert_eq!(step.retry_count, 0);
        assert!(step.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_pass() {
        let mut step = Step::new("flaky", 1).with_max_retries(2);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_work = calls.clone();
        let work = work_fn(move |_s, _e| {
            let calls = calls_in_work.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    WorkOutput::failed("transient")
                } else {
                    WorkOutput::passed("ok")
                }
            }
        });

        let outcome = runner()
            .execute(&mut step, &work, &Environment::new("dev"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(step.status, StepStatus::Passed);
        assert_eq!(step.retry_count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries() {
        let mut step = Step::new("broken", 1).with_max_retries(2);
        let work = work_fn(|_s, _e| async { WorkOutput::failed("connection refused") });

        let outcome = runner()
            .execute(&mut step, &work, &Environment::new("dev"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.retry_count, 2);
        assert!(matches!(
            outcome.failure,
            Some(EngineError::StepExhaustedRetries { attempts: 3, .. })
        ));
        assert_eq!(step.failure, Some(FailureKind::ExhaustedRetries));
        assert!(step.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_forces_failure() {
        let mut step = Step::new("hung", 1).with_timeout_ms(1_000);
        let work = work_fn(|_s, _e| async {
            futures::future::pending::<()>().await;
            WorkOutput::passed("unreachable")
        });

        let started = tokio::time::Instant::now();
        let outcome = runner()
            .execute(&mut step, &work, &Environment::new("dev"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(step.status, StepStatus::Failed);
        assert!(matches!(
            outcome.failure,
            Some(EngineError::StepTimeout { timeout_ms: 1_000, .. })
        ));
        assert_eq!(step.failure, Some(FailureKind::Timeout));
        assert!(step.error.as_deref().unwrap().contains("timed out"));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1_000));
        assert!(elapsed < Duration::from_millis(1_100));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut step = Step::new("never", 1);
        let work = work_fn(|_s, _e| async { WorkOutput::passed("ok") });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner()
            .execute(&mut step, &work, &Environment::new("dev"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(step.status, StepStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_retry_delay() {
        let mut step = Step::new("flaky", 1).with_max_retries(5);
        let work = work_fn(|_s, _e| async { WorkOutput::failed("nope") });
        let cancel = CancellationToken::new();

        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            child.cancel();
        });

        let err = runner()
            .execute(&mut step, &work, &Environment::new("dev"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert!(!step.is_terminal());
        assert!(step.retry_count <= step.max_retries);
    }
}
