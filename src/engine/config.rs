//! Engine configuration
//!
//! The failure policy is an explicit knob rather than a property of the
//! caller: deployment-style pipelines set `abort_on_first_failure` and get a
//! propagated error on the first hard step failure, while test-suite-style
//! callers leave it off and read the terminal plan status instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between retry attempts in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5_000;

/// Delay strategy applied between step retry attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum RetryPolicy {
    /// Fixed delay between attempts
    Fixed {
        #[serde(default = "default_retry_delay")]
        delay_ms: u64,
    },

    /// Delay doubles per attempt, capped
    Exponential {
        initial_ms: u64,
        #[serde(default = "default_cap")]
        cap_ms: u64,
    },

    /// Fixed base plus a uniform random spread, to avoid retry storms
    Jittered { base_ms: u64, spread_ms: u64 },
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_cap() -> u64 {
    60_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given attempt (1 = first retry)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match self {
            Self::Fixed { delay_ms } => *delay_ms,
            Self::Exponential { initial_ms, cap_ms } => {
                let exp = attempt.saturating_sub(1).min(16);
                initial_ms
                    .saturating_mul(1u64 << exp)
                    .min(*cap_ms)
            }
            Self::Jittered { base_ms, spread_ms } => {
                if *spread_ms == 0 {
                    *base_ms
                } else {
                    base_ms + rand::random::<u64>() % spread_ms
                }
            }
        };
        Duration::from_millis(ms)
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Policy A: the first step that exhausts its retries aborts the plan
    /// and surfaces as an error. Off means policy B: the plan still halts
    /// at the failed step, but only its terminal status records the failure.
    #[serde(default)]
    pub abort_on_first_failure: bool,

    /// Delay strategy between retry attempts
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Timeout applied to steps that set none of their own, in milliseconds
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    /// Upper bound on concurrently running plans during suite fan-out
    #[serde(default = "default_parallel")]
    pub max_concurrent_plans: usize,
}

fn default_parallel() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            abort_on_first_failure: false,
            retry: RetryPolicy::default(),
            default_timeout_ms: None,
            max_concurrent_plans: default_parallel(),
        }
    }
}
