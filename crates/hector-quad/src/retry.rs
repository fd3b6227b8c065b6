//! Retry of transient simulator failures with capped exponential backoff

use crate::config::RetryPolicy;
use rl_env_core::{EnvError, Result};
use sim_bridge::LinkError;
use std::time::Duration;
use tracing::warn;

/// Backoff state for one retried operation
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    attempts: u32,
    delay: Duration,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            policy: *policy,
            attempts: 0,
            delay: Duration::from_millis(policy.initial_ms),
        }
    }

    /// Account for a failed attempt of `operation`.
    ///
    /// Sleeps and returns `Ok` when another attempt is allowed. Non-transient
    /// errors pass through; running out of attempts is
    /// [`EnvError::RetriesExhausted`].
    pub async fn wait(&mut self, operation: &str, err: LinkError) -> Result<()> {
        if !err.is_transient() {
            return Err(err.into());
        }

        self.attempts += 1;
        if self.attempts >= self.policy.max_attempts {
            return Err(EnvError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: self.attempts,
                last_error: err.to_string(),
            });
        }

        warn!(
            "{} failed (attempt {}/{}): {}; retrying in {:?}",
            operation, self.attempts, self.policy.max_attempts, err, self.delay
        );
        tokio::time::sleep(self.delay).await;
        self.delay = (self.delay * 2).min(Duration::from_millis(self.policy.max_ms));
        Ok(())
    }

    /// Failed attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Await a link call until it succeeds, retrying transient failures.
///
/// `$call` is re-evaluated for every attempt. Must be used inside a function
/// returning `rl_env_core::Result`.
macro_rules! retrying {
    ($policy:expr, $operation:expr, $call:expr) => {{
        let mut backoff = $crate::retry::Backoff::new($policy);
        loop {
            match $call.await {
                Ok(value) => break value,
                Err(err) => backoff.wait($operation, err).await?,
            }
        }
    }};
}

pub(crate) use retrying;

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            initial_ms: 1,
            max_ms: 2,
            max_attempts: 3,
        }
    }

    fn timeout() -> LinkError {
        LinkError::Timeout {
            request: "Step".into(),
            timeout_ms: 5,
        }
    }

    async fn flaky(failures: &mut u32) -> std::result::Result<u32, LinkError> {
        if *failures > 0 {
            *failures -= 1;
            Err(timeout())
        } else {
            Ok(7)
        }
    }

    async fn call_with_retry(policy: &RetryPolicy, failures: &mut u32) -> Result<u32> {
        Ok(retrying!(policy, "Step", flaky(failures)))
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mut failures = 2;
        let value = call_with_retry(&fast(), &mut failures).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(failures, 0);
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let mut failures = 10;
        let err = call_with_retry(&fast(), &mut failures).await.unwrap_err();
        match err {
            EnvError::RetriesExhausted {
                operation,
                attempts,
                ..
            } => {
                assert_eq!(operation, "Step");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(failures == 7);
    }

    #[tokio::test]
    async fn test_non_transient_passes_through() {
        let mut backoff = Backoff::new(&fast());
        let err = backoff.wait("Step", LinkError::NotConnected).await.unwrap_err();
        assert!(matches!(err, EnvError::Transport(_)));
        assert_eq!(backoff.attempts(), 0);
    }
}
