//! Consecutive-failure accounting for remote calls.
//!
//! Every failed call bumps a counter. On every fifth consecutive failure the
//! session should re-authenticate before retrying; at fifty the call is
//! abandoned. A single success resets the counter.

use std::time::Duration;
use tracing::{debug, warn};

/// Consecutive failures after which a call is abandoned.
pub const MAX_RETRIES: u32 = 50;

/// Re-authenticate on every multiple of this many consecutive failures.
pub const RELOGIN_EVERY: u32 = 5;

/// Fixed delay before a failed call is retried.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// What the caller should do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Re-issue the call.
    Retry,
    /// Re-authenticate, then re-issue the call.
    Reauthenticate,
    /// Give up; surface the error.
    Abort,
}

/// State implied by the current counter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    /// No outstanding failures.
    Normal,
    /// Failing, plain retries.
    Retrying,
    /// Failing, at a re-authentication point.
    Reauthenticating,
    /// Retries exhausted.
    Aborted,
}

/// Bounded counter of consecutive failures, in `[0, MAX_RETRIES]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounter {
    consecutive: u32,
}

impl FailureCounter {
    /// A counter with no failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of consecutive failures.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    /// Record a failure and decide what to do next.
    ///
    /// Once the counter reaches [`MAX_RETRIES`] it stays there and every
    /// further failure is an abort.
    pub fn record_failure(&mut self) -> FailureDecision {
        self.consecutive = (self.consecutive + 1).min(MAX_RETRIES);
        match self.state() {
            PolicyState::Aborted => FailureDecision::Abort,
            PolicyState::Reauthenticating => FailureDecision::Reauthenticate,
            PolicyState::Retrying | PolicyState::Normal => FailureDecision::Retry,
        }
    }

    /// Record a success.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// State for the current counter value.
    pub fn state(&self) -> PolicyState {
        match self.consecutive {
            0 => PolicyState::Normal,
            n if n >= MAX_RETRIES => PolicyState::Aborted,
            n if n % RELOGIN_EVERY == 0 => PolicyState::Reauthenticating,
            _ => PolicyState::Retrying,
        }
    }
}

/// Failure counter plus the fixed retry delay.
#[derive(Debug, Clone)]
pub struct FailurePolicy {
    counter: FailureCounter,
    retry_delay: Duration,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl FailurePolicy {
    /// Policy with the standard retry delay.
    pub fn new() -> Self {
        Self {
            counter: FailureCounter::new(),
            retry_delay: RETRY_DELAY,
        }
    }

    /// Policy with a custom retry delay.
    pub fn with_retry_delay(retry_delay: Duration) -> Self {
        Self {
            counter: FailureCounter::new(),
            retry_delay,
        }
    }

    /// Delay waited before a failed call is retried.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Underlying counter.
    pub fn counter(&self) -> &FailureCounter {
        &self.counter
    }

    /// Record a success.
    pub fn on_success(&mut self) {
        if self.counter.consecutive_failures() > 0 {
            debug!(
                failures = self.counter.consecutive_failures(),
                "Call succeeded, failure counter reset"
            );
        }
        self.counter.record_success();
    }

    /// Record a failure; waits the retry delay unless the call is abandoned.
    pub async fn on_failure(&mut self) -> FailureDecision {
        let decision = self.counter.record_failure();
        let failures = self.counter.consecutive_failures();
        match decision {
            FailureDecision::Abort => {
                warn!(failures, "Retries exhausted, abandoning call");
            }
            FailureDecision::Reauthenticate => {
                warn!(failures, "Repeated failures, re-authentication required");
                tokio::time::sleep(self.retry_delay).await;
            }
            FailureDecision::Retry => {
                debug!(failures, "Call failed, retrying");
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        decision
    }

    /// Clear the counter after a terminal failure was surfaced.
    pub fn reset(&mut self) {
        self.counter.record_success();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn relogin_points_and_abort() {
        let mut counter = FailureCounter::new();
        let mut relogins = Vec::new();
        let mut aborts = Vec::new();
        for _ in 0..60 {
            match counter.record_failure() {
                FailureDecision::Reauthenticate => relogins.push(counter.consecutive_failures()),
                FailureDecision::Abort => aborts.push(counter.consecutive_failures()),
                FailureDecision::Retry => {}
            }
        }
        assert_eq!(relogins, vec![5, 10, 15, 20, 25, 30, 35, 40, 45]);
        assert_eq!(aborts[0], 50);
        assert_eq!(counter.consecutive_failures(), 50);
    }

    #[test]
    fn state_classification() {
        let mut counter = FailureCounter::new();
        assert_eq!(counter.state(), PolicyState::Normal);
        counter.record_failure();
        assert_eq!(counter.state(), PolicyState::Retrying);
        for _ in 0..4 {
            counter.record_failure();
        }
        assert_eq!(counter.state(), PolicyState::Reauthenticating);
        counter.record_success();
        assert_eq!(counter.state(), PolicyState::Normal);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_waits_retry_delay() {
        let mut policy = FailurePolicy::new();
        let start = tokio::time::Instant::now();
        assert_eq!(policy.on_failure().await, FailureDecision::Retry);
        assert_eq!(start.elapsed(), RETRY_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_does_not_wait() {
        let mut policy = FailurePolicy::with_retry_delay(Duration::from_secs(1));
        for _ in 0..49 {
            policy.on_failure().await;
        }
        let start = tokio::time::Instant::now();
        assert_eq!(policy.on_failure().await, FailureDecision::Abort);
        assert_eq!(start.elapsed(), Duration::ZERO);
        policy.reset();
        assert_eq!(policy.counter().state(), PolicyState::Normal);
    }

    proptest! {
        #[test]
        fn decision_matches_counter(outcomes in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut counter = FailureCounter::new();
            let mut model = 0u32;
            for success in outcomes {
                if success {
                    counter.record_success();
                    model = 0;
                    prop_assert_eq!(counter.state(), PolicyState::Normal);
                } else {
                    let decision = counter.record_failure();
                    model = (model + 1).min(MAX_RETRIES);
                    let expected = if model == MAX_RETRIES {
                        FailureDecision::Abort
                    } else if model % RELOGIN_EVERY == 0 {
                        FailureDecision::Reauthenticate
                    } else {
                        FailureDecision::Retry
                    };
                    prop_assert_eq!(decision, expected);
                }
                prop_assert_eq!(counter.consecutive_failures(), model);
                prop_assert!(counter.consecutive_failures() <= MAX_RETRIES);
            }
        }
    }
}
