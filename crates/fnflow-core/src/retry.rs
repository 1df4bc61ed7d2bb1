//! Retry decorator and backoff policies
//!
//! [`Retry`] wraps any step (sync or async) and re-invokes it while its
//! [`RetryPolicy`] says so. The executor never knows a step is being retried.
use crate::error::{StepError, StepResult};
use crate::step::Step;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Upper bound applied to every delay unless a policy says otherwise.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Decides whether a failed attempt is tried again and how long to wait.
///
/// `attempt` counts failures so far: it is 1 after the first failed call.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, error: &StepError, attempt: u32) -> bool;

    fn delay(&self, attempt: u32) -> Duration;

    /// Ceiling applied on top of [`RetryPolicy::delay`].
    fn max_delay(&self) -> Duration {
        DEFAULT_MAX_DELAY
    }

    fn capped_delay(&self, attempt: u32) -> Duration {
        self.delay(attempt).min(self.max_delay())
    }
}

impl<P: RetryPolicy + ?Sized> RetryPolicy for Arc<P> {
    fn should_retry(&self, error: &StepError, attempt: u32) -> bool {
        (**self).should_retry(error, attempt)
    }

    fn delay(&self, attempt: u32) -> Duration {
        (**self).delay(attempt)
    }

    fn max_delay(&self) -> Duration {
        (**self).max_delay()
    }
}

type RetryIf = Arc<dyn Fn(&StepError) -> bool + Send + Sync>;

/// Exponential backoff: waits `base_delay * 2^attempt`, capped at
/// `max_delay`, for at most `max_retries` retries after the first call.
#[derive(Clone)]
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    retry_if: RetryIf,
}

impl BackoffPolicy {
    /// Retries errors for which [`StepError::is_retryable`] holds.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
            retry_if: Arc::new(StepError::is_retryable),
        }
    }

    /// Retries only `OperationFailed` errors (network-style failures).
    pub fn on_operation_failure(max_retries: u32, base_delay: Duration) -> Self {
        Self::new(max_retries, base_delay)
            .retry_if(|err| matches!(err, StepError::OperationFailed { .. }))
    }

    /// Retries only `ResourceUnavailable` errors (rate limits, stock).
    pub fn on_unavailable(max_retries: u32, base_delay: Duration) -> Self {
        Self::new(max_retries, base_delay)
            .retry_if(|err| matches!(err, StepError::ResourceUnavailable { .. }))
    }

    /// No waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&StepError) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, error: &StepError, attempt: u32) -> bool {
        attempt <= self.max_retries && (self.retry_if)(error)
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }

    fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

impl fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BackoffPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

/// Step decorator that re-runs `step` according to `policy`.
///
/// The input is cloned for every attempt. When the policy gives up, the last
/// error is returned as is, or wrapped in `RetriesExhausted` if
/// [`Retry::wrap_exhausted`] was set and at least one retry happened.
pub struct Retry<S, P> {
    pub(crate) step: S,
    pub(crate) policy: P,
    pub(crate) wrap_exhausted: bool,
}

impl<S, P> Retry<S, P> {
    pub fn new(step: S, policy: P) -> Self {
        Self {
            step,
            policy,
            wrap_exhausted: false,
        }
    }

    pub fn wrap_exhausted(mut self) -> Self {
        self.wrap_exhausted = true;
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn into_inner(self) -> S {
        self.step
    }

    pub(crate) fn give_up(&self, err: StepError, attempts: u32) -> StepError {
        if self.wrap_exhausted && attempts > 1 {
            StepError::exhausted(attempts, err)
        } else {
            err
        }
    }
}

/// Shorthand for [`Retry::new`].
pub fn retry<S, P>(step: S, policy: P) -> Retry<S, P> {
    Retry::new(step, policy)
}

impl<In, S, P> Step<In> for Retry<S, P>
where
    In: Clone,
    S: Step<In>,
    P: RetryPolicy,
{
    type Output = S::Output;

    fn name(&self) -> &str {
        self.step.name()
    }

    fn run(&self, input: In) -> StepResult<S::Output> {
        let mut attempt = 0u32;
        loop {
            let err = match self.step.run(input.clone()) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if !self.policy.should_retry(&err, attempt) {
                return Err(self.give_up(err, attempt));
            }

            let delay = self.policy.capped_delay(attempt);
            warn!(
                step = self.step.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying step"
            );
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::step_fn;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `err` for the first `failures` calls, then echoes input.
    fn flaky(failures: u32, err: StepError, calls: &AtomicU32) -> impl Step<u32, Output = u32> + '_ {
        step_fn("flaky", move |x: u32| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                Err(err.clone())
            } else {
                Ok(x)
            }
        })
    }

    #[test]
    fn test_succeeds_when_policy_allows_enough_attempts() {
        let calls = AtomicU32::new(0);
        // fails twice, succeeds on the 3rd; 2 retries => 3 attempts
        let step = retry(
            flaky(2, StepError::failed("fetch", "Network error"), &calls),
            BackoffPolicy::immediate(2),
        );
        assert_eq!(step.run(7), Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_returns_last_error_when_attempts_run_out() {
        let calls = AtomicU32::new(0);
        let step = retry(
            flaky(2, StepError::failed("fetch", "Network error"), &calls),
            BackoffPolicy::immediate(1),
        );
        assert_eq!(step.run(7), Err(StepError::failed("fetch", "Network error")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_predicate_stops_non_retryable_errors() {
        let calls = AtomicU32::new(0);
        let step = retry(
            flaky(5, StepError::invalid_input("bad"), &calls),
            BackoffPolicy::immediate(10),
        );
        assert_eq!(step.run(1), Err(StepError::invalid_input("bad")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrap_exhausted() {
        let calls = AtomicU32::new(0);
        let step = retry(
            flaky(9, StepError::unavailable("A"), &calls),
            BackoffPolicy::on_unavailable(2, Duration::ZERO),
        )
        .wrap_exhausted();

        match step.run(1) {
            Err(StepError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(*last, StepError::unavailable("A"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = BackoffPolicy::new(10, Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(4000));
        assert_eq!(policy.capped_delay(3), Duration::from_millis(4000));
        assert_eq!(policy.capped_delay(4), DEFAULT_MAX_DELAY);
        assert_eq!(policy.capped_delay(40), DEFAULT_MAX_DELAY);

        let tight = policy.with_max_delay(Duration::from_millis(1500));
        assert_eq!(tight.capped_delay(2), Duration::from_millis(1500));
    }

    #[test]
    fn test_preset_predicates() {
        let net = BackoffPolicy::on_operation_failure(3, Duration::ZERO);
        assert!(net.should_retry(&StepError::failed("x", "y"), 1));
        assert!(!net.should_retry(&StepError::unavailable("A"), 1));
        assert!(!net.should_retry(&StepError::failed("x", "y"), 4));

        let limited = BackoffPolicy::on_unavailable(3, Duration::ZERO);
        assert!(limited.should_retry(&StepError::unavailable("quota"), 3));
        assert!(!limited.should_retry(&StepError::failed("x", "y"), 1));
    }
}
