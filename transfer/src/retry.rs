use log::debug;
use std::future::Future;
use std::time::Duration;
use stevedore_core::{Error, Result};

/// Backoff and attempt budget for a retried operation.
///
/// The interval before attempt `n + 1` is
/// `min(max_interval, initial_interval * backoff_factor^n)`, scaled down
/// by up to `jitter` of itself.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial_interval: Duration,
    max_attempts: u32,
    backoff_factor: f64,
    max_interval: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(200),
            max_attempts: 4,
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(10),
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interval before the first retry.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Set the attempt budget. `0` means unlimited attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the multiplier applied to the interval after every attempt.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the upper bound every computed interval is clamped to.
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the jitter fraction in `[0, 1]`.
    ///
    /// Values outside the range are a construction-time error.
    pub fn with_jitter(mut self, jitter: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(Error::config_invalid(format!(
                "jitter must be within [0, 1], got {jitter}"
            )));
        }
        self.jitter = jitter;
        Ok(self)
    }

    /// Attempt budget of this policy. `0` means unlimited.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Interval to sleep after the given zero-based attempt.
    fn interval_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.min(i32::MAX as u32) as i32);
        let computed = self.initial_interval.as_secs_f64() * factor;
        let capped = computed.min(self.max_interval.as_secs_f64());
        let scaled = if self.jitter > 0.0 {
            capped * (1.0 - self.jitter * rand::random::<f64>())
        } else {
            capped
        };
        Duration::from_secs_f64(scaled)
    }
}

/// Drives a fallible async operation under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor for the given policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Invoke `op` until it yields an acceptable outcome or the attempt
    /// budget runs out.
    ///
    /// - A success is returned unless `value_should_retry` holds and
    ///   attempts remain.
    /// - An error is returned immediately unless `error_should_retry`
    ///   holds; a retryable error that exhausts the budget is wrapped in
    ///   a `RetryExhausted` error carrying the last failure.
    /// - Exhausting the budget on the value path hands back the last
    ///   value instead of failing; callers that need a hard failure on a
    ///   bad value must surface it through the error path.
    pub async fn execute<T, Op, Fut>(
        &self,
        mut op: Op,
        value_should_retry: impl Fn(&T) -> bool,
        error_should_retry: impl Fn(&Error) -> bool,
    ) -> Result<T>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let exhausted =
                self.policy.max_attempts != 0 && attempt >= self.policy.max_attempts;

            match op().await {
                Ok(value) => {
                    if !value_should_retry(&value) || exhausted {
                        return Ok(value);
                    }
                    debug!("attempt {attempt} produced a retryable value");
                }
                Err(err) => {
                    if !error_should_retry(&err) {
                        return Err(err);
                    }
                    if exhausted {
                        return Err(Error::retry_exhausted(format!(
                            "giving up after {attempt} attempts"
                        ))
                        .with_source(err));
                    }
                    debug!("attempt {attempt} failed, will retry: {err}");
                }
            }

            tokio::time::sleep(self.policy.interval_after(attempt - 1)).await;
        }
    }
}
