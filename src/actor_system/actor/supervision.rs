//! Actor supervision strategies, also used as retry policies around flaky calls.

use std::time::Duration;

use backoff::backoff::Backoff;

/// Defines what to do when an actor fails at startup.
#[derive(Debug)]
pub enum SupervisionStrategy {
    Stop,
    Retry(Box<dyn RetryStrategy>),
}

/// Trait to define a retry strategy.
pub trait RetryStrategy: std::fmt::Debug + Send {
    /// Maximum number of retries before giving up.
    fn max_retries(&self) -> usize;
    /// Wait duration before the next retry.
    fn next_backoff(&mut self) -> Option<Duration>;
}

/// Retries immediately.
#[derive(Debug, Default)]
pub struct NoIntervalStrategy {
    max_retries: usize,
}

impl NoIntervalStrategy {
    pub fn new(max_retries: usize) -> Self {
        NoIntervalStrategy { max_retries }
    }
}

impl RetryStrategy for NoIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }
}

/// Retries after a fixed wait.
#[derive(Debug, Default)]
pub struct FixedIntervalStrategy {
    max_retries: usize,
    duration: Duration,
}

impl FixedIntervalStrategy {
    pub fn new(max_retries: usize, duration: Duration) -> Self {
        FixedIntervalStrategy {
            max_retries,
            duration,
        }
    }
}

impl RetryStrategy for FixedIntervalStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.duration)
    }
}

/// Retries with exponentially growing waits.
#[derive(Debug)]
pub struct ExponentialBackoffStrategy {
    max_retries: usize,
    inner: backoff::ExponentialBackoff,
}

impl ExponentialBackoffStrategy {
    /// Start from `initial` instead of the backoff crate's default interval.
    pub fn with_initial_interval(max_retries: usize, initial: Duration) -> Self {
        let inner = backoff::ExponentialBackoff {
            initial_interval: initial,
            current_interval: initial,
            ..Default::default()
        };
        ExponentialBackoffStrategy { max_retries, inner }
    }
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn max_retries(&self) -> usize {
        self.max_retries
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.inner.next_backoff()
    }
}
