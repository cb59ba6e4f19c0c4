/// Retry strategies for acquiring the device handle
///
/// Every sector read and write opens the device afresh with no sharing, so
/// the open itself can fail while another holder has the device. Share
/// violations back off exponentially with jitter; other open failures wait
/// a fixed delay for a bounded number of tries.
use crate::config::Settings;
use crate::SectorError;
use std::time::Duration;

/// Retry strategy trait
pub trait RetryStrategy: Send + Sync {
    /// Determine if retry should be attempted after `attempt` earlier retries
    fn should_retry(&self, attempt: u32, error: &SectorError) -> bool;

    /// Calculate delay before next retry
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Maximum number of retry attempts
    fn max_attempts(&self) -> u32;
}

/// Constant delay between a bounded number of retries
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: u32,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl RetryStrategy for FixedDelay {
    fn should_retry(&self, attempt: u32, error: &SectorError) -> bool {
        attempt < self.max_attempts && error.class().allows_retry()
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Exponential backoff retry strategy with jitter
///
/// Implements exponential backoff: delay = base * 2^attempt
/// Adds random jitter so repeated collisions with the other holder spread out
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay for first retry
    base_delay: Duration,

    /// Maximum delay cap
    max_delay: Duration,

    /// Maximum retry attempts
    max_attempts: u32,

    /// Jitter factor (0.0 - 1.0)
    jitter_factor: f64,
}

impl ExponentialBackoff {
    /// Create new exponential backoff strategy
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            jitter_factor: 0.3,
        }
    }

    /// Create with custom jitter factor
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Preset for a device held open by someone else
    pub fn share_violation(max_attempts: u32) -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(1), max_attempts)
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential_ms = self
            .base_delay
            .as_millis()
            .saturating_mul(2_u128.saturating_pow(attempt));
        let capped_ms = exponential_ms.min(self.max_delay.as_millis());

        // delay ± (delay * jitter_factor)
        let jitter_range = capped_ms as f64 * self.jitter_factor;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let final_ms = (capped_ms as f64 + jitter).max(0.0);

        Duration::from_millis(final_ms as u64)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn should_retry(&self, attempt: u32, error: &SectorError) -> bool {
        attempt < self.max_attempts && error.class().allows_retry()
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        self.calculate_delay(attempt)
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Retry policy used by the raw device when opening a handle
#[derive(Debug, Clone)]
pub struct HandleRetry {
    open_failure: FixedDelay,
    share_violation: ExponentialBackoff,
}

impl HandleRetry {
    pub fn new(open_failure: FixedDelay, share_violation: ExponentialBackoff) -> Self {
        Self {
            open_failure,
            share_violation,
        }
    }

    /// `error_use_handle` counts total tries, so it allows one fewer retry
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            FixedDelay::new(
                Duration::from_millis(settings.handle_retry_delay_ms),
                settings.error_use_handle.saturating_sub(1),
            ),
            ExponentialBackoff::share_violation(settings.share_violation_retries),
        )
    }

    /// No waiting between retries
    pub fn immediate(open_retries: u32, share_retries: u32) -> Self {
        Self::new(
            FixedDelay::new(Duration::ZERO, open_retries),
            ExponentialBackoff::new(Duration::ZERO, Duration::ZERO, share_retries)
                .with_jitter(0.0),
        )
    }

    /// Strategy governing this error
    pub fn strategy_for(&self, error: &SectorError) -> &dyn RetryStrategy {
        match error {
            SectorError::TransientShareViolation { .. } => &self.share_violation,
            _ => &self.open_failure,
        }
    }
}

impl Default for HandleRetry {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
