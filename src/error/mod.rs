/// Error handling support for device access
///
/// `SectorError` itself lives at the crate root. This module decides what an
/// error means for the caller:
/// - classification into retryable, attempt-level, and fatal failures
/// - retry strategies used while acquiring an exclusive device handle
///
/// ```text
/// open() ──fails──► classify_open_error ──► HandleRetry::strategy_for
///                                              │
///                        ┌─────────────────────┴──────────────┐
///                        ↓                                    ↓
///            share violation: ExponentialBackoff    other: FixedDelay
/// ```
pub mod classification;
pub mod retry;

pub use classification::{classify_open_error, ErrorClass};
pub use retry::{ExponentialBackoff, FixedDelay, HandleRetry, RetryStrategy};
