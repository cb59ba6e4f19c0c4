/// Error classification for retry decisions
///
/// Device errors are sorted into classes that dictate whether the handle
/// acquisition loop may try again, whether the current repair attempt is lost,
/// or whether the run has to stop.
use crate::SectorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of errors for recovery strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Expected to clear on its own (another holder has the device open)
    Transient,

    /// Handle could not be acquired; worth a bounded number of retries
    Recoverable,

    /// The attempt is lost but the scan continues (I/O error, too slow)
    AttemptFailed,

    /// The run cannot continue
    Fatal,

    /// Operator asked to stop
    UserInterrupted,
}

impl ErrorClass {
    /// Get human-readable description of error class
    pub fn description(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "Device busy, will clear on retry",
            ErrorClass::Recoverable => "Handle acquisition failed, retrying with delay",
            ErrorClass::AttemptFailed => "Sector access failed for this attempt",
            ErrorClass::Fatal => "Unrecoverable error requiring abort",
            ErrorClass::UserInterrupted => "Operation cancelled by user",
        }
    }

    /// Check if this error class allows retries
    pub fn allows_retry(&self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::Recoverable)
    }

    /// Check if this error class stops the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorClass::Fatal | ErrorClass::UserInterrupted)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Transient => write!(f, "Transient"),
            ErrorClass::Recoverable => write!(f, "Recoverable"),
            ErrorClass::AttemptFailed => write!(f, "AttemptFailed"),
            ErrorClass::Fatal => write!(f, "Fatal"),
            ErrorClass::UserInterrupted => write!(f, "UserInterrupted"),
        }
    }
}

impl SectorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SectorError::TransientShareViolation { .. } => ErrorClass::Transient,
            SectorError::DeviceOpenFailure { .. } => ErrorClass::Recoverable,
            SectorError::IoFailure { .. } | SectorError::LatencyExceeded { .. } => {
                ErrorClass::AttemptFailed
            }
            SectorError::RecoveryLog(_)
            | SectorError::InvalidSelection(_)
            | SectorError::Config(_) => ErrorClass::Fatal,
            SectorError::Interrupted => ErrorClass::UserInterrupted,
        }
    }
}

/// Sort a failed `open` into a share violation or a plain open failure.
///
/// A block device opened with O_EXCL while mounted or held by another
/// exclusive opener reports EBUSY.
pub fn classify_open_error(device: &str, error: std::io::Error) -> SectorError {
    match error.raw_os_error() {
        Some(code) if is_share_violation(code) => SectorError::TransientShareViolation {
            device: device.to_string(),
        },
        _ => SectorError::DeviceOpenFailure {
            device: device.to_string(),
            source: error,
        },
    }
}

fn is_share_violation(code: i32) -> bool {
    code == libc::EBUSY || code == libc::ETXTBSY || code == libc::EAGAIN
}
