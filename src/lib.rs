pub mod config;
pub mod drives;
pub mod error;
pub mod io;
pub mod modes;
pub mod pattern;
pub mod recovery_log;
pub mod repair;
pub mod ui;
pub mod verification;

// Re-export the pieces a caller needs to run a mode end to end
pub use config::{Mode, Settings, VerifyTarget};
pub use io::{RawDevice, ReadOutcome, SectorDevice, SimulatedDevice, SECTOR_SIZE};
pub use modes::{ModeSummary, ScanContext};
pub use pattern::Pattern;
pub use recovery_log::{LogEntry, RecoveryLog, SectorStatus};
pub use repair::{RepairClass, RepairOutcome, RepairParams, RepairPolicy};

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// Global flag for handling Ctrl+C interrupts
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Failures surfaced by device access, the recovery log, and startup validation.
///
/// Only `RecoveryLog`, `InvalidSelection` and `Config` stop a run. Everything
/// else is absorbed per sector by the repair policy or the mode orchestrators.
#[derive(Error, Debug)]
pub enum SectorError {
    #[error("Failed to open {device}: {source}")]
    DeviceOpenFailure {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {device} is held open by another process")]
    TransientShareViolation { device: String },

    #[error("I/O failure at sector {sector}: {source}")]
    IoFailure {
        sector: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Sector {sector} access time {latency_ms:.2}ms exceeds max latency {limit_ms}ms")]
    LatencyExceeded {
        sector: u64,
        latency_ms: f64,
        limit_ms: u64,
    },

    #[error("Recovery log unavailable: {0}")]
    RecoveryLog(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation interrupted by user")]
    Interrupted,
}

pub type SectorResult<T> = Result<T, SectorError>;

#[cfg(test)]
mod lib_tests;
