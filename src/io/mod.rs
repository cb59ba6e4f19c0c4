pub mod aligned;
pub mod raw_device;
pub mod simulated;

#[cfg(test)]
mod tests;

// Re-exports
pub use aligned::AlignedSector;
pub use raw_device::{AccessMode, DeviceHandle, RawDevice};
pub use simulated::{Fault, SimulatedDevice};

use crate::{SectorError, SectorResult};
use std::time::Duration;

/// Fixed addressable unit of every device this tool touches
pub const SECTOR_SIZE: usize = 512;

/// Sectors covered when `max_sector` is left at 0 (the first 128 MiB)
pub const DEFAULT_SCAN_SECTORS: u64 = (128 * 1024 * 1024) / SECTOR_SIZE as u64;

/// One sector worth of bytes
pub type SectorBuf = [u8; SECTOR_SIZE];

/// Byte offset of a sector index
pub fn sector_offset(sector: u64) -> u64 {
    sector * SECTOR_SIZE as u64
}

/// Successful single-sector read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub data: SectorBuf,
    /// Time spent in the positioned read call only
    pub latency: Duration,
}

impl ReadOutcome {
    pub fn latency_ms(&self) -> f64 {
        latency_ms(self.latency)
    }

    pub fn within(&self, limit_ms: u64) -> bool {
        self.latency <= Duration::from_millis(limit_ms)
    }

    /// Turn a slow read into a `LatencyExceeded` error
    pub fn check_latency(&self, sector: u64, limit_ms: u64) -> SectorResult<()> {
        if self.within(limit_ms) {
            Ok(())
        } else {
            Err(SectorError::LatencyExceeded {
                sector,
                latency_ms: self.latency_ms(),
                limit_ms,
            })
        }
    }
}

pub fn latency_ms(latency: Duration) -> f64 {
    latency.as_secs_f64() * 1000.0
}

/// Sector-granular access to a block device.
///
/// Every call is an independent acquire/operate/release cycle; implementations
/// must not keep a handle open between calls.
#[cfg_attr(test, mockall::automock)]
pub trait SectorDevice {
    /// Path or label used in diagnostics
    fn device_path(&self) -> &str;

    /// Read exactly one sector and report the latency of the read itself
    fn read_sector(&self, sector: u64) -> SectorResult<ReadOutcome>;

    /// Overwrite exactly one sector
    fn write_sector(&self, sector: u64, data: &SectorBuf) -> SectorResult<()>;
}
