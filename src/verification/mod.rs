// Sector verification: one read, compared against a tiled pattern

use crate::io::SectorDevice;
use crate::pattern::Pattern;
use std::ops::Range;
use std::time::Duration;

/// Sectors sampled by `calibrate_latency` by default
pub const CALIBRATION_SECTORS: Range<u64> = 0..8;

/// Result of a single verification read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub matches: bool,
    /// Time spent in the read call; `None` when the read itself failed
    pub latency: Option<Duration>,
}

impl VerifyOutcome {
    /// Verified content, read within `max_latency_ms`
    pub fn is_good(&self, max_latency_ms: u64) -> bool {
        self.matches && !self.exceeds(max_latency_ms)
    }

    /// A read that completed but took longer than the ceiling.
    /// A failed read has no latency and never counts as a breach.
    pub fn exceeds(&self, max_latency_ms: u64) -> bool {
        self.latency
            .map_or(false, |l| l > Duration::from_millis(max_latency_ms))
    }
}

/// Read `sector` once and compare it byte-for-byte with `pattern` tiled to a
/// full sector. I/O failures come back as a non-matching outcome; retrying is
/// up to the caller.
pub fn verify(device: &dyn SectorDevice, sector: u64, pattern: &Pattern) -> VerifyOutcome {
    match device.read_sector(sector) {
        Ok(outcome) => VerifyOutcome {
            matches: pattern.matches(&outcome.data),
            latency: Some(outcome.latency),
        },
        Err(e) => {
            tracing::debug!(sector, error = %e, "Verification read failed");
            VerifyOutcome {
                matches: false,
                latency: None,
            }
        }
    }
}

/// Average read latency over `sectors`, ignoring reads that failed.
///
/// Returns `None` when no read succeeded.
pub fn calibrate_latency(device: &dyn SectorDevice, sectors: Range<u64>) -> Option<Duration> {
    let mut total = Duration::ZERO;
    let mut samples = 0u32;

    for sector in sectors {
        match device.read_sector(sector) {
            Ok(outcome) => {
                total += outcome.latency;
                samples += 1;
            }
            Err(e) => tracing::warn!(sector, error = %e, "Calibration read failed"),
        }
    }

    if samples == 0 {
        None
    } else {
        Some(total / samples)
    }
}
