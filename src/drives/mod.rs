// Block device enumeration for the device picker
//
// - detection.rs: /sys/block scan

pub mod detection;

#[cfg(test)]
mod detection_tests;

pub use detection::DriveDetector;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveInfo {
    pub device_path: PathBuf,
    pub model: String,
    pub size_bytes: u64,
    /// The device or a partition of it appears in /proc/mounts
    pub is_mounted: bool,
}

impl DriveInfo {
    pub fn size_gib(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }
}

impl fmt::Display for DriveInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({:.1} GiB)",
            self.device_path.display(),
            self.model,
            self.size_gib()
        )?;
        if self.is_mounted {
            write!(f, " [mounted]")?;
        }
        Ok(())
    }
}
