// Raw block device access: one exclusive open per sector operation

use super::{sector_offset, AlignedSector, ReadOutcome, SectorBuf, SectorDevice};
use crate::config::Settings;
use crate::error::{classify_open_error, HandleRetry};
use crate::{SectorError, SectorResult};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Access requested when acquiring a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    ReadWrite,
}

/// Block device opened per operation.
///
/// No handle outlives a single read or write. Latency is measured around the
/// positioned read call only, so open/close cost never leaks into the numbers
/// compared against thresholds.
#[derive(Debug, Clone)]
pub struct RawDevice {
    path: PathBuf,
    display: String,
    direct_io: bool,
    exclusive: bool,
    retry: HandleRetry,
}

impl RawDevice {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            display: path.display().to_string(),
            path,
            direct_io: true,
            exclusive: true,
            retry: HandleRetry::default(),
        }
    }

    pub fn from_settings(path: impl AsRef<Path>, settings: &Settings) -> Self {
        Self::new(path)
            .with_direct_io(settings.direct_io)
            .with_retry(HandleRetry::from_settings(settings))
    }

    /// Bypass the page cache (O_DIRECT | O_SYNC)
    pub fn with_direct_io(mut self, direct_io: bool) -> Self {
        self.direct_io = direct_io;
        self
    }

    /// Refuse to open while another holder has the device (O_EXCL)
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn with_retry(mut self, retry: HandleRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self, access: AccessMode) -> std::io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.read(true);
        if access == AccessMode::ReadWrite {
            opts.write(true);
        }

        let mut flags = 0;
        if self.exclusive {
            // On a block device O_EXCL without O_CREAT fails with EBUSY while in use
            flags |= libc::O_EXCL;
        }
        if self.direct_io {
            flags |= libc::O_DIRECT | libc::O_SYNC;
        }
        opts.custom_flags(flags);

        opts.open(&self.path)
    }

    /// Acquire a scoped handle, retrying busy and failed opens per policy
    pub fn acquire(&self, access: AccessMode) -> SectorResult<DeviceHandle> {
        let mut open_retries = 0u32;
        let mut share_retries = 0u32;

        loop {
            let error = match self.open(access) {
                Ok(file) => return Ok(DeviceHandle { file }),
                Err(source) => classify_open_error(&self.display, source),
            };

            let retries = match error {
                SectorError::TransientShareViolation { .. } => &mut share_retries,
                _ => &mut open_retries,
            };
            let strategy = self.retry.strategy_for(&error);
            if !strategy.should_retry(*retries, &error) {
                tracing::warn!(
                    device = %self.display,
                    access = ?access,
                    retries = *retries,
                    error = %error,
                    "Giving up on device handle"
                );
                return Err(error);
            }

            let delay = strategy.next_delay(*retries);
            *retries += 1;
            tracing::debug!(
                device = %self.display,
                retry = *retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying device open"
            );
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }
}

impl SectorDevice for RawDevice {
    fn device_path(&self) -> &str {
        &self.display
    }

    fn read_sector(&self, sector: u64) -> SectorResult<ReadOutcome> {
        let handle = self.acquire(AccessMode::Read)?;
        let mut buffer = AlignedSector::zeroed();
        let latency = handle.read_at(sector, &mut buffer)?;
        drop(handle);

        Ok(ReadOutcome {
            data: buffer.into_sector(),
            latency,
        })
    }

    fn write_sector(&self, sector: u64, data: &SectorBuf) -> SectorResult<()> {
        let handle = self.acquire(AccessMode::ReadWrite)?;
        handle.write_at(sector, &AlignedSector::from_sector(data))?;
        if !self.direct_io {
            // Without O_SYNC the pattern would otherwise stop in the page cache
            handle.sync(sector)?;
        }
        Ok(())
    }
}

/// Open device handle, closed when dropped
pub struct DeviceHandle {
    file: File,
}

impl DeviceHandle {
    /// Read one sector, returning the time spent in the read call
    pub fn read_at(&self, sector: u64, buffer: &mut AlignedSector) -> SectorResult<Duration> {
        let start = Instant::now();
        self.file
            .read_exact_at(buffer.as_mut_slice(), sector_offset(sector))
            .map_err(|source| SectorError::IoFailure { sector, source })?;
        Ok(start.elapsed())
    }

    pub fn write_at(&self, sector: u64, buffer: &AlignedSector) -> SectorResult<()> {
        self.file
            .write_all_at(buffer.as_slice(), sector_offset(sector))
            .map_err(|source| SectorError::IoFailure { sector, source })
    }

    fn sync(&self, sector: u64) -> SectorResult<()> {
        self.file
            .sync_data()
            .map_err(|source| SectorError::IoFailure { sector, source })
    }
}
