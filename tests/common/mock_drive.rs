/// File-backed stand-in for a block device
///
/// A sparse-free temp file of N sectors filled with a known byte, driven
/// through `RawDevice` with direct I/O and O_EXCL off so it works on tmpfs.
use hddray::error::HandleRetry;
use hddray::{RawDevice, SECTOR_SIZE};
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

pub const FILL: u8 = 0xAB;

pub struct MockDrive {
    pub temp_file: NamedTempFile,
    pub sectors: u64,
}

impl MockDrive {
    pub fn new(sectors: u64) -> std::io::Result<Self> {
        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(&vec![FILL; sectors as usize * SECTOR_SIZE])?;
        temp_file.flush()?;
        Ok(Self { temp_file, sectors })
    }

    /// Raw adapter over the backing file
    pub fn device(&self) -> RawDevice {
        RawDevice::new(self.temp_file.path())
            .with_direct_io(false)
            .with_exclusive(false)
            .with_retry(HandleRetry::immediate(1, 1))
    }

    /// Bytes of one sector straight from the file
    pub fn sector(&self, sector: u64) -> std::io::Result<Vec<u8>> {
        let mut file = self.temp_file.reopen()?;
        file.seek(SeekFrom::Start(sector * SECTOR_SIZE as u64))?;
        let mut buf = vec![0u8; SECTOR_SIZE];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn sector_is(&self, sector: u64, byte: u8) -> bool {
        self.sector(sector)
            .map(|data| data.iter().all(|&b| b == byte))
            .unwrap_or(false)
    }
}
