// Page-aligned single-sector buffer for O_DIRECT transfers

use super::{SectorBuf, SECTOR_SIZE};

/// Alignment accepted by O_DIRECT on every logical block size we expect
pub const DIRECT_IO_ALIGNMENT: usize = 4096;

/// One sector of storage aligned for direct I/O.
///
/// The alignment lives in the type, so no allocator tricks are needed and the
/// buffer can sit on the stack.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct AlignedSector {
    bytes: SectorBuf,
}

impl AlignedSector {
    pub fn zeroed() -> Self {
        Self {
            bytes: [0u8; SECTOR_SIZE],
        }
    }

    pub fn from_sector(data: &SectorBuf) -> Self {
        Self { bytes: *data }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_sector(self) -> SectorBuf {
        self.bytes
    }
}

impl Default for AlignedSector {
    fn default() -> Self {
        Self::zeroed()
    }
}
