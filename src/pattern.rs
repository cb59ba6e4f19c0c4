/// Test patterns written over a sector during reconditioning
///
/// A pattern is a short byte sequence tiled to fill exactly one sector.
/// The canonical pair alternates 0x55 (01010101) and 0xAA (10101010) so that
/// every bit cell flips between consecutive writes.
use crate::io::{SectorBuf, SECTOR_SIZE};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    bytes: Vec<u8>,
}

impl Pattern {
    /// Create a pattern from a non-empty byte sequence that divides the sector size
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() || SECTOR_SIZE % bytes.len() != 0 {
            return None;
        }
        Some(Self { bytes })
    }

    pub fn byte(value: u8) -> Self {
        Self { bytes: vec![value] }
    }

    /// The alternating pair used by every mode, in write order
    pub fn standard_pair() -> [Pattern; 2] {
        [Self::byte(0x55), Self::byte(0xAA)]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Tile the pattern to fill one sector
    pub fn tile(&self) -> SectorBuf {
        let mut sector = [0u8; SECTOR_SIZE];
        for chunk in sector.chunks_exact_mut(self.bytes.len()) {
            chunk.copy_from_slice(&self.bytes);
        }
        sector
    }

    /// Byte-for-byte comparison of a sector against this pattern tiled
    pub fn matches(&self, data: &[u8]) -> bool {
        data.len() == SECTOR_SIZE
            && data
                .chunks_exact(self.bytes.len())
                .all(|chunk| chunk == self.bytes.as_slice())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "0x{:02X}", b)?;
        }
        Ok(())
    }
}
