// In-memory device with injectable sector faults

use super::{ReadOutcome, SectorBuf, SectorDevice, SECTOR_SIZE};
use crate::{SectorError, SectorResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::time::Duration;

/// Misbehaviour attached to a single sector
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    /// Every read fails
    Unreadable,
    /// Reads succeed but take this long
    Slow(Duration),
    /// Reads are slow until this many writes have landed
    SlowUntilWrites { latency: Duration, writes: u32 },
    /// The first `n` reads fail, later reads succeed
    FailingReads(u32),
    /// Reads fail until this many writes have landed
    HealsAfterWrites(u32),
    /// Writes are acknowledged but never change the stored bytes
    IgnoresWrites,
    /// Every write fails
    WriteFails,
}

#[derive(Debug, Default)]
struct SectorState {
    reads: u32,
    writes: u32,
}

/// Device backed by memory, with per-sector faults and access counters.
///
/// Used for rehearsing a run without hardware and for exercising the
/// orchestrators against reproducible failures.
#[derive(Debug)]
pub struct SimulatedDevice {
    label: String,
    capacity: u64,
    base_latency: Duration,
    fill: u8,
    contents: RefCell<HashMap<u64, SectorBuf>>,
    faults: HashMap<u64, Fault>,
    state: RefCell<HashMap<u64, SectorState>>,
    trace: RefCell<Vec<(char, u64)>>,
}

impl SimulatedDevice {
    pub fn new(capacity: u64) -> Self {
        Self {
            label: "sim0".to_string(),
            capacity,
            base_latency: Duration::from_millis(1),
            fill: 0xAB,
            contents: RefCell::new(HashMap::new()),
            faults: HashMap::new(),
            state: RefCell::new(HashMap::new()),
            trace: RefCell::new(Vec::new()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_base_latency(mut self, latency: Duration) -> Self {
        self.base_latency = latency;
        self
    }

    pub fn with_fault(mut self, sector: u64, fault: Fault) -> Self {
        self.faults.insert(sector, fault);
        self
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current bytes of a sector
    pub fn contents(&self, sector: u64) -> SectorBuf {
        self.contents
            .borrow()
            .get(&sector)
            .copied()
            .unwrap_or([self.fill; SECTOR_SIZE])
    }

    pub fn reads(&self, sector: u64) -> u32 {
        self.state.borrow().get(&sector).map_or(0, |s| s.reads)
    }

    pub fn writes(&self, sector: u64) -> u32 {
        self.state.borrow().get(&sector).map_or(0, |s| s.writes)
    }

    pub fn total_reads(&self) -> u32 {
        self.state.borrow().values().map(|s| s.reads).sum()
    }

    pub fn total_writes(&self) -> u32 {
        self.state.borrow().values().map(|s| s.writes).sum()
    }

    /// Ordered access log: ('r' | 'w', sector)
    pub fn trace(&self) -> Vec<(char, u64)> {
        self.trace.borrow().clone()
    }

    fn check_range(&self, sector: u64) -> SectorResult<()> {
        if sector < self.capacity {
            Ok(())
        } else {
            Err(SectorError::IoFailure {
                sector,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "sector beyond end of device"),
            })
        }
    }

    fn media_error(sector: u64) -> SectorError {
        SectorError::IoFailure {
            sector,
            source: io::Error::from_raw_os_error(libc::EIO),
        }
    }
}

impl SectorDevice for SimulatedDevice {
    fn device_path(&self) -> &str {
        &self.label
    }

    fn read_sector(&self, sector: u64) -> SectorResult<ReadOutcome> {
        self.trace.borrow_mut().push(('r', sector));
        self.check_range(sector)?;

        let (reads, writes) = {
            let mut state = self.state.borrow_mut();
            let entry = state.entry(sector).or_default();
            entry.reads += 1;
            (entry.reads, entry.writes)
        };

        let latency = match self.faults.get(&sector) {
            Some(Fault::Unreadable) => return Err(Self::media_error(sector)),
            Some(Fault::FailingReads(n)) if reads <= *n => return Err(Self::media_error(sector)),
            Some(Fault::HealsAfterWrites(n)) if writes < *n => {
                return Err(Self::media_error(sector))
            }
            Some(Fault::Slow(latency)) => *latency,
            Some(Fault::SlowUntilWrites { latency, writes: n }) if writes < *n => *latency,
            _ => self.base_latency,
        };

        Ok(ReadOutcome {
            data: self.contents(sector),
            latency,
        })
    }

    fn write_sector(&self, sector: u64, data: &SectorBuf) -> SectorResult<()> {
        self.trace.borrow_mut().push(('w', sector));
        self.check_range(sector)?;

        match self.faults.get(&sector) {
            Some(Fault::WriteFails) => return Err(Self::media_error(sector)),
            Some(Fault::IgnoresWrites) => {}
            _ => {
                self.contents.borrow_mut().insert(sector, *data);
            }
        }

        self.state.borrow_mut().entry(sector).or_default().writes += 1;
        Ok(())
    }
}
