//! Run settings
//!
//! Loaded once from an INI file (`[DEFAULT]` section) before any mode runs and
//! passed by reference everywhere after that. Nothing mutates a `Settings`
//! during a run; CLI overrides produce a new value up front.

use crate::io::DEFAULT_SCAN_SECTORS;
use crate::repair::RepairParams;
use crate::{SectorError, SectorResult};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SETTINGS_FILE: &str = "settings.ini";
pub const DEFAULT_LOG_FILE: &str = "list of recovered sectors.txt";

/// Which pattern the verification reads compare against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyTarget {
    /// Last pattern whose write succeeded in the current attempt
    Written,
    /// Last pattern the write loop tried, whether or not it landed
    Attempted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Max read latency (ms) for a sector to count as good
    pub max_latency: u64,
    /// Regenerator: resets allowed per sector before abandoning it
    pub max_retries: u32,
    /// Regenerator: per-read latency ceiling (ms) during endurance reads
    pub max_repair_latency: u64,
    pub min_sector: u64,
    /// Exclusive upper bound; 0 means the first 128 MiB
    pub max_sector: u64,
    pub regenerator_reads: u32,
    pub regenerator_sector_write: u32,
    pub regenerator_sector_read: u32,
    pub regenerator_sector_attempts: u32,
    pub f1_sector_write: u32,
    pub f1_sector_read: u32,
    pub f1_sector_attempts: u32,
    pub repair_sector_write: u32,
    pub repair_sector_read: u32,
    pub repair_sector_attempts: u32,
    /// 1=recovery, 2=workout, 3=surface scan, 4=regenerator
    pub mode: u32,
    /// 1-based index into the enumerated device list
    pub drive_number: u32,
    pub auto_mode: bool,
    /// Total tries to open the device handle
    pub error_use_handle: u32,
    pub handle_retry_delay_ms: u64,
    pub share_violation_retries: u32,
    pub regenerator_settle_ms: u64,
    pub auto_start_delay_secs: u64,
    pub direct_io: bool,
    pub verify_target: VerifyTarget,
    pub log_file: PathBuf,
    /// Explicit device path; skips enumeration when set
    pub device: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_latency: 100,
            max_retries: 8,
            max_repair_latency: 50,
            min_sector: 0,
            max_sector: 0,
            regenerator_reads: 32,
            regenerator_sector_write: 8,
            regenerator_sector_read: 1,
            regenerator_sector_attempts: 4,
            f1_sector_write: 3,
            f1_sector_read: 5,
            f1_sector_attempts: 3,
            repair_sector_write: 3,
            repair_sector_read: 5,
            repair_sector_attempts: 3,
            mode: 1,
            drive_number: 1,
            auto_mode: true,
            error_use_handle: 3,
            handle_retry_delay_ms: 1000,
            share_violation_retries: 10,
            regenerator_settle_ms: 100,
            auto_start_delay_secs: 5,
            direct_io: true,
            verify_target: VerifyTarget::Written,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            device: None,
        }
    }
}

impl Settings {
    /// Load settings from an INI file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> SectorResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let cfg = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini))
            .build()
            .map_err(|e| SectorError::Config(format!("{}: {}", path.display(), e)))?;

        Self::from_config(&cfg)
            .map_err(|e| SectorError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse settings from INI text
    pub fn from_ini_str(text: &str) -> SectorResult<Self> {
        let cfg = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()
            .map_err(|e| SectorError::Config(e.to_string()))?;

        Self::from_config(&cfg).map_err(|e| SectorError::Config(e.to_string()))
    }

    fn from_config(cfg: &Config) -> Result<Self, config::ConfigError> {
        // Older config releases lowercase section names, newer ones keep case
        for section in ["DEFAULT", "default"] {
            match cfg.get::<Settings>(section) {
                Ok(settings) => return Ok(settings),
                Err(config::ConfigError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        // Section-less file: keys at top level
        cfg.clone().try_deserialize()
    }

    /// Settings file to use when none is given on the command line
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(DEFAULT_SETTINGS_FILE);
        if local.exists() {
            return local;
        }
        directories::ProjectDirs::from("", "", "hddray")
            .map(|dirs| dirs.config_dir().join(DEFAULT_SETTINGS_FILE))
            .filter(|p| p.exists())
            .unwrap_or(local)
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_range(mut self, min_sector: Option<u64>, max_sector: Option<u64>) -> Self {
        if let Some(min) = min_sector {
            self.min_sector = min;
        }
        if let Some(max) = max_sector {
            self.max_sector = max;
        }
        self
    }

    pub fn with_device(mut self, device: impl Into<PathBuf>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_log_file(mut self, log_file: impl Into<PathBuf>) -> Self {
        self.log_file = log_file.into();
        self
    }

    /// Sectors scanned by the range modes: `[min_sector, max_sector)`
    pub fn effective_range(&self) -> Range<u64> {
        let max = if self.max_sector == 0 {
            DEFAULT_SCAN_SECTORS
        } else {
            self.max_sector
        };
        self.min_sector..max
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> SectorResult<()> {
        let range = self.effective_range();
        if range.is_empty() {
            return Err(SectorError::InvalidSelection(format!(
                "empty sector range {}..{}",
                range.start, range.end
            )));
        }
        Mode::from_number(self.mode)?;
        if self.drive_number == 0 {
            return Err(SectorError::InvalidSelection(
                "drive_number is 1-based".to_string(),
            ));
        }
        Ok(())
    }

    /// Parameters for Recovery and Workout repairs
    pub fn repair_params(&self) -> RepairParams {
        RepairParams {
            max_attempts: self.repair_sector_attempts,
            writes_per_pattern: self.repair_sector_write,
            reads_per_round: self.repair_sector_read,
            max_latency_ms: self.max_latency,
            verify_target: self.verify_target,
        }
    }

    /// Parameters for repairs triggered inside Regenerator
    pub fn regenerator_params(&self) -> RepairParams {
        RepairParams {
            max_attempts: self.regenerator_sector_attempts,
            writes_per_pattern: self.regenerator_sector_write,
            reads_per_round: self.regenerator_sector_read,
            max_latency_ms: self.max_latency,
            verify_target: self.verify_target,
        }
    }

    /// Parameters for the Surface-Scan write/verify rounds
    pub fn surface_scan_params(&self) -> RepairParams {
        RepairParams {
            max_attempts: self.f1_sector_attempts,
            writes_per_pattern: self.f1_sector_write,
            reads_per_round: self.f1_sector_read,
            max_latency_ms: self.max_latency,
            verify_target: self.verify_target,
        }
    }
}

/// Operating mode, numbered as on the selection prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Recovery,
    /// Targeted re-pass over sectors recorded in the recovery log
    Workout { retest_unstable: bool },
    SurfaceScan,
    Regenerator,
}

impl Mode {
    pub fn from_number(number: u32) -> SectorResult<Self> {
        match number {
            1 => Ok(Mode::Recovery),
            2 => Ok(Mode::Workout {
                retest_unstable: false,
            }),
            3 => Ok(Mode::SurfaceScan),
            4 => Ok(Mode::Regenerator),
            other => Err(SectorError::InvalidSelection(format!(
                "mode {} (expected 1-4)",
                other
            ))),
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            Mode::Recovery => 1,
            Mode::Workout { .. } => 2,
            Mode::SurfaceScan => 3,
            Mode::Regenerator => 4,
        }
    }

    /// Only Workout reads its targets from the log instead of a range
    pub fn scans_range(&self) -> bool {
        !matches!(self, Mode::Workout { .. })
    }

    pub fn all() -> [Mode; 4] {
        [
            Mode::Recovery,
            Mode::Workout {
                retest_unstable: false,
            },
            Mode::SurfaceScan,
            Mode::Regenerator,
        ]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Recovery => write!(f, "Recovery mode"),
            Mode::Workout { .. } => write!(f, "Workout mode"),
            Mode::SurfaceScan => write!(f, "f1 mode (surface scan)"),
            Mode::Regenerator => write!(f, "Regenerator mode"),
        }
    }
}

impl FromStr for Mode {
    type Err = SectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Mode::from_number(n);
        }
        match s.to_lowercase().as_str() {
            "recovery" | "repair" => Ok(Mode::Recovery),
            "workout" => Ok(Mode::Workout {
                retest_unstable: false,
            }),
            "f1" | "surface" | "surface-scan" => Ok(Mode::SurfaceScan),
            "regenerator" => Ok(Mode::Regenerator),
            other => Err(SectorError::InvalidSelection(format!("mode '{}'", other))),
        }
    }
}
