// Mode orchestrators
//
// Each mode walks its sectors one at a time, finishes every sector before
// starting the next, and appends exactly one decided line per outcome to the
// recovery log. Interrupts are honoured between sectors only.
//
// - recovery.rs: read first, repair only what fails
// - workout.rs: repair sectors the log still lists as bad
// - surface_scan.rs: unconditional write/verify over the range ("f1")
// - regenerator.rs: endurance reads with repair and reset on failure

pub mod recovery;
pub mod regenerator;
pub mod surface_scan;
pub mod workout;

use crate::config::{Mode, Settings};
use crate::io::SectorDevice;
use crate::recovery_log::{LogEntry, Note, RecoveryLog, SectorStatus};
use crate::repair::{RepairClass, RepairOutcome, RepairPolicy};
use crate::ui::ScanProgress;
use crate::{SectorError, SectorResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Everything a mode needs for one run, borrowed for its duration
pub struct ScanContext<'a> {
    pub settings: &'a Settings,
    pub device: &'a dyn SectorDevice,
    pub log: &'a RecoveryLog,
    pub progress: ScanProgress,
}

impl<'a> ScanContext<'a> {
    pub fn new(settings: &'a Settings, device: &'a dyn SectorDevice, log: &'a RecoveryLog) -> Self {
        Self {
            settings,
            device,
            log,
            progress: ScanProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ScanProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Append a decided line, count it, and show it
    pub(crate) fn record(
        &self,
        summary: &mut ModeSummary,
        entry: LogEntry,
        class: RepairClass,
        latency: Option<Duration>,
    ) -> SectorResult<()> {
        self.log.append(&entry)?;
        summary.tally(&entry, class);
        self.progress.sector_logged(&entry, class, latency);
        Ok(())
    }

    /// Stop check between sectors
    pub(crate) fn interrupted(&self, summary: &mut ModeSummary, next_sector: u64) -> bool {
        if crate::is_interrupted() {
            tracing::warn!(next_sector, "Interrupted, stopping before next sector");
            summary.interrupted = true;
            true
        } else {
            false
        }
    }
}

/// Log line for a repair-policy outcome
pub(crate) fn repair_entry(sector: u64, outcome: &RepairOutcome, policy: &RepairPolicy) -> LogEntry {
    let params = policy.params();
    LogEntry {
        sector,
        status: if outcome.success {
            SectorStatus::Good
        } else {
            SectorStatus::Bad
        },
        attempts: outcome.attempts,
        writes: policy.writes_per_attempt(),
        reads: params.reads_per_round,
        max_attempts: params.max_attempts,
        note: Note::for_success(outcome.success),
    }
}

/// Counts for one mode run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModeSummary {
    pub mode: String,
    pub device: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Sectors fully processed
    pub sectors: u64,
    /// Log lines written
    pub entries: u64,
    pub good: u64,
    /// Good only after rewriting
    pub repaired: u64,
    pub unrecovered: u64,
    pub unstable: u64,
    pub abandoned: u64,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl ModeSummary {
    fn start(mode: Mode, device: &dyn SectorDevice) -> Self {
        Self {
            mode: mode.to_string(),
            device: device.device_path().to_string(),
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    fn tally(&mut self, entry: &LogEntry, class: RepairClass) {
        self.entries += 1;
        match entry.status {
            SectorStatus::Good => {
                self.good += 1;
                if class == RepairClass::Rewrite {
                    self.repaired += 1;
                }
            }
            SectorStatus::Bad => self.unrecovered += 1,
            SectorStatus::Unstable => self.unstable += 1,
            SectorStatus::Abandoned => self.abandoned += 1,
            SectorStatus::Legacy => {}
        }
    }

    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} on {}\n", self.mode, self.device));
        output.push_str(&format!("{}\n", "=".repeat(60)));
        if let Some(started) = self.started_at {
            output.push_str(&format!(
                "Started:           {}\n",
                started.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        output.push_str(&format!("Sectors processed: {}\n", self.sectors));
        output.push_str(&format!("Log entries:       {}\n", self.entries));
        output.push_str(&format!("Good:              {} ({} after rewrite)\n", self.good, self.repaired));
        output.push_str(&format!("Unrecovered:       {}\n", self.unrecovered));
        output.push_str(&format!("Unstable:          {}\n", self.unstable));
        output.push_str(&format!("Abandoned:         {}\n", self.abandoned));
        output.push_str(&format!(
            "Elapsed:           {}\n",
            humantime::format_duration(Duration::from_secs(self.elapsed.as_secs()))
        ));
        if self.interrupted {
            output.push_str("Run was interrupted before the end of the range\n");
        }
        output
    }
}

impl Mode {
    /// Run this mode to completion or interrupt
    pub fn run(&self, ctx: &ScanContext<'_>) -> SectorResult<ModeSummary> {
        let range = ctx.settings.effective_range();
        if self.scans_range() && range.is_empty() {
            return Err(SectorError::InvalidSelection(format!(
                "empty sector range {}..{}",
                range.start, range.end
            )));
        }

        let start = Instant::now();
        let mut summary = ModeSummary::start(*self, ctx.device);
        tracing::info!(mode = %self, device = %ctx.device.device_path(), "Starting run");

        match self {
            Mode::Recovery => recovery::run(ctx, &mut summary)?,
            Mode::Workout { retest_unstable } => workout::run(ctx, *retest_unstable, &mut summary)?,
            Mode::SurfaceScan => surface_scan::run(ctx, &mut summary)?,
            Mode::Regenerator => regenerator::run(ctx, &mut summary)?,
        }

        ctx.progress.finish();
        summary.elapsed = start.elapsed();
        tracing::info!(
            mode = %self,
            sectors = summary.sectors,
            good = summary.good,
            unrecovered = summary.unrecovered,
            abandoned = summary.abandoned,
            interrupted = summary.interrupted,
            "Run finished"
        );
        Ok(summary)
    }
}
