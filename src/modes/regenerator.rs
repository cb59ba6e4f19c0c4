use super::{repair_entry, ModeSummary, ScanContext};
use crate::recovery_log::{LogEntry, Note, SectorStatus};
use crate::repair::{RepairClass, RepairPolicy};
use crate::SectorResult;
use std::time::Duration;

/// How a sector left the regenerator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorFate {
    /// Every endurance read passed without a single repair
    Clean,
    /// Completed its reads after `resets` repairs
    Unstable { resets: u32 },
    /// Still failing after `max_retries` resets
    Abandoned,
}

/// Regenerator: endurance reads per sector, repairing and starting over on
/// any failed or slow read.
pub fn run(ctx: &ScanContext<'_>, summary: &mut ModeSummary) -> SectorResult<()> {
    let policy = RepairPolicy::new(ctx.settings.regenerator_params());
    let range = ctx.settings.effective_range();
    ctx.progress.set_total(range.end.saturating_sub(range.start));
    let end = range.end;

    for sector in range {
        if ctx.interrupted(summary, sector) {
            break;
        }
        ctx.progress.sector_started(sector);

        let fate = regenerate_sector(ctx, &policy, sector, end, summary)?;
        tracing::debug!(sector, fate = ?fate, "Sector done");
        summary.sectors += 1;
        ctx.progress.advance();
    }

    Ok(())
}

/// Run one sector to completion.
///
/// Reads the sector up to `regenerator_reads` times, each within
/// `max_repair_latency`. A failing read triggers a repair whose outcome is
/// logged at once, then one read of the next sector to push the same sector
/// out of the drive cache, a settle pause, and a fresh series of reads. After
/// `max_retries` resets the next failure abandons the sector.
pub fn regenerate_sector(
    ctx: &ScanContext<'_>,
    policy: &RepairPolicy,
    sector: u64,
    end: u64,
    summary: &mut ModeSummary,
) -> SectorResult<SectorFate> {
    let settings = ctx.settings;
    let settle = Duration::from_millis(settings.regenerator_settle_ms);
    let mut reads_done = 0u32;
    let mut resets = 0u32;
    let mut last_latency = None;

    while reads_done < settings.regenerator_reads {
        match ctx.device.read_sector(sector) {
            Ok(read) if read.within(settings.max_repair_latency) => {
                reads_done += 1;
                last_latency = Some(read.latency);
                continue;
            }
            Ok(read) => tracing::info!(
                sector,
                read = reads_done + 1,
                latency_ms = read.latency_ms(),
                limit_ms = settings.max_repair_latency,
                "Endurance read too slow, repairing"
            ),
            Err(e) => tracing::info!(
                sector,
                read = reads_done + 1,
                error = %e,
                "Endurance read failed, repairing"
            ),
        }

        let outcome = policy.repair(ctx.device, sector);
        last_latency = outcome.latency.or(last_latency);
        ctx.record(
            summary,
            repair_entry(sector, &outcome, policy),
            outcome.class,
            outcome.latency,
        )?;

        if sector + 1 < end {
            if let Err(e) = ctx.device.read_sector(sector + 1) {
                tracing::debug!(sector = sector + 1, error = %e, "Neighbour read failed");
            }
        }
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }

        if resets < settings.max_retries {
            resets += 1;
            reads_done = 0;
            tracing::debug!(sector, resets, max_retries = settings.max_retries, "Restarting endurance reads");
        } else {
            tracing::warn!(sector, resets, "Sector abandoned");
            let entry = LogEntry {
                sector,
                status: SectorStatus::Abandoned,
                attempts: settings.max_retries,
                writes: policy.writes_per_attempt(),
                reads: policy.params().reads_per_round,
                max_attempts: policy.params().max_attempts,
                note: Note::Failed,
            };
            ctx.record(summary, entry, RepairClass::Abandoned, last_latency)?;
            return Ok(SectorFate::Abandoned);
        }
    }

    let (fate, status, class) = if resets == 0 {
        (SectorFate::Clean, SectorStatus::Good, RepairClass::Read)
    } else {
        (
            SectorFate::Unstable { resets },
            SectorStatus::Unstable,
            RepairClass::Rewrite,
        )
    };
    let entry = LogEntry {
        sector,
        status,
        attempts: resets,
        writes: policy.writes_per_attempt(),
        reads: policy.params().reads_per_round,
        max_attempts: policy.params().max_attempts,
        note: Note::Ok,
    };
    ctx.record(summary, entry, class, last_latency)?;
    Ok(fate)
}
