use super::{repair_entry, ModeSummary, ScanContext};
use crate::repair::{RepairOutcome, RepairPolicy};
use crate::SectorResult;

/// Read each sector once; rewrite only those that fail or read slowly
pub fn run(ctx: &ScanContext<'_>, summary: &mut ModeSummary) -> SectorResult<()> {
    let settings = ctx.settings;
    let policy = RepairPolicy::new(settings.repair_params());
    let range = settings.effective_range();
    ctx.progress.set_total(range.end.saturating_sub(range.start));

    for sector in range {
        if ctx.interrupted(summary, sector) {
            break;
        }
        ctx.progress.sector_started(sector);

        let outcome = match ctx.device.read_sector(sector) {
            Ok(read) => match read.check_latency(sector, settings.max_latency) {
                Ok(()) => RepairOutcome::read_ok(read.latency),
                Err(e) => {
                    tracing::info!(sector, error = %e, "Slow sector, repairing");
                    policy.repair(ctx.device, sector)
                }
            },
            Err(e) => {
                tracing::info!(sector, error = %e, "Unreadable sector, repairing");
                policy.repair(ctx.device, sector)
            }
        };

        let entry = repair_entry(sector, &outcome, &policy);
        ctx.record(summary, entry, outcome.class, outcome.latency)?;
        summary.sectors += 1;
        ctx.progress.advance();
    }

    Ok(())
}
