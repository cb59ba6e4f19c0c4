use super::{repair_entry, ModeSummary, ScanContext};
use crate::repair::RepairPolicy;
use crate::SectorResult;

/// Re-run the repair policy on sectors the log still lists as unrecovered,
/// and on unstable ones when `retest_unstable` is set.
///
/// Targets come from the reconciled log (last entry per sector), read once
/// before any new line is appended, so each target is repaired once per run.
/// The configured sector range plays no part here.
pub fn run(
    ctx: &ScanContext<'_>,
    retest_unstable: bool,
    summary: &mut ModeSummary,
) -> SectorResult<()> {
    let targets = ctx.log.workout_targets(retest_unstable)?;
    if targets.is_empty() {
        ctx.progress.note("No sectors in the recovery log need a workout");
        tracing::info!(log = %ctx.log.path().display(), "Nothing to work out");
        return Ok(());
    }

    tracing::info!(count = targets.len(), retest_unstable, "Workout targets selected");
    let policy = RepairPolicy::new(ctx.settings.repair_params());
    ctx.progress.set_total(targets.len() as u64);

    for sector in targets {
        if ctx.interrupted(summary, sector) {
            break;
        }
        ctx.progress.sector_started(sector);

        let outcome = policy.repair(ctx.device, sector);
        ctx.record(
            summary,
            repair_entry(sector, &outcome, &policy),
            outcome.class,
            outcome.latency,
        )?;
        summary.sectors += 1;
        ctx.progress.advance();
    }

    Ok(())
}
