use super::{ModeSummary, ScanContext};
use crate::config::VerifyTarget;
use crate::io::SectorDevice;
use crate::pattern::Pattern;
use crate::recovery_log::{LogEntry, Note, SectorStatus};
use crate::repair::{RepairClass, RepairParams};
use crate::verification::verify;
use crate::SectorResult;
use std::time::Duration;

/// Result of the write/verify rounds on one sector
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub success: bool,
    /// Rounds that failed before the passing one, or the whole budget
    pub failed_rounds: u32,
    pub latency: Option<Duration>,
}

/// Surface scan ("f1"): overwrite every sector in range with both patterns
/// and require a full round of clean reads.
pub fn run(ctx: &ScanContext<'_>, summary: &mut ModeSummary) -> SectorResult<()> {
    let params = ctx.settings.surface_scan_params();
    let patterns = Pattern::standard_pair();
    let range = ctx.settings.effective_range();
    ctx.progress.set_total(range.end.saturating_sub(range.start));

    for sector in range {
        if ctx.interrupted(summary, sector) {
            break;
        }
        ctx.progress.sector_started(sector);

        let outcome = scan_sector(ctx.device, sector, &patterns, &params);
        let entry = LogEntry {
            sector,
            status: if outcome.success {
                SectorStatus::Good
            } else {
                SectorStatus::Bad
            },
            attempts: outcome.failed_rounds,
            writes: params.writes_per_attempt(patterns.len()),
            reads: params.reads_per_round,
            max_attempts: params.max_attempts,
            note: Note::for_success(outcome.success),
        };
        let class = if outcome.success {
            RepairClass::Rewrite
        } else {
            RepairClass::Unrecovered
        };
        ctx.record(summary, entry, class, outcome.latency)?;
        summary.sectors += 1;
        ctx.progress.advance();
    }

    Ok(())
}

/// Up to `max_attempts` rounds, each writing every pattern
/// `writes_per_pattern` times and then reading `reads_per_round` times.
/// A round passes only if every read matches within the latency ceiling.
pub fn scan_sector(
    device: &dyn SectorDevice,
    sector: u64,
    patterns: &[Pattern],
    params: &RepairParams,
) -> ScanOutcome {
    let mut latency = None;

    for round in 1..=params.max_attempts {
        let mut last_attempted = None;
        let mut last_written = None;
        for pattern in patterns {
            last_attempted = Some(pattern);
            let buf = pattern.tile();
            for _ in 0..params.writes_per_pattern {
                match device.write_sector(sector, &buf) {
                    Ok(()) => last_written = Some(pattern),
                    Err(e) => tracing::debug!(sector, round, error = %e, "Pattern write failed"),
                }
            }
        }

        let target = match params.verify_target {
            VerifyTarget::Attempted => last_attempted,
            VerifyTarget::Written => last_written.or(last_attempted),
        };
        let Some(target) = target else {
            continue;
        };

        let mut passed = true;
        for _ in 0..params.reads_per_round {
            let v = verify(device, sector, target);
            if v.latency.is_some() {
                latency = v.latency;
            }
            if !v.is_good(params.max_latency_ms) {
                passed = false;
                break;
            }
        }

        if passed {
            return ScanOutcome {
                success: true,
                failed_rounds: round - 1,
                latency,
            };
        }
        tracing::debug!(sector, round, "Surface scan round failed");
    }

    tracing::warn!(sector, rounds = params.max_attempts, "Surface scan failed");
    ScanOutcome {
        success: false,
        failed_rounds: params.max_attempts,
        latency,
    }
}
