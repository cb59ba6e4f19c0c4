use super::{RepairClass, RepairOutcome, RepairParams};
use crate::config::VerifyTarget;
use crate::io::{latency_ms, SectorDevice};
use crate::pattern::Pattern;
use crate::verification::verify;
use std::time::Instant;

/// Rewrite-and-verify loop for a single sector.
///
/// Each attempt writes every pattern `writes_per_pattern` times in order,
/// then runs up to `reads_per_round` verification reads. The first read that
/// matches within the latency ceiling succeeds the attempt; the first read
/// that completes above the ceiling ends the whole repair as failed. An
/// attempt whose reads neither pass nor breach moves on to the next attempt.
#[derive(Debug, Clone)]
pub struct RepairPolicy {
    params: RepairParams,
    patterns: Vec<Pattern>,
}

enum RoundResult {
    Passed,
    LatencyBreach,
    Inconclusive,
}

impl RepairPolicy {
    /// Policy using the standard 0x55 then 0xAA pair
    pub fn new(params: RepairParams) -> Self {
        Self::with_patterns(params, Pattern::standard_pair().to_vec())
    }

    pub fn with_patterns(params: RepairParams, patterns: Vec<Pattern>) -> Self {
        Self { params, patterns }
    }

    pub fn params(&self) -> &RepairParams {
        &self.params
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Writes per attempt, as recorded in the recovery log
    pub fn writes_per_attempt(&self) -> u32 {
        self.params.writes_per_attempt(self.patterns.len())
    }

    pub fn repair(&self, device: &dyn SectorDevice, sector: u64) -> RepairOutcome {
        let start = Instant::now();
        let mut last_latency = None;
        let mut write_failures = 0u32;

        for attempt in 1..=self.params.max_attempts {
            let mut last_attempted: Option<&Pattern> = None;
            let mut last_written: Option<&Pattern> = None;

            for pattern in &self.patterns {
                last_attempted = Some(pattern);
                let buf = pattern.tile();
                for _ in 0..self.params.writes_per_pattern {
                    match device.write_sector(sector, &buf) {
                        Ok(()) => last_written = Some(pattern),
                        Err(e) => {
                            write_failures += 1;
                            tracing::debug!(sector, attempt, pattern = %pattern, error = %e, "Pattern write failed");
                        }
                    }
                }
            }

            let Some(target) = self.verification_target(sector, last_attempted, last_written)
            else {
                continue;
            };

            match self.verify_round(device, sector, target, &mut last_latency) {
                RoundResult::Passed => {
                    let outcome = self.finish(true, attempt, last_latency, start, write_failures);
                    tracing::info!(
                        sector,
                        attempts = attempt,
                        latency_ms = outcome.latency_ms(),
                        elapsed_ms = outcome.elapsed.as_millis() as u64,
                        "Sector repaired"
                    );
                    return outcome;
                }
                RoundResult::LatencyBreach => {
                    tracing::warn!(
                        sector,
                        attempts = attempt,
                        latency_ms = last_latency.map(latency_ms),
                        limit_ms = self.params.max_latency_ms,
                        "Latency ceiling exceeded during verification"
                    );
                    return self.finish(false, attempt, last_latency, start, write_failures);
                }
                RoundResult::Inconclusive => {
                    tracing::debug!(sector, attempt, "Verification round inconclusive");
                }
            }
        }

        tracing::warn!(
            sector,
            attempts = self.params.max_attempts,
            write_failures,
            "Sector not recovered"
        );
        self.finish(
            false,
            self.params.max_attempts,
            last_latency,
            start,
            write_failures,
        )
    }

    fn verification_target<'p>(
        &self,
        sector: u64,
        last_attempted: Option<&'p Pattern>,
        last_written: Option<&'p Pattern>,
    ) -> Option<&'p Pattern> {
        match self.params.verify_target {
            VerifyTarget::Attempted => last_attempted,
            VerifyTarget::Written => {
                if last_written != last_attempted {
                    tracing::warn!(
                        sector,
                        attempted = ?last_attempted.map(ToString::to_string),
                        written = ?last_written.map(ToString::to_string),
                        "Last written pattern differs from last attempted"
                    );
                }
                last_written.or(last_attempted)
            }
        }
    }

    fn verify_round(
        &self,
        device: &dyn SectorDevice,
        sector: u64,
        target: &Pattern,
        last_latency: &mut Option<std::time::Duration>,
    ) -> RoundResult {
        for _ in 0..self.params.reads_per_round {
            let outcome = verify(device, sector, target);
            if outcome.latency.is_some() {
                *last_latency = outcome.latency;
            }
            if outcome.is_good(self.params.max_latency_ms) {
                return RoundResult::Passed;
            }
            if outcome.exceeds(self.params.max_latency_ms) {
                return RoundResult::LatencyBreach;
            }
        }
        RoundResult::Inconclusive
    }

    fn finish(
        &self,
        success: bool,
        attempts: u32,
        latency: Option<std::time::Duration>,
        start: Instant,
        write_failures: u32,
    ) -> RepairOutcome {
        RepairOutcome {
            success,
            attempts,
            latency,
            elapsed: start.elapsed(),
            class: if success {
                RepairClass::Rewrite
            } else {
                RepairClass::Unrecovered
            },
            write_failures,
        }
    }
}
