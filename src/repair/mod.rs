// Sector repair: alternate-pattern rewrites followed by verification rounds
//
// - policy.rs: the retry/rewrite/verify loop
// - policy_tests.rs: call-sequence and termination tests

pub mod policy;


pub use policy::RepairPolicy;

use crate::config::VerifyTarget;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Knobs for one repair invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairParams {
    pub max_attempts: u32,
    pub writes_per_pattern: u32,
    pub reads_per_round: u32,
    /// Ceiling a repaired sector's reads must meet
    pub max_latency_ms: u64,
    pub verify_target: VerifyTarget,
}

impl RepairParams {
    /// Writes issued per attempt for `patterns` patterns, as recorded in the log
    pub fn writes_per_attempt(&self, patterns: usize) -> u32 {
        self.writes_per_pattern.saturating_mul(patterns as u32)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }
}

/// How a sector ended up, as tagged in traces and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RepairClass {
    /// Good on a plain read, no rewrite needed
    Read,
    /// Good after rewriting
    Rewrite,
    Unrecovered,
    /// Given up after exhausting resets
    Abandoned,
}

impl RepairClass {
    pub fn tag(&self) -> &'static str {
        match self {
            RepairClass::Read => "R",
            RepairClass::Rewrite => "RW",
            RepairClass::Unrecovered => "-",
            RepairClass::Abandoned => "F",
        }
    }
}

impl fmt::Display for RepairClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub success: bool,
    /// Attempts consumed, never more than `max_attempts`
    pub attempts: u32,
    /// Latency of the last read that completed, if any did
    pub latency: Option<Duration>,
    pub elapsed: Duration,
    pub class: RepairClass,
    pub write_failures: u32,
}

impl RepairOutcome {
    /// Outcome for a sector that read back fine without any rewriting
    pub fn read_ok(latency: Duration) -> Self {
        Self {
            success: true,
            attempts: 0,
            latency: Some(latency),
            elapsed: latency,
            class: RepairClass::Read,
            write_failures: 0,
        }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(crate::io::latency_ms)
    }
}
