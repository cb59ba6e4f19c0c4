// Recovery log files written by older and current releases

mod common;

use common::test_helpers::{lines, log_with, quick_settings, run, temp_log};
use hddray::recovery_log::{LogEntry, Note, LOG_HEADER};
use hddray::{Mode, RecoveryLog, SectorError, SectorStatus, SimulatedDevice};

const MIXED_LOG: &str = "\
Sector | Status | Attempts | Writes | Reads | Max Attempts | Notes
Legend: + good, - bad, ! unstable, F abandoned
100 | - | 8 | 8 | - | - | F | *
101 | + | 1 | 8 | 4.20 | 0.31 | RW | *
102 | - | 3 | 6 | 5 | 3 | .
not a record at all
103 | ! | 2 | 16 | 1 | 4 | *
";

#[test]
fn test_mixed_log_parses_records_only() {
    let (_dir, log) = log_with(MIXED_LOG);
    let entries = log.read_entries().unwrap();

    let sectors: Vec<u64> = entries.iter().map(|e| e.sector).collect();
    assert_eq!(sectors, vec![100, 101, 102, 103]);
    assert_eq!(entries[0].attempts, 8);
    assert_eq!(entries[1].status, SectorStatus::Good);
}

#[test]
fn test_workout_over_mixed_log() {
    let dev = SimulatedDevice::new(256);
    let (_dir, log) = log_with(MIXED_LOG);
    let summary = run(
        Mode::Workout {
            retest_unstable: true,
        },
        &quick_settings(0, 0),
        &dev,
        &log,
    );

    assert_eq!(summary.sectors, 3);
    assert_eq!(dev.writes(100), 6);
    assert_eq!(dev.writes(101), 0);
    assert_eq!(dev.writes(102), 6);
    assert_eq!(dev.writes(103), 6);

    let latest = log.latest_by_sector().unwrap();
    for sector in [100, 102, 103] {
        assert_eq!(latest[&sector].status, SectorStatus::Good);
    }
}

#[test]
fn test_append_preserves_existing_lines() {
    let (_dir, log) = log_with(MIXED_LOG);
    log.append(&LogEntry {
        sector: 104,
        status: SectorStatus::Abandoned,
        attempts: 8,
        writes: 16,
        reads: 1,
        max_attempts: 4,
        note: Note::Failed,
    })
    .unwrap();

    let lines = lines(&log);
    assert_eq!(lines.len(), MIXED_LOG.lines().count() + 1);
    assert_eq!(lines[0], LOG_HEADER);
    assert_eq!(lines.last().unwrap(), "104 | F | 8 | 16 | 1 | 4 | .");
}

#[test]
fn test_summary_of_runs() {
    let dev = SimulatedDevice::new(16).with_fault(3, hddray::io::Fault::Unreadable);
    let (_dir, log) = temp_log();
    let settings = quick_settings(0, 6);
    run(Mode::Recovery, &settings, &dev, &log);
    run(Mode::Recovery, &settings, &dev, &log);

    let summary = log.summary().unwrap();
    assert_eq!(summary.total_entries, 12);
    assert_eq!(summary.distinct_sectors, 6);
    assert_eq!(summary.count(SectorStatus::Good), 5);
    assert_eq!(summary.unrecovered, vec![3]);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["distinct_sectors"], 6);
}

#[test]
fn test_unwritable_log_location_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "").unwrap();

    let result = RecoveryLog::open_for_append(blocker.join("log.txt"));
    assert!(matches!(result, Err(SectorError::RecoveryLog(_))));
}
