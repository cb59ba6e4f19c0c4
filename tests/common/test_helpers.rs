/// Common test helper functions
use hddray::recovery_log::{LogEntry, RecoveryLog};
use hddray::{Mode, ModeSummary, ScanContext, SectorDevice, Settings};
use std::path::PathBuf;
use tempfile::TempDir;

/// Settings for a small range with no pauses
pub fn quick_settings(min_sector: u64, max_sector: u64) -> Settings {
    let mut settings = Settings::default().with_range(Some(min_sector), Some(max_sector));
    settings.regenerator_settle_ms = 0;
    settings.auto_start_delay_secs = 0;
    settings.handle_retry_delay_ms = 0;
    settings
}

/// Fresh recovery log (header only) in its own temp dir
pub fn temp_log() -> (TempDir, RecoveryLog) {
    let dir = TempDir::new().expect("temp dir");
    let log = RecoveryLog::open_for_append(dir.path().join("list of recovered sectors.txt"))
        .expect("open log");
    (dir, log)
}

/// Log file pre-filled with raw text, then opened for append
pub fn log_with(text: &str) -> (TempDir, RecoveryLog) {
    let dir = TempDir::new().expect("temp dir");
    let path: PathBuf = dir.path().join("sectors.txt");
    std::fs::write(&path, text).expect("write log");
    let log = RecoveryLog::open_for_append(path).expect("open log");
    (dir, log)
}

pub fn run(
    mode: Mode,
    settings: &Settings,
    device: &dyn SectorDevice,
    log: &RecoveryLog,
) -> ModeSummary {
    let ctx = ScanContext::new(settings, device, log);
    mode.run(&ctx).expect("mode run")
}

pub fn entries(log: &RecoveryLog) -> Vec<LogEntry> {
    log.read_entries().expect("read log")
}

/// Raw lines of the log file, header included
pub fn lines(log: &RecoveryLog) -> Vec<String> {
    std::fs::read_to_string(log.path())
        .expect("read log file")
        .lines()
        .map(str::to_string)
        .collect()
}
