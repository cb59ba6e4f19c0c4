/// Recovery log - append-only record of per-sector outcomes
///
/// One pipe-delimited line per processed sector:
///
/// ```text
/// <sector> | <status> | <attempts> | <writes> | <reads> | <max_attempts> | <note>
/// ```
///
/// The file outlives a run. Reruns append, so a sector can appear many times
/// and the last line for a sector is the one that counts.
use crate::{SectorError, SectorResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const LOG_HEADER: &str = "Sector | Status | Attempts | Writes | Reads | Max Attempts | Notes";

/// Outcome symbol of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectorStatus {
    /// `+` readable within latency
    Good,
    /// `-` not recovered
    Bad,
    /// `!` failed at some point but recovered
    Unstable,
    /// `_` marker left by older releases
    Legacy,
    /// `F` abandoned after exhausting resets
    Abandoned,
}

impl SectorStatus {
    pub fn symbol(&self) -> char {
        match self {
            SectorStatus::Good => '+',
            SectorStatus::Bad => '-',
            SectorStatus::Unstable => '!',
            SectorStatus::Legacy => '_',
            SectorStatus::Abandoned => 'F',
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(SectorStatus::Good),
            "-" => Some(SectorStatus::Bad),
            "!" => Some(SectorStatus::Unstable),
            "_" => Some(SectorStatus::Legacy),
            "F" => Some(SectorStatus::Abandoned),
            _ => None,
        }
    }

    /// Bad or abandoned: Workout still owes this sector a repair
    pub fn is_unrecovered(&self) -> bool {
        matches!(self, SectorStatus::Bad | SectorStatus::Abandoned)
    }

    pub fn all() -> [SectorStatus; 5] {
        [
            SectorStatus::Good,
            SectorStatus::Bad,
            SectorStatus::Unstable,
            SectorStatus::Legacy,
            SectorStatus::Abandoned,
        ]
    }
}

impl fmt::Display for SectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Trailing note column: `*` for a good outcome, `.` otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Note {
    Ok,
    Failed,
}

impl Note {
    pub fn for_success(success: bool) -> Self {
        if success {
            Note::Ok
        } else {
            Note::Failed
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Note::Ok => '*',
            Note::Failed => '.',
        }
    }

    fn parse(field: &str) -> Self {
        if field == "*" {
            Note::Ok
        } else {
            Note::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sector: u64,
    pub status: SectorStatus,
    pub attempts: u32,
    pub writes: u32,
    pub reads: u32,
    pub max_attempts: u32,
    pub note: Note,
}

impl LogEntry {
    /// Serialize to one log line, without the newline
    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {} | {} | {} | {} | {}",
            self.sector,
            self.status.symbol(),
            self.attempts,
            self.writes,
            self.reads,
            self.max_attempts,
            self.note.symbol()
        )
    }

    /// Parse one log line.
    ///
    /// Returns `None` for the header, `Legend` lines, lines without a numeric
    /// sector, and anything else that isn't a record. Eight-column lines from
    /// older releases keep only sector, status, attempts and note.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Legend") {
            return None;
        }

        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        let sector = fields.first()?.parse::<u64>().ok()?;
        let status = SectorStatus::from_symbol(fields.get(1)?)?;

        match fields.len() {
            7 => Some(Self {
                sector,
                status,
                attempts: fields[2].parse().ok()?,
                writes: fields[3].parse().ok()?,
                reads: fields[4].parse().ok()?,
                max_attempts: fields[5].parse().ok()?,
                note: Note::parse(fields[6]),
            }),
            8 => Some(Self {
                sector,
                status,
                attempts: fields[2].parse().unwrap_or(0),
                writes: fields[3].parse().unwrap_or(0),
                reads: 0,
                max_attempts: 0,
                note: Note::parse(fields[7]),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Handle to the recovery log file
#[derive(Debug, Clone)]
pub struct RecoveryLog {
    path: PathBuf,
}

impl RecoveryLog {
    /// Handle for reading an existing log; nothing is created
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Make sure the log can be appended to, writing the header if the file
    /// is new. Failure here stops the run before any sector is touched.
    pub fn open_for_append(path: impl Into<PathBuf>) -> SectorResult<Self> {
        let log = Self { path: path.into() };

        let is_new = fs::metadata(&log.path).map(|m| m.len() == 0).unwrap_or(true);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.path)
            .map_err(|e| log.error("open", e))?;

        if is_new {
            writeln!(file, "{}", LOG_HEADER).map_err(|e| log.error("write header to", e))?;
        }

        tracing::debug!(path = %log.path.display(), created = is_new, "Recovery log ready");
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one record as a single write
    pub fn append(&self, entry: &LogEntry) -> SectorResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error("open", e))?;

        let line = format!("{}\n", entry.to_line());
        file.write_all(line.as_bytes())
            .map_err(|e| self.error("append to", e))?;

        tracing::trace!(sector = entry.sector, status = %entry.status, "Logged sector");
        Ok(())
    }

    /// Every record in file order, skipping non-record lines
    pub fn read_entries(&self) -> SectorResult<Vec<LogEntry>> {
        let file = fs::File::open(&self.path).map_err(|e| self.error("read", e))?;
        let mut entries = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.error("read", e))?;
            match LogEntry::parse_line(&line) {
                Some(entry) => entries.push(entry),
                None => tracing::trace!(line = %line, "Skipping non-record line"),
            }
        }

        Ok(entries)
    }

    /// Current state per sector, last entry wins
    pub fn latest_by_sector(&self) -> SectorResult<BTreeMap<u64, LogEntry>> {
        Ok(reconcile(self.read_entries()?))
    }

    /// Sectors Workout should revisit, ascending: unrecovered ones (bad or
    /// abandoned), plus unstable ones when `retest_unstable` is set
    pub fn workout_targets(&self, retest_unstable: bool) -> SectorResult<Vec<u64>> {
        Ok(self
            .latest_by_sector()?
            .into_values()
            .filter(|e| {
                e.status.is_unrecovered()
                    || (retest_unstable && e.status == SectorStatus::Unstable)
            })
            .map(|e| e.sector)
            .collect())
    }

    pub fn summary(&self) -> SectorResult<LogSummary> {
        let entries = self.read_entries()?;
        let total_entries = entries.len();
        let latest = reconcile(entries);

        let mut counts = BTreeMap::new();
        for status in SectorStatus::all() {
            counts.insert(status, 0usize);
        }
        let mut unrecovered = Vec::new();
        for entry in latest.values() {
            *counts.entry(entry.status).or_insert(0) += 1;
            if entry.status.is_unrecovered() {
                unrecovered.push(entry.sector);
            }
        }

        Ok(LogSummary {
            log_file: self.path.clone(),
            total_entries,
            distinct_sectors: latest.len(),
            counts,
            unrecovered,
        })
    }

    fn error(&self, action: &str, e: std::io::Error) -> SectorError {
        SectorError::RecoveryLog(format!("failed to {} {}: {}", action, self.path.display(), e))
    }
}

/// Collapse entries to one per sector, keeping the last
pub fn reconcile(entries: impl IntoIterator<Item = LogEntry>) -> BTreeMap<u64, LogEntry> {
    let mut latest = BTreeMap::new();
    for entry in entries {
        latest.insert(entry.sector, entry);
    }
    latest
}

/// Reconciled view of a recovery log
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub log_file: PathBuf,
    /// Record lines in the file, duplicates included
    pub total_entries: usize,
    pub distinct_sectors: usize,
    pub counts: BTreeMap<SectorStatus, usize>,
    /// Sectors whose latest status is `-` or `F`
    pub unrecovered: Vec<u64>,
}

impl LogSummary {
    pub fn count(&self, status: SectorStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Format summary as human-readable text
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Recovery log {}\n", self.log_file.display()));
        output.push_str(&format!("{}\n", "=".repeat(60)));
        output.push_str(&format!("Entries: {}\n", self.total_entries));
        output.push_str(&format!("Distinct sectors: {}\n", self.distinct_sectors));
        output.push_str(&format!("  good (+):        {}\n", self.count(SectorStatus::Good)));
        output.push_str(&format!("  unrecovered (-): {}\n", self.count(SectorStatus::Bad)));
        output.push_str(&format!("  unstable (!):    {}\n", self.count(SectorStatus::Unstable)));
        output.push_str(&format!("  legacy (_):      {}\n", self.count(SectorStatus::Legacy)));
        output.push_str(&format!("  abandoned (F):   {}\n", self.count(SectorStatus::Abandoned)));

        if !self.unrecovered.is_empty() {
            output.push_str("\nUnrecovered sectors:\n");
            for (i, sector) in self.unrecovered.iter().enumerate() {
                if i >= 100 {
                    output.push_str(&format!(
                        "  ... and {} more\n",
                        self.unrecovered.len() - 100
                    ));
                    break;
                }
                output.push_str(&format!("  {}\n", sector));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use test_case::test_case;

    fn entry(sector: u64, status: SectorStatus, attempts: u32) -> LogEntry {
        LogEntry {
            sector,
            status,
            attempts,
            writes: 6,
            reads: 5,
            max_attempts: 3,
            note: Note::for_success(status == SectorStatus::Good),
        }
    }

    fn temp_log() -> (TempDir, RecoveryLog) {
        let dir = TempDir::new().unwrap();
        let log = RecoveryLog::open_for_append(dir.path().join("sectors.txt")).unwrap();
        (dir, log)
    }

    #[test]
    fn test_line_format() {
        let e = entry(42, SectorStatus::Bad, 3);
        assert_eq!(e.to_line(), "42 | - | 3 | 6 | 5 | 3 | .");
        assert_eq!(LogEntry::parse_line(&e.to_line()), Some(e));
    }

    #[test_case(LOG_HEADER ; "header")]
    #[test_case("Legend: + good, - bad" ; "legend")]
    #[test_case("Legend | + | 1 | 2 | 3 | 4 | *" ; "legend with columns")]
    #[test_case("" ; "empty")]
    #[test_case("abc | + | 0 | 6 | 5 | 3 | *" ; "non numeric sector")]
    #[test_case("12 | ? | 0 | 6 | 5 | 3 | *" ; "unknown status")]
    #[test_case("12 | + | 0 | 6" ; "too few columns")]
    #[test_case("12 | + | x | 6 | 5 | 3 | *" ; "non numeric attempts")]
    fn test_skipped_lines(line: &str) {
        assert_eq!(LogEntry::parse_line(line), None);
    }

    #[test_case("7|+|0|6|5|3|*", SectorStatus::Good, 0 ; "no padding")]
    #[test_case("  7 | ! | 2 | 16 | 1 | 4 | *  ", SectorStatus::Unstable, 2 ; "extra whitespace")]
    #[test_case("7 | F | 8 | 16 | 1 | 4 | .", SectorStatus::Abandoned, 8 ; "abandoned")]
    #[test_case("7 | _ | 0 | 0 | 0 | 0 | .", SectorStatus::Legacy, 0 ; "legacy marker")]
    fn test_parsed_lines(line: &str, status: SectorStatus, attempts: u32) {
        let e = LogEntry::parse_line(line).unwrap();
        assert_eq!(e.sector, 7);
        assert_eq!(e.status, status);
        assert_eq!(e.attempts, attempts);
    }

    #[test]
    fn test_legacy_eight_column_line() {
        let e = LogEntry::parse_line("900 | - | 8 | 8 | - | - | F | *").unwrap();
        assert_eq!(e.sector, 900);
        assert_eq!(e.status, SectorStatus::Bad);
        assert_eq!(e.attempts, 8);
        assert_eq!(e.reads, 0);
        assert_eq!(e.note, Note::Ok);
    }

    #[test]
    fn test_new_log_gets_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        RecoveryLog::open_for_append(&path).unwrap();
        let log = RecoveryLog::open_for_append(&path).unwrap();
        log.append(&entry(1, SectorStatus::Good, 0)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![LOG_HEADER, "1 | + | 0 | 6 | 5 | 3 | *"]);
    }

    #[test]
    fn test_existing_log_is_appended_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "5 | - | 3 | 6 | 5 | 3 | .\n").unwrap();

        let log = RecoveryLog::open_for_append(&path).unwrap();
        log.append(&entry(5, SectorStatus::Good, 2)).unwrap();

        let entries = log.read_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, SectorStatus::Bad);
        assert_eq!(entries[1].status, SectorStatus::Good);
    }

    #[test]
    fn test_open_fails_in_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = RecoveryLog::open_for_append(dir.path().join("no/such/dir/log.txt"));
        assert!(matches!(result, Err(SectorError::RecoveryLog(_))));
    }

    #[test]
    fn test_last_entry_wins() {
        let (_dir, log) = temp_log();
        log.append(&entry(10, SectorStatus::Bad, 3)).unwrap();
        log.append(&entry(11, SectorStatus::Bad, 3)).unwrap();
        log.append(&entry(10, SectorStatus::Good, 1)).unwrap();

        let latest = log.latest_by_sector().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[&10].status, SectorStatus::Good);
        assert_eq!(latest[&11].status, SectorStatus::Bad);
        assert_eq!(log.workout_targets(false).unwrap(), vec![11]);
    }

    #[test]
    fn test_workout_targets_include_abandoned_and_unstable_opt_in() {
        let (_dir, log) = temp_log();
        log.append(&entry(30, SectorStatus::Unstable, 1)).unwrap();
        log.append(&entry(20, SectorStatus::Bad, 3)).unwrap();
        log.append(&entry(25, SectorStatus::Abandoned, 8)).unwrap();
        log.append(&entry(5, SectorStatus::Good, 0)).unwrap();

        assert_eq!(log.workout_targets(false).unwrap(), vec![20, 25]);
        assert_eq!(log.workout_targets(true).unwrap(), vec![20, 25, 30]);
    }

    #[test]
    fn test_summary_counts_latest_state() {
        let (_dir, log) = temp_log();
        log.append(&entry(1, SectorStatus::Bad, 3)).unwrap();
        log.append(&entry(1, SectorStatus::Good, 1)).unwrap();
        log.append(&entry(2, SectorStatus::Bad, 3)).unwrap();
        log.append(&entry(3, SectorStatus::Abandoned, 8)).unwrap();

        let summary = log.summary().unwrap();
        assert_eq!(summary.total_entries, 4);
        assert_eq!(summary.distinct_sectors, 3);
        assert_eq!(summary.count(SectorStatus::Good), 1);
        assert_eq!(summary.count(SectorStatus::Bad), 1);
        assert_eq!(summary.count(SectorStatus::Unstable), 0);
        assert_eq!(summary.unrecovered, vec![2, 3]);
        assert!(summary.format().contains("Distinct sectors: 3"));
    }

    #[test]
    fn test_read_missing_log_is_error() {
        let dir = TempDir::new().unwrap();
        let log = RecoveryLog::at(dir.path().join("absent.txt"));
        assert!(!log.exists());
        assert!(matches!(log.read_entries(), Err(SectorError::RecoveryLog(_))));
    }
}
