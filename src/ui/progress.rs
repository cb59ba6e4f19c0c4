use crate::recovery_log::{LogEntry, SectorStatus};
use crate::repair::RepairClass;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sectors ({eta_precise}) {wide_msg}";

/// Console progress for one scan: a bar plus one printed line per decided sector
#[derive(Clone)]
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    pub fn new(total_sectors: u64) -> Self {
        let bar = ProgressBar::new(total_sectors);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        Self { bar }
    }

    /// No terminal output at all
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn set_total(&self, total_sectors: u64) {
        self.bar.set_length(total_sectors);
    }

    pub fn sector_started(&self, sector: u64) {
        self.bar.set_message(format!("sector {}", sector));
    }

    /// Print the decided outcome of a sector above the bar
    pub fn sector_logged(&self, entry: &LogEntry, class: RepairClass, latency: Option<Duration>) {
        self.bar.println(sector_line(entry, class, latency));
    }

    /// Free-form message above the bar
    pub fn note(&self, message: impl AsRef<str>) {
        self.bar.println(message.as_ref());
    }

    pub fn advance(&self) {
        self.bar.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// One console line for a logged sector
pub fn sector_line(entry: &LogEntry, class: RepairClass, latency: Option<Duration>) -> String {
    let symbol = entry.status.symbol().to_string();
    let symbol = match entry.status {
        SectorStatus::Good => symbol.green(),
        SectorStatus::Bad => symbol.red(),
        SectorStatus::Unstable => symbol.yellow(),
        SectorStatus::Abandoned => symbol.red().bold(),
        SectorStatus::Legacy => symbol.dimmed(),
    };
    let latency = match latency {
        Some(l) => format!("{:.2} ms", crate::io::latency_ms(l)),
        None => "-".to_string(),
    };

    format!(
        "Sector {:>10} {} attempts {}/{} latency {} [{}]",
        entry.sector, symbol, entry.attempts, entry.max_attempts, latency, class
    )
}
