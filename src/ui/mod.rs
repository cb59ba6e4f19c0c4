// Operator-facing console output: scan progress and startup prompts

pub mod progress;
pub mod prompt;

pub use progress::{sector_line, ScanProgress};
pub use prompt::{attention_banner, choose_device, choose_mode, confirm};
