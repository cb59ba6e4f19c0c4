// Line-oriented operator prompts
//
// Generic over the reader/writer so the binary can pass stdin/stdout and
// tests can pass byte buffers.

use crate::config::Mode;
use crate::{SectorError, SectorResult};
use console::style;
use std::io::{BufRead, Write};
use std::path::Path;

fn read_answer<R: BufRead>(input: &mut R) -> SectorResult<String> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| SectorError::InvalidSelection(format!("failed to read input: {}", e)))?;
    if read == 0 {
        return Err(SectorError::InvalidSelection("no input".to_string()));
    }
    Ok(line.trim().to_string())
}

fn io_err(e: std::io::Error) -> SectorError {
    SectorError::InvalidSelection(format!("failed to write prompt: {}", e))
}

/// Numbered mode menu; anything but 1-4 is rejected
pub fn choose_mode<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> SectorResult<Mode> {
    writeln!(output, "Select mode:").map_err(io_err)?;
    for mode in Mode::all() {
        writeln!(output, "{}. {}", mode.number(), mode).map_err(io_err)?;
    }
    write!(output, "Enter your choice: ").map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let answer = read_answer(input)?;
    let number = answer
        .parse::<u32>()
        .map_err(|_| SectorError::InvalidSelection(format!("mode '{}'", answer)))?;
    Mode::from_number(number)
}

/// Numbered device picker, returns the 0-based index
pub fn choose_device<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    labels: &[String],
) -> SectorResult<usize> {
    if labels.is_empty() {
        return Err(SectorError::InvalidSelection("no block devices found".to_string()));
    }

    writeln!(output, "Available drives:").map_err(io_err)?;
    for (i, label) in labels.iter().enumerate() {
        writeln!(output, "{}. {}", i + 1, label).map_err(io_err)?;
    }
    write!(output, "Select a drive by number: ").map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let answer = read_answer(input)?;
    match answer.parse::<usize>() {
        Ok(n) if (1..=labels.len()).contains(&n) => Ok(n - 1),
        _ => Err(SectorError::InvalidSelection(format!(
            "drive '{}' (expected 1-{})",
            answer,
            labels.len()
        ))),
    }
}

/// y/n question; only an explicit "y" or "yes" counts as yes
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> SectorResult<bool> {
    write!(output, "{} (y/n): ", question).map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let answer = read_answer(input)?.to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Warning shown before an unattended destructive run
pub fn attention_banner(device: &Path, mode: Mode, delay_secs: u64) -> String {
    format!(
        "{}\n  Device: {}\n  Mode:   {}\n  Sectors in range will be overwritten with test patterns.\n  Starting in {} seconds, press Ctrl+C to abort.",
        style("Attention! Automatic mode is enabled.").red().bold(),
        device.display(),
        mode,
        delay_secs
    )
}
