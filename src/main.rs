use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use hddray::drives::{DriveDetector, DriveInfo};
use hddray::recovery_log::RecoveryLog;
use hddray::ui::{self, ScanProgress};
use hddray::verification::{calibrate_latency, CALIBRATION_SECTORS};
use hddray::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hddray")]
#[command(about = "Sector-level recovery for failing block devices")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (INI, [DEFAULT] section)
    #[arg(long, global = true, env = "HDDRAY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Recovery log file, overrides log_file from settings
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Also write JSON traces to this file
    #[arg(long, global = true)]
    trace_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mode over the configured sector range (DESTRUCTIVE)
    Run {
        /// 1=recovery, 2=workout, 3=f1 surface scan, 4=regenerator
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Device path (e.g., /dev/sdb); skips the drive picker
        #[arg(short, long)]
        device: Option<PathBuf>,

        #[arg(long)]
        min_sector: Option<u64>,

        /// Exclusive upper bound; 0 means the first 128 MiB
        #[arg(long)]
        max_sector: Option<u64>,

        /// Workout: also retest sectors logged as unstable
        #[arg(long)]
        retest_unstable: bool,

        /// Rehearse against an in-memory device instead of hardware
        #[arg(long)]
        simulate: bool,
    },

    /// List candidate block devices
    List,

    /// Measure average read latency over the first sectors of a device
    Calibrate {
        /// Device path (e.g., /dev/sdb)
        #[arg(short, long)]
        device: Option<PathBuf>,
    },

    /// Summarize the recovery log (last entry per sector)
    Summary {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective settings as JSON
    Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = init_tracing(cli.debug, cli.trace_file.as_deref())?;

    setup_signal_handlers()?;

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&settings_path)?;
    if let Some(log) = &cli.log {
        settings = settings.with_log_file(log);
    }

    match cli.command {
        Commands::Run {
            mode,
            device,
            min_sector,
            max_sector,
            retest_unstable,
            simulate,
        } => {
            let mut settings = settings.with_range(min_sector, max_sector);
            if let Some(mode) = mode {
                settings = settings.with_mode(mode.number());
            }
            if let Some(device) = device {
                settings = settings.with_device(device);
            }
            run_mode(settings, mode, retest_unstable, simulate)?;
        }
        Commands::List => list_drives()?,
        Commands::Calibrate { device } => {
            let settings = match device {
                Some(device) => settings.with_device(device),
                None => settings,
            };
            calibrate(&settings)?;
        }
        Commands::Summary { json } => show_summary(&settings, json)?,
        Commands::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

fn init_tracing(debug: bool, trace_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if debug { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match trace_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid trace file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}

fn run_mode(
    settings: Settings,
    mode_flag: Option<Mode>,
    retest_flag: bool,
    simulate: bool,
) -> Result<()> {
    let interactive = !settings.auto_mode;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    // Everything the operator chooses is settled before the first sector is touched
    let mut mode = match mode_flag {
        Some(mode) => mode,
        None if interactive => ui::choose_mode(&mut input, &mut output)?,
        None => Mode::from_number(settings.mode)?,
    };
    let settings = settings.with_mode(mode.number());
    settings.validate()?;

    if let Mode::Workout { .. } = mode {
        let retest_unstable = retest_flag
            || (interactive
                && ui::confirm(
                    &mut input,
                    &mut output,
                    "Do you want to test unstable sectors again?",
                )?);
        mode = Mode::Workout { retest_unstable };
    }

    let log = RecoveryLog::open_for_append(&settings.log_file)?;

    let session = Uuid::new_v4();
    let span = tracing::info_span!("session", id = %session, mode = mode.number());
    let _enter = span.enter();

    let summary = if simulate {
        let device = SimulatedDevice::new(settings.effective_range().end);
        println!("Simulating {} on an in-memory device", mode);
        execute(&settings, mode, &device, &log)?
    } else {
        let path = resolve_device(&settings, interactive, &mut input, &mut output)?;
        if !is_root() {
            tracing::warn!("Not running as root, opening {} will likely fail", path.display());
        }

        if !interactive {
            println!(
                "{}",
                ui::attention_banner(&path, mode, settings.auto_start_delay_secs)
            );
            countdown(settings.auto_start_delay_secs)?;
        }

        let device = RawDevice::from_settings(&path, &settings);
        execute(&settings, mode, &device, &log)?
    };

    println!("\n{}", summary.format());
    println!("Recovery log: {}", log.path().display());

    if summary.interrupted {
        return Err(SectorError::Interrupted.into());
    }
    Ok(())
}

fn execute(
    settings: &Settings,
    mode: Mode,
    device: &dyn SectorDevice,
    log: &RecoveryLog,
) -> Result<ModeSummary> {
    let ctx = ScanContext::new(settings, device, log).with_progress(ScanProgress::new(0));
    Ok(mode.run(&ctx)?)
}

/// Device from the command line or settings, else by number (automatic) or picker
fn resolve_device<R: io::BufRead, W: Write>(
    settings: &Settings,
    interactive: bool,
    input: &mut R,
    output: &mut W,
) -> Result<PathBuf> {
    if let Some(device) = &settings.device {
        return Ok(device.clone());
    }

    let drives = DriveDetector::detect_all_drives()?;
    if interactive {
        let labels: Vec<String> = drives.iter().map(DriveInfo::to_string).collect();
        let index = ui::choose_device(input, output, &labels)?;
        Ok(drives[index].device_path.clone())
    } else {
        DriveDetector::select_by_number(&drives, settings.drive_number).ok_or_else(|| {
            SectorError::InvalidSelection(format!(
                "drive_number {} but {} drive(s) detected",
                settings.drive_number,
                drives.len()
            ))
            .into()
        })
    }
}

/// Pause before destructive work, abortable with Ctrl+C
fn countdown(secs: u64) -> Result<()> {
    for _ in 0..secs {
        if is_interrupted() {
            return Err(SectorError::Interrupted.into());
        }
        std::thread::sleep(Duration::from_secs(1));
    }
    if is_interrupted() {
        return Err(SectorError::Interrupted.into());
    }
    Ok(())
}

fn list_drives() -> Result<()> {
    println!("Detecting drives...");
    let drives = DriveDetector::detect_all_drives()?;

    if drives.is_empty() {
        println!("No drives detected.");
        return Ok(());
    }

    println!("\nDetected drives:");
    for (i, drive) in drives.iter().enumerate() {
        println!("{}. {}", i + 1, drive);
    }
    Ok(())
}

fn calibrate(settings: &Settings) -> Result<()> {
    let path = match &settings.device {
        Some(path) => path.clone(),
        None => {
            let drives = DriveDetector::detect_all_drives()?;
            DriveDetector::select_by_number(&drives, settings.drive_number)
                .ok_or_else(|| anyhow!("No drive number {}", settings.drive_number))?
        }
    };

    let device = RawDevice::from_settings(&path, settings);
    println!(
        "Calibrating {} over sectors {}..{}",
        path.display(),
        CALIBRATION_SECTORS.start,
        CALIBRATION_SECTORS.end
    );

    match calibrate_latency(&device, CALIBRATION_SECTORS) {
        Some(avg) => {
            let avg_ms = hddray::io::latency_ms(avg);
            println!("Average read latency: {:.2} ms", avg_ms);
            if avg > Duration::from_millis(settings.max_latency) {
                println!(
                    "Warning: average exceeds max_latency ({} ms); most sectors would be repaired",
                    settings.max_latency
                );
            }
        }
        None => println!("No calibration read succeeded on {}", path.display()),
    }
    Ok(())
}

fn show_summary(settings: &Settings, json: bool) -> Result<()> {
    let log = RecoveryLog::at(&settings.log_file);
    let summary = log
        .summary()
        .with_context(|| format!("Cannot summarize {}", log.path().display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.format());
    }
    Ok(())
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT {
                if is_interrupted() {
                    eprintln!("\nSecond interrupt, exiting now.");
                    std::process::exit(130);
                }
                eprintln!("\nInterrupt received, stopping after the current sector...");
                set_interrupted();
            }
        }
    });

    Ok(())
}
