//! fieldbackup - Command-line front end for the field backup engine.
//!
//! Runs a backup session from a mounted card onto the SSD, rebuilds the
//! proxy cache, and offers a few inspection commands for checking what the
//! device sees.

mod progress;
mod worker;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use fieldbackup_engine::{
    classify_device_code, find_dcim_mounts, regenerate_proxies, select_source, Config,
    ProxyReport, SessionReport, VerifyMode,
};
use log::warn;

use crate::progress::render_progress;
use crate::worker::{spawn_backup, BackupJob};

/// fieldbackup - Offload camera cards to the trip SSD
#[derive(Parser, Debug)]
#[command(name = "fieldbackup")]
#[command(version)]
#[command(about = "Back up camera cards with verification and build preview proxies")]
struct Cli {
    /// Config override file, merged over the built-in defaults
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy the mounted card into the current trip
    Backup(BackupArgs),

    /// Generate missing proxies for the current trip
    Proxies,

    /// List detected card mounts
    Sources,

    /// Show how a mount would be classified
    Classify {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Write it to this file instead
        #[arg(long, value_name = "PATH")]
        write: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct BackupArgs {
    /// Card mount to copy from (default: the single detected card)
    #[arg(long, value_name = "PATH")]
    src: Option<PathBuf>,

    /// Verification mode: fast or sha256 (default: from config)
    #[arg(long, value_name = "MODE")]
    verify: Option<String>,

    /// Skip proxy generation after the copy
    #[arg(long)]
    no_proxies: bool,
}

/// How a command that ran to the end went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    WithErrors,
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    init_logging(&config, cli.verbose);
    let stop = install_stop_handler();

    let exit_code = match run_cli(&cli, &config, stop) {
        Ok(Outcome::Clean) => 0,
        Ok(Outcome::WithErrors) => 1,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// `RUST_LOG` wins over the config level; `--verbose` raises the default.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// First Ctrl+C asks the session to stop after the current file; the
/// second exits immediately.
fn install_stop_handler() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);

    let installed = ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            eprintln!("\nForce shutdown requested. Exiting immediately...");
            std::process::exit(1);
        }
        eprintln!("\nStopping after the current file... (Press Ctrl+C again to force quit)");
    });
    if let Err(e) = installed {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    stop
}

/// Main CLI logic - separated for testability
fn run_cli(cli: &Cli, config: &Config, stop: Arc<AtomicBool>) -> Result<Outcome, String> {
    match &cli.command {
        Command::Backup(args) => run_backup_command(args, config, stop),
        Command::Proxies => {
            let report =
                regenerate_proxies(config).map_err(|e| format!("Proxy pass failed: {}", e))?;
            print_proxy_summary(&report);
            Ok(Outcome::Clean)
        }
        Command::Sources => {
            let mounts = find_dcim_mounts(&config.paths.source_roots);
            if mounts.is_empty() {
                println!("No media sources found");
            }
            for mount in mounts {
                let code = classify_device_code(&mount);
                println!("{}\t{}\t{}", mount.display(), code, config.device_label(code));
            }
            Ok(Outcome::Clean)
        }
        Command::Classify { path } => {
            if !path.is_dir() {
                return Err(format!("Not a directory: {}", path.display()));
            }
            let code = classify_device_code(path);
            println!("{}\t{}", code, config.device_label(code));
            Ok(Outcome::Clean)
        }
        Command::Config { write } => {
            match write {
                Some(path) => {
                    config.save(path).map_err(|e| e.to_string())?;
                    eprintln!("Wrote {}", path.display());
                }
                None => print!("{}", config.to_toml_string().map_err(|e| e.to_string())?),
            }
            Ok(Outcome::Clean)
        }
    }
}

fn run_backup_command(
    args: &BackupArgs,
    config: &Config,
    stop: Arc<AtomicBool>,
) -> Result<Outcome, String> {
    let mut config = config.clone();
    if let Some(mode) = &args.verify {
        config.verify.mode = VerifyMode::parse(mode).ok_or_else(|| {
            format!("Invalid verify mode '{}'. Must be 'fast' or 'sha256'", mode)
        })?;
    }

    let source = match &args.src {
        Some(src) => src.clone(),
        None => select_source(&config.paths.source_roots).map_err(|e| e.to_string())?,
    };

    eprintln!("Backing up {}", source.display());
    eprintln!("  Trip: {}", config.trip.name);
    eprintln!("  Verify: {}", config.verify.mode);
    eprintln!();

    let start = Instant::now();
    let (handle, updates) = spawn_backup(
        BackupJob {
            config,
            source,
            with_proxies: !args.no_proxies,
        },
        stop,
    );
    render_progress(updates);

    let report = handle
        .join()
        .map_err(|_| "Backup worker panicked".to_string())?
        .map_err(|e| format!("Backup failed: {}", e))?;

    print_session_summary(&report, start.elapsed());

    if report.is_success() {
        Ok(Outcome::Clean)
    } else {
        Ok(Outcome::WithErrors)
    }
}

fn print_session_summary(report: &SessionReport, elapsed: Duration) {
    let copy = &report.copy;

    if copy.cancelled {
        eprintln!("Backup cancelled.");
    } else {
        eprintln!("Backup complete!");
    }
    eprintln!(
        "Summary: {} copied, {} replaced, {} skipped, {} errors",
        copy.copied_files,
        copy.replaced_files,
        copy.skipped_files,
        copy.errors.len()
    );
    eprintln!("Device: {}", copy.device_label);
    eprintln!("Bytes copied: {}", format_bytes(copy.bytes_copied));
    eprintln!("Elapsed: {}", format_duration(elapsed));

    if !copy.errors.is_empty() {
        eprintln!();
        eprintln!("Errors:");
        for msg in copy.error_messages() {
            eprintln!("  {}", msg);
        }
    }

    if let Some(proxies) = &report.proxies {
        eprintln!();
        print_proxy_summary(proxies);
    }
}

fn print_proxy_summary(report: &ProxyReport) {
    eprintln!(
        "Proxies: {} videos, {} thumbnails, {} already cached, {} failed",
        report.videos_generated,
        report.thumbnails_generated,
        report.skipped_existing,
        report.errors.len()
    );
    if report.eviction.removed_files > 0 {
        eprintln!(
            "Cache: evicted {} files, {} now in use",
            report.eviction.removed_files,
            format_bytes(report.eviction.bytes_after)
        );
    }
    for e in &report.errors {
        eprintln!("  {}", e);
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1000.0 && unit_idx < UNITS.len() - 1 {
        size /= 1000.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
