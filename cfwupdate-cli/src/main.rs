//! cfwupdate CLI - Command-line interface
//!
//! Updates the custom firmware on the SD card of a handheld and reapplies
//! personal overrides on top of it.

mod error;
mod progress;
mod prompts;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use cfwupdate::archive::{HttpPartSource, SevenZipDecoder};
use cfwupdate::engine::{
    cleanup_staging, OverrideEngine, UpdateConfig, UpdateContext, UpdateReport,
};
use cfwupdate::events::{EventSink, TeeSink, TracingSink};
use cfwupdate::volume::{AcceptDetected, PartitionResolver};
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use error::CliError;
use progress::{print_summary, ConsoleSink};
use prompts::{confirm_cleanup, ConsoleResolver};

#[derive(Debug, Parser)]
#[command(name = "cfwupdate")]
#[command(
    version,
    about = "Update handheld custom firmware and reapply your overrides",
    long_about = None
)]
pub struct Cli {
    /// Boot partition (the one containing uImage); detected when omitted
    #[arg(short = 'b', long)]
    pub boot_volume: Option<PathBuf>,

    /// Runtime partition (the one containing CFW); detected when omitted
    #[arg(short = 'r', long)]
    pub runtime_volume: Option<PathBuf>,

    /// key = value file merged into retroarch.cfg
    #[arg(short = 'c', long)]
    pub retroarch_overrides: Option<PathBuf>,

    /// JSON file merged into the skin settings.json
    #[arg(short = 's', long)]
    pub skin_overrides: Option<PathBuf>,

    /// Directory of icons copied over the skin system icons
    #[arg(short = 'i', long)]
    pub system_icons: Option<PathBuf>,

    /// Boot logo image (gzip or plain bitmap)
    #[arg(short = 'l', long)]
    pub boot_logo: Option<PathBuf>,

    /// Working directory for downloads and extraction
    #[arg(short = 'w', long)]
    pub work_dir: Option<PathBuf>,

    /// Use archive parts already in this directory instead of downloading
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Release page listing the archive part links
    #[arg(long)]
    pub page_url: Option<String>,

    /// Display name of a part link to download (repeatable)
    #[arg(long)]
    pub link: Vec<String>,

    /// Base name of the archive part files
    #[arg(long)]
    pub archive_name: Option<String>,

    /// Extra directory to scan for the device volumes (repeatable)
    #[arg(long)]
    pub mount_root: Vec<PathBuf>,

    /// Configuration file to read instead of the default config.ini
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Never prompt; accept detected partitions and keep downloaded files
    #[arg(long)]
    pub non_interactive: bool,

    /// Delete downloaded files after a successful update
    #[arg(long, conflicts_with = "keep_files")]
    pub cleanup: bool,

    /// Keep downloaded files without asking
    #[arg(long)]
    pub keep_files: bool,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("Hint: {}", hint);
        }
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let file = settings::load_config_file(cli)?;
    let config = settings::build_update_config(cli, &file);
    tracing::debug!(?config, "Resolved configuration");

    let source = HttpPartSource::new()?;
    let decoder = SevenZipDecoder::new();
    let accept = AcceptDetected;
    let prompt = ConsoleResolver::new();
    let resolver: &dyn PartitionResolver = if cli.non_interactive {
        &accept
    } else {
        &prompt
    };

    let console = ConsoleSink::new();
    let tracing_sink = TracingSink;
    let tee = TeeSink::new(&console, &tracing_sink);
    let events: &dyn EventSink = if cli.verbose > 0 { &tee } else { &console };

    let ctx = UpdateContext::new(&source, &decoder, resolver, events);
    let result = OverrideEngine::new(ctx).run(&config);
    console.finish();
    let report = result?;

    print_summary(&report);
    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }
    if report.has_failures() {
        tracing::warn!("Some overrides could not be applied");
    }

    if should_clean_up(cli, &config)? {
        cleanup_staging(&config)?;
    }

    Ok(())
}

fn should_clean_up(cli: &Cli, config: &UpdateConfig) -> Result<bool, CliError> {
    if cli.cleanup {
        return Ok(true);
    }
    if cli.keep_files || cli.non_interactive || !config.work_dir().exists() {
        return Ok(false);
    }
    confirm_cleanup(config.work_dir())
}

fn write_report(report: &UpdateReport, path: &Path) -> Result<(), CliError> {
    let report_err = |reason: String| CliError::Report {
        path: path.to_path_buf(),
        reason,
    };

    let json = serde_json::to_string_pretty(report).map_err(|e| report_err(e.to_string()))?;
    fs::write(path, json + "\n").map_err(|e| report_err(e.to_string()))?;

    println!("Report written to {}", path.display());
    Ok(())
}
