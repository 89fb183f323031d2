//! Console progress output.

use std::time::Duration;

use cfwupdate::engine::{StepStatus, UpdateReport};
use cfwupdate::events::{EventSink, UpdateEvent, UpdateStage};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(120);

/// Event sink that drives a progress bar and prints each milestone.
pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    /// Create a sink drawing to the terminal.
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    /// Create a sink that draws nothing.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(spinner_style());
        Self { bar }
    }

    /// Stop the progress display.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn line(&self, text: String) {
        self.bar.println(text);
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &UpdateEvent) {
        match event {
            UpdateEvent::StageStarted { stage } => match stage {
                UpdateStage::Complete => self.finish(),
                UpdateStage::Downloading => {}
                // Partition prompts may follow; keep the terminal still.
                UpdateStage::ResolvingVolumes => {
                    self.line(format!("{} Looking for the device volumes", style("•").cyan()));
                }
                _ => {
                    self.bar.set_style(spinner_style());
                    self.bar.enable_steady_tick(TICK);
                    self.bar.set_message(format!("{}...", stage.name()));
                }
            },
            UpdateEvent::VolumesResolved { boot, runtime } => {
                self.line(format!(
                    "{} Boot volume:    {}",
                    style("•").cyan(),
                    boot.display()
                ));
                self.line(format!(
                    "{} Runtime volume: {}",
                    style("•").cyan(),
                    runtime.display()
                ));
            }
            UpdateEvent::PartStarted { name, index, total } => {
                self.bar.set_style(bar_style());
                self.bar.set_length(*total as u64);
                self.bar.set_position(index.saturating_sub(1) as u64);
                self.bar.set_message(name.clone());
            }
            UpdateEvent::PartDownloaded { name, bytes, .. } => {
                self.bar.inc(1);
                self.line(format!(
                    "{} Downloaded {} ({})",
                    style("✓").green(),
                    name,
                    format_bytes(*bytes)
                ));
            }
            UpdateEvent::Extracted { files, .. } => {
                self.line(format!("{} Extracted {} files", style("✓").green(), files));
            }
            UpdateEvent::TreeApplied {
                subtree,
                dest,
                files,
            } => {
                self.line(format!(
                    "{} Copied {} files from {} onto {}",
                    style("✓").green(),
                    files,
                    subtree,
                    dest.display()
                ));
            }
            UpdateEvent::BackupCreated { path } => {
                self.line(format!("{} Backed up to {}", style("•").cyan(), path.display()));
            }
            UpdateEvent::StepApplied { step, detail } => {
                self.line(format!("{} {}: {}", style("✓").green(), step, detail));
            }
            UpdateEvent::StepSkipped { step, reason } => {
                self.line(format!("{} {}: {}", style("-").yellow(), step, reason));
            }
            UpdateEvent::StepFailed { step, error } => {
                self.line(format!("{} {}: {}", style("✗").red(), step, error));
            }
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} Downloading [{bar:30.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ")
}

/// Print the end-of-run summary.
pub fn print_summary(report: &UpdateReport) {
    println!();
    println!("{}", style("Update complete").bold());
    println!("  Boot volume:       {}", report.boot_volume.display());
    println!("  Runtime volume:    {}", report.runtime_volume.display());
    println!("  Archive parts:     {}", report.parts);
    println!("  Files extracted:   {}", report.files_extracted);
    println!("  Copied to boot:    {}", report.boot_files_copied);
    println!("  Copied to runtime: {}", report.runtime_files_copied);
    println!();

    for outcome in &report.steps {
        let label = match &outcome.status {
            StepStatus::Applied(_) => style(outcome.status.label()).green(),
            StepStatus::Skipped(_) => style(outcome.status.label()).yellow(),
            StepStatus::Failed(_) => style(outcome.status.label()).red(),
            StepStatus::NotConfigured => style(outcome.status.label()).dim(),
        };
        match &outcome.status {
            StepStatus::NotConfigured => println!("  {:<18} {}", outcome.step.name(), label),
            StepStatus::Applied(detail)
            | StepStatus::Skipped(detail)
            | StepStatus::Failed(detail) => {
                println!("  {:<18} {} ({})", outcome.step.name(), label, detail)
            }
        }
    }
}

/// Format a byte count for display.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
