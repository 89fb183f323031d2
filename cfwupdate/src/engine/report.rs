//! Outcome of an update run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Optional steps run after the firmware is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStep {
    /// Merge into `retroarch.cfg`.
    RetroarchConfig,
    /// Merge into the skin `settings.json`.
    SkinSettings,
    /// Merge-copy the system icon directory.
    SystemIcons,
    /// Replace the boot logo.
    BootLogo,
}

impl OverrideStep {
    /// All steps in execution order.
    pub const ALL: [OverrideStep; 4] = [
        Self::RetroarchConfig,
        Self::SkinSettings,
        Self::SystemIcons,
        Self::BootLogo,
    ];

    /// Get a human-readable name for the step.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RetroarchConfig => "retroarch config",
            Self::SkinSettings => "skin settings",
            Self::SystemIcons => "system icons",
            Self::BootLogo => "boot logo",
        }
    }
}

impl fmt::Display for OverrideStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to one override step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepStatus {
    /// No source configured for the step.
    NotConfigured,
    /// The step ran.
    Applied(String),
    /// The step's target was missing on the device.
    Skipped(String),
    /// The step failed; later steps still ran.
    Failed(String),
}

impl StepStatus {
    /// Short label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not configured",
            Self::Applied(_) => "applied",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}

/// Outcome of one override step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Which step.
    pub step: OverrideStep,
    /// What happened.
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Resolved boot volume.
    pub boot_volume: PathBuf,
    /// Resolved runtime volume.
    pub runtime_volume: PathBuf,
    /// Number of archive parts assembled.
    pub parts: usize,
    /// Files present in the staging directory after extraction.
    pub files_extracted: usize,
    /// Files copied onto the boot volume.
    pub boot_files_copied: usize,
    /// Files copied onto the runtime volume.
    pub runtime_files_copied: usize,
    /// One entry per override step, in execution order.
    pub steps: Vec<StepOutcome>,
}

impl UpdateReport {
    /// Record the outcome of a step.
    pub fn record(&mut self, step: OverrideStep, status: StepStatus) {
        self.steps.push(StepOutcome { step, status });
    }

    /// Status recorded for `step`.
    pub fn status(&self, step: OverrideStep) -> Option<&StepStatus> {
        self.steps.iter().find(|o| o.step == step).map(|o| &o.status)
    }

    /// Whether any override step failed.
    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|o| matches!(o.status, StepStatus::Failed(_)))
    }
}
