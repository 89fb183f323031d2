//! Progress events emitted while an update runs.
//!
//! The engine reports through an `EventSink` instead of printing. The CLI
//! renders events on the terminal; `TracingSink` logs them and
//! `RecordingSink` keeps them for inspection in tests.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::engine::OverrideStep;

/// Update stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// Locating the boot and runtime volumes.
    ResolvingVolumes,
    /// Downloading archive parts.
    Downloading,
    /// Extracting the assembled archive.
    Extracting,
    /// Copying archive subtrees onto the volumes.
    Installing,
    /// Applying user overrides.
    ApplyingOverrides,
    /// Update complete.
    Complete,
}

impl UpdateStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResolvingVolumes => "Resolving volumes",
            Self::Downloading => "Downloading",
            Self::Extracting => "Extracting",
            Self::Installing => "Installing",
            Self::ApplyingOverrides => "Applying overrides",
            Self::Complete => "Complete",
        }
    }
}

/// Something that happened during an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// A stage began.
    StageStarted { stage: UpdateStage },
    /// Both volumes are known.
    VolumesResolved { boot: PathBuf, runtime: PathBuf },
    /// A part download began (`index` is 1-based).
    PartStarted {
        name: String,
        index: usize,
        total: usize,
    },
    /// A part finished downloading.
    PartDownloaded {
        name: String,
        path: PathBuf,
        bytes: u64,
    },
    /// The archive was extracted.
    Extracted { dest: PathBuf, files: usize },
    /// An archive subtree was merged onto a volume.
    TreeApplied {
        subtree: String,
        dest: PathBuf,
        files: usize,
    },
    /// A backup copy was written.
    BackupCreated { path: PathBuf },
    /// An override step completed.
    StepApplied { step: OverrideStep, detail: String },
    /// An override step was skipped.
    StepSkipped { step: OverrideStep, reason: String },
    /// An override step failed; the run continues.
    StepFailed { step: OverrideStep, error: String },
}

/// Receiver of update events.
pub trait EventSink {
    /// Handle one event.
    fn emit(&self, event: &UpdateEvent);
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &UpdateEvent) {
        match event {
            UpdateEvent::StageStarted { stage } => {
                tracing::info!(stage = stage.name(), "Stage started")
            }
            UpdateEvent::VolumesResolved { boot, runtime } => tracing::info!(
                boot = %boot.display(),
                runtime = %runtime.display(),
                "Volumes resolved"
            ),
            UpdateEvent::PartStarted { name, index, total } => {
                tracing::info!(%name, index, total, "Downloading part")
            }
            UpdateEvent::PartDownloaded { name, bytes, .. } => {
                tracing::info!(%name, bytes, "Downloaded part")
            }
            UpdateEvent::Extracted { dest, files } => {
                tracing::info!(dest = %dest.display(), files, "Archive extracted")
            }
            UpdateEvent::TreeApplied {
                subtree,
                dest,
                files,
            } => tracing::info!(%subtree, dest = %dest.display(), files, "Applied archive subtree"),
            UpdateEvent::BackupCreated { path } => {
                tracing::info!(path = %path.display(), "Created backup")
            }
            UpdateEvent::StepApplied { step, detail } => {
                tracing::info!(step = step.name(), %detail, "Override applied")
            }
            UpdateEvent::StepSkipped { step, reason } => {
                tracing::info!(step = step.name(), %reason, "Override skipped")
            }
            UpdateEvent::StepFailed { step, error } => {
                tracing::warn!(step = step.name(), %error, "Override failed")
            }
        }
    }
}

/// Sink that records events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<UpdateEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<UpdateEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Count recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&UpdateEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &UpdateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards each event to two sinks.
pub struct TeeSink<'a> {
    first: &'a dyn EventSink,
    second: &'a dyn EventSink,
}

impl<'a> TeeSink<'a> {
    /// Create a sink that forwards to `first` then `second`.
    pub fn new(first: &'a dyn EventSink, second: &'a dyn EventSink) -> Self {
        Self { first, second }
    }
}

impl EventSink for TeeSink<'_> {
    fn emit(&self, event: &UpdateEvent) {
        self.first.emit(event);
        self.second.emit(event);
    }
}
