//! Update coordinator.
//!
//! This module orchestrates a full device update:
//! 1. Resolve the boot and runtime volumes
//! 2. Download (or collect) the split firmware archive
//! 3. Extract it into the staging directory
//! 4. Merge-copy the `misc` and `roms` subtrees onto the volumes
//! 5. Apply the configured overrides
//!
//! Steps 1-4 are mandatory and any error ends the run. Nothing is written to
//! either volume before both have been resolved. Override steps are
//! independent: a failure or a missing target is recorded in the report and
//! the next step still runs.

mod options;
mod overrides;
mod report;

pub use options::{
    OverrideSpec, UpdateConfig, DEFAULT_ARCHIVE_NAME, DEFAULT_LINK_NAMES, DEFAULT_PAGE_URL,
};
pub use overrides::{
    apply_boot_logo, apply_retroarch_overrides, apply_skin_overrides, apply_system_icons,
};
pub use report::{OverrideStep, StepOutcome, StepStatus, UpdateReport};

use std::path::{Path, PathBuf};

use crate::archive::{assemble, collect_parts, ArchiveDecoder, PartSource};
use crate::error::{UpdateError, UpdateResult};
use crate::events::{EventSink, UpdateEvent, UpdateStage};
use crate::layout::{DeviceLayout, BOOT_SUBTREE, RUNTIME_SUBTREE};
use crate::tree::{merge_copy, remove_tree};
use crate::volume::{classify, discover_volumes, resolve_role, PartitionResolver, VolumeRole};

/// Collaborators the engine depends on.
pub struct UpdateContext<'a> {
    /// Network access for the archive parts.
    pub source: &'a dyn PartSource,
    /// Archive decoder.
    pub decoder: &'a dyn ArchiveDecoder,
    /// Manual partition answers.
    pub resolver: &'a dyn PartitionResolver,
    /// Progress reporting.
    pub events: &'a dyn EventSink,
}

impl<'a> UpdateContext<'a> {
    /// Create a new context.
    pub fn new(
        source: &'a dyn PartSource,
        decoder: &'a dyn ArchiveDecoder,
        resolver: &'a dyn PartitionResolver,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            source,
            decoder,
            resolver,
            events,
        }
    }
}

/// Runs updates against a device.
pub struct OverrideEngine<'a> {
    ctx: UpdateContext<'a>,
    /// Candidate volumes; `None` means discover mounted roots.
    candidates: Option<Vec<PathBuf>>,
}

impl<'a> OverrideEngine<'a> {
    /// Create an engine that discovers mounted volumes itself.
    pub fn new(ctx: UpdateContext<'a>) -> Self {
        Self {
            ctx,
            candidates: None,
        }
    }

    /// Use a fixed candidate list instead of discovering mounts.
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    /// Run a complete update.
    pub fn run(&self, config: &UpdateConfig) -> UpdateResult<UpdateReport> {
        let events = self.ctx.events;

        events.emit(&UpdateEvent::StageStarted {
            stage: UpdateStage::ResolvingVolumes,
        });
        let layout = self.resolve_volumes(config)?;
        events.emit(&UpdateEvent::VolumesResolved {
            boot: layout.boot().to_path_buf(),
            runtime: layout.runtime().to_path_buf(),
        });

        let mut report = UpdateReport {
            boot_volume: layout.boot().to_path_buf(),
            runtime_volume: layout.runtime().to_path_buf(),
            ..Default::default()
        };

        let staging = self.stage_archive(config, &mut report)?;
        self.install(&layout, &staging, &mut report)?;

        events.emit(&UpdateEvent::StageStarted {
            stage: UpdateStage::ApplyingOverrides,
        });
        self.apply_overrides(&layout, &config.overrides, &mut report);

        events.emit(&UpdateEvent::StageStarted {
            stage: UpdateStage::Complete,
        });
        Ok(report)
    }

    /// Resolve both volumes, failing if either stays unknown.
    pub fn resolve_volumes(&self, config: &UpdateConfig) -> UpdateResult<DeviceLayout> {
        let mut candidates = config.mount_roots.clone();
        match &self.candidates {
            Some(fixed) => candidates.extend(fixed.iter().cloned()),
            None => candidates.extend(discover_volumes()),
        }
        tracing::debug!(candidates = candidates.len(), "Scanning volumes");

        let detected = classify(&candidates);

        let boot = resolve_role(
            VolumeRole::Boot,
            config.boot_volume.as_deref(),
            detected.get(VolumeRole::Boot),
            self.ctx.resolver,
        )?;
        let runtime = resolve_role(
            VolumeRole::Runtime,
            config.runtime_volume.as_deref(),
            detected.get(VolumeRole::Runtime),
            self.ctx.resolver,
        )?;

        match (boot, runtime) {
            (Some(boot), Some(runtime)) => Ok(DeviceLayout::new(boot, runtime)),
            (boot, runtime) => Err(UpdateError::PartitionsUnresolved { boot, runtime }),
        }
    }

    /// Collect the parts and extract them. Returns the staging directory.
    fn stage_archive(
        &self,
        config: &UpdateConfig,
        report: &mut UpdateReport,
    ) -> UpdateResult<PathBuf> {
        let events = self.ctx.events;

        events.emit(&UpdateEvent::StageStarted {
            stage: UpdateStage::Downloading,
        });
        let parts = collect_parts(
            &config.source,
            self.ctx.source,
            &config.download_dir(),
            events,
        )?;
        report.parts = parts.len();

        events.emit(&UpdateEvent::StageStarted {
            stage: UpdateStage::Extracting,
        });
        // Leftovers from a kept work dir would be installed and counted
        let staging = config.staging_dir();
        if remove_tree(&staging)? {
            tracing::debug!(dir = %staging.display(), "Cleared previous staging directory");
        }
        report.files_extracted = assemble(parts, &staging, self.ctx.decoder)?;
        events.emit(&UpdateEvent::Extracted {
            dest: staging.clone(),
            files: report.files_extracted,
        });

        Ok(staging)
    }

    /// Merge the archive subtrees onto the volume roots.
    ///
    /// Both subtrees are checked before either volume is written.
    fn install(
        &self,
        layout: &DeviceLayout,
        staging: &Path,
        report: &mut UpdateReport,
    ) -> UpdateResult<()> {
        let events = self.ctx.events;
        events.emit(&UpdateEvent::StageStarted {
            stage: UpdateStage::Installing,
        });

        let trees = [
            (BOOT_SUBTREE, layout.boot()),
            (RUNTIME_SUBTREE, layout.runtime()),
        ];
        let missing = trees
            .iter()
            .find(|(subtree, _)| !staging.join(subtree).is_dir());
        if let Some((missing, _)) = missing {
            return Err(UpdateError::ArchiveExtractionFailed {
                path: staging.to_path_buf(),
                reason: format!("archive has no '{}' directory", missing),
            });
        }

        for (subtree, dest) in trees {
            let files = merge_copy(&staging.join(subtree), dest)?;
            if subtree == BOOT_SUBTREE {
                report.boot_files_copied = files;
            } else {
                report.runtime_files_copied = files;
            }
            events.emit(&UpdateEvent::TreeApplied {
                subtree: subtree.to_string(),
                dest: dest.to_path_buf(),
                files,
            });
        }

        Ok(())
    }

    /// Run every override step, recording each outcome.
    pub fn apply_overrides(
        &self,
        layout: &DeviceLayout,
        overrides: &OverrideSpec,
        report: &mut UpdateReport,
    ) {
        if overrides.is_empty() {
            tracing::debug!("No overrides configured");
        }

        for step in OverrideStep::ALL {
            let status = self.apply_step(step, layout, overrides);
            match &status {
                StepStatus::NotConfigured => {}
                StepStatus::Applied(detail) => self.ctx.events.emit(&UpdateEvent::StepApplied {
                    step,
                    detail: detail.clone(),
                }),
                StepStatus::Skipped(reason) => self.ctx.events.emit(&UpdateEvent::StepSkipped {
                    step,
                    reason: reason.clone(),
                }),
                StepStatus::Failed(error) => self.ctx.events.emit(&UpdateEvent::StepFailed {
                    step,
                    error: error.clone(),
                }),
            }
            report.record(step, status);
        }
    }

    fn apply_step(
        &self,
        step: OverrideStep,
        layout: &DeviceLayout,
        overrides: &OverrideSpec,
    ) -> StepStatus {
        let result = match step {
            OverrideStep::RetroarchConfig => overrides.retroarch_overrides.as_deref().map(|src| {
                apply_retroarch_overrides(layout, src, self.ctx.events)
                    .map(|n| format!("{} entries merged", n))
            }),
            OverrideStep::SkinSettings => overrides.skin_overrides.as_deref().map(|src| {
                apply_skin_overrides(layout, src).map(|n| format!("{} keys merged", n))
            }),
            OverrideStep::SystemIcons => overrides.system_icons.as_deref().map(|src| {
                apply_system_icons(layout, src).map(|n| format!("{} files copied", n))
            }),
            OverrideStep::BootLogo => overrides.boot_logo.as_deref().map(|src| {
                apply_boot_logo(layout, src).map(|compressed| {
                    if compressed {
                        "compressed and written".to_string()
                    } else {
                        "copied".to_string()
                    }
                })
            }),
        };

        match result {
            None => StepStatus::NotConfigured,
            Some(Ok(detail)) => StepStatus::Applied(detail),
            Some(Err(UpdateError::ConfigTargetMissing { path })) => {
                StepStatus::Skipped(format!("could not find {}", path.display()))
            }
            Some(Err(e)) => StepStatus::Failed(e.to_string()),
        }
    }
}

/// Delete the working directory used for downloads and extraction.
///
/// Returns `true` when something was removed.
pub fn cleanup_staging(config: &UpdateConfig) -> UpdateResult<bool> {
    let removed = remove_tree(config.work_dir())?;
    if removed {
        tracing::info!(dir = %config.work_dir().display(), "Removed downloaded files");
    }
    Ok(removed)
}
