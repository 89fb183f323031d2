//! Inputs to an update run.

use std::path::{Path, PathBuf};

use crate::archive::ArchiveSource;

/// Release page the firmware parts are published on.
pub const DEFAULT_PAGE_URL: &str = "https://www.patreon.com/posts/76561333";

/// Base name of the split firmware archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "RG35XX-CopyPasteOnTopOfStock.7z";

/// Display names of the part links on the release page.
pub const DEFAULT_LINK_NAMES: &[&str] = &[
    "RG35XX-CopyPasteOnTopOfStock.7z.001",
    "RG35XX-CopyPasteOnTopOfStock.7z.002",
];

/// User-supplied override sources. Each is optional; `None` skips the step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSpec {
    /// `key = value` file merged into `retroarch.cfg`.
    pub retroarch_overrides: Option<PathBuf>,
    /// JSON file merged into the skin `settings.json`.
    pub skin_overrides: Option<PathBuf>,
    /// Directory merged onto the skin `system` icon directory.
    pub system_icons: Option<PathBuf>,
    /// Image written as the boot logo.
    pub boot_logo: Option<PathBuf>,
}

impl OverrideSpec {
    /// Whether no override is configured.
    pub fn is_empty(&self) -> bool {
        self.retroarch_overrides.is_none()
            && self.skin_overrides.is_none()
            && self.system_icons.is_none()
            && self.boot_logo.is_none()
    }
}

/// Configuration for one update run.
///
/// Built once by the caller and read by the engine; never mutated during
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Where the firmware archive comes from.
    pub source: ArchiveSource,

    /// Override sources applied after the firmware.
    pub overrides: OverrideSpec,

    /// Explicit boot volume; detected when absent.
    pub boot_volume: Option<PathBuf>,

    /// Explicit runtime volume; detected when absent.
    pub runtime_volume: Option<PathBuf>,

    /// Extra candidate roots scanned before the discovered mounts.
    pub mount_roots: Vec<PathBuf>,

    /// Working directory for downloads and extraction.
    pub work_dir: PathBuf,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            source: ArchiveSource::Remote {
                page_url: DEFAULT_PAGE_URL.to_string(),
                link_names: DEFAULT_LINK_NAMES.iter().map(|s| s.to_string()).collect(),
                archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            },
            overrides: OverrideSpec::default(),
            boot_volume: None,
            runtime_volume: None,
            mount_roots: Vec::new(),
            work_dir: std::env::temp_dir().join("cfwupdate"),
        }
    }
}

impl UpdateConfig {
    /// Create a new configuration with the given working directory.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    /// Set the archive source.
    pub fn with_source(mut self, source: ArchiveSource) -> Self {
        self.source = source;
        self
    }

    /// Set the override sources.
    pub fn with_overrides(mut self, overrides: OverrideSpec) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set the boot volume.
    pub fn with_boot_volume(mut self, path: impl Into<PathBuf>) -> Self {
        self.boot_volume = Some(path.into());
        self
    }

    /// Set the runtime volume.
    pub fn with_runtime_volume(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_volume = Some(path.into());
        self
    }

    /// Add a candidate mount root.
    pub fn with_mount_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_roots.push(path.into());
        self
    }

    /// Directory the archive parts are downloaded into.
    pub fn download_dir(&self) -> PathBuf {
        self.work_dir.clone()
    }

    /// Directory the archive is extracted into.
    pub fn staging_dir(&self) -> PathBuf {
        self.work_dir.join("extracted")
    }

    /// Working directory root.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdateConfig::default();
        assert!(config.overrides.is_empty());
        assert!(config.boot_volume.is_none());
        assert_eq!(config.source.archive_name(), DEFAULT_ARCHIVE_NAME);
        match &config.source {
            ArchiveSource::Remote { link_names, .. } => assert_eq!(link_names.len(), 2),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_builder_pattern() {
        let config = UpdateConfig::new("/tmp/work")
            .with_boot_volume("/media/boot")
            .with_runtime_volume("/media/roms")
            .with_mount_root("/mnt/card")
            .with_overrides(OverrideSpec {
                boot_logo: Some(PathBuf::from("logo.bmp")),
                ..Default::default()
            });

        assert_eq!(config.boot_volume, Some(PathBuf::from("/media/boot")));
        assert_eq!(config.runtime_volume, Some(PathBuf::from("/media/roms")));
        assert_eq!(config.mount_roots, vec![PathBuf::from("/mnt/card")]);
        assert_eq!(config.staging_dir(), PathBuf::from("/tmp/work/extracted"));
        assert!(!config.overrides.is_empty());
    }
}
