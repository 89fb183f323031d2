//! On-device file layout.
//!
//! Every location the updater reads or writes on the two volumes is
//! derived here from the volume roots.

use std::path::{Path, PathBuf};

/// File whose presence marks the boot volume.
pub const BOOT_MARKER: &str = "uImage";

/// Directory whose presence marks the runtime volume.
pub const RUNTIME_MARKER: &str = "CFW";

/// Archive subtree applied onto the boot volume root.
pub const BOOT_SUBTREE: &str = "misc";

/// Archive subtree applied onto the runtime volume root.
pub const RUNTIME_SUBTREE: &str = "roms";

/// Prefix of the key-value config backup file name.
pub const BACKUP_PREFIX: &str = "old.";

const RETROARCH_CONFIG: &str = "retroarch.cfg";
const BOOT_LOGO: &str = "boot_logo.bmp.gz";

/// Resolved locations on a boot/runtime volume pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    boot: PathBuf,
    runtime: PathBuf,
}

impl DeviceLayout {
    /// Create a layout for the given volume roots.
    pub fn new(boot: impl Into<PathBuf>, runtime: impl Into<PathBuf>) -> Self {
        Self {
            boot: boot.into(),
            runtime: runtime.into(),
        }
    }

    /// Boot volume root.
    pub fn boot(&self) -> &Path {
        &self.boot
    }

    /// Runtime volume root.
    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    /// `<runtime>/CFW/retroarch/.retroarch/retroarch.cfg`
    pub fn retroarch_config(&self) -> PathBuf {
        self.retroarch_dir().join(RETROARCH_CONFIG)
    }

    /// `<runtime>/CFW/retroarch/.retroarch/old.retroarch.cfg`
    pub fn retroarch_backup(&self) -> PathBuf {
        self.retroarch_dir()
            .join(format!("{}{}", BACKUP_PREFIX, RETROARCH_CONFIG))
    }

    /// `<runtime>/CFW/skin/settings.json`
    pub fn skin_settings(&self) -> PathBuf {
        self.skin_dir().join("settings.json")
    }

    /// `<runtime>/CFW/skin/system`
    pub fn skin_system_dir(&self) -> PathBuf {
        self.skin_dir().join("system")
    }

    /// `<boot>/boot_logo.bmp.gz`
    pub fn boot_logo(&self) -> PathBuf {
        self.boot.join(BOOT_LOGO)
    }

    fn retroarch_dir(&self) -> PathBuf {
        self.runtime
            .join(RUNTIME_MARKER)
            .join("retroarch")
            .join(".retroarch")
    }

    fn skin_dir(&self) -> PathBuf {
        self.runtime.join(RUNTIME_MARKER).join("skin")
    }
}

/// Backup path for a file: a sibling named `old.<name>`.
pub fn backup_path(original: &Path) -> PathBuf {
    let name = original
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    original.with_file_name(format!("{}{}", BACKUP_PREFIX, name))
}
