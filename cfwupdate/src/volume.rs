//! Volume discovery and classification.
//!
//! The device exposes two partitions when its card is mounted: a boot
//! partition holding the kernel image and a runtime partition holding the
//! firmware's `CFW` directory. Candidates are classified by looking only at
//! their direct children.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{UpdateError, UpdateResult};
use crate::layout::{BOOT_MARKER, RUNTIME_MARKER};

/// Role a mounted volume plays on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeRole {
    /// Holds `uImage` and the boot logo.
    Boot,
    /// Holds the `CFW` directory with RetroArch and the skin.
    Runtime,
    /// Neither marker found.
    Unclassified,
}

impl VolumeRole {
    /// Get a human-readable name for the role.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Runtime => "runtime",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for VolumeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mounted filesystem root and the roles its contents satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Mount point or drive root.
    pub root: PathBuf,
    /// Contains a regular file named `uImage`.
    pub is_boot: bool,
    /// Contains a directory named `CFW`.
    pub is_runtime: bool,
}

impl Volume {
    /// Inspect the direct children of `root`.
    ///
    /// An unreadable root is treated as unclassified.
    pub fn inspect(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let (is_boot, is_runtime) = match fs::read_dir(&root) {
            Ok(entries) => {
                let mut is_boot = false;
                let mut is_runtime = false;
                for entry in entries.flatten() {
                    let name = entry.file_name();
                    let Ok(file_type) = entry.file_type() else {
                        continue;
                    };
                    // Follow symlinks the way a plain stat would
                    let path = entry.path();
                    let is_file = file_type.is_file() || (file_type.is_symlink() && path.is_file());
                    let is_dir = file_type.is_dir() || (file_type.is_symlink() && path.is_dir());
                    if name == BOOT_MARKER && is_file {
                        is_boot = true;
                    }
                    if name == RUNTIME_MARKER && is_dir {
                        is_runtime = true;
                    }
                }
                (is_boot, is_runtime)
            }
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Skipping unreadable volume");
                (false, false)
            }
        };

        Self {
            root,
            is_boot,
            is_runtime,
        }
    }

    /// Primary role, preferring boot when both markers are present.
    pub fn role(&self) -> VolumeRole {
        if self.is_boot {
            VolumeRole::Boot
        } else if self.is_runtime {
            VolumeRole::Runtime
        } else {
            VolumeRole::Unclassified
        }
    }
}

/// Result of classifying a set of candidate volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// First candidate holding `uImage`.
    pub boot: Option<PathBuf>,
    /// First candidate holding `CFW`.
    pub runtime: Option<PathBuf>,
}

impl Classification {
    /// Detected root for a role.
    pub fn get(&self, role: VolumeRole) -> Option<&Path> {
        match role {
            VolumeRole::Boot => self.boot.as_deref(),
            VolumeRole::Runtime => self.runtime.as_deref(),
            VolumeRole::Unclassified => None,
        }
    }
}

/// Classify candidate roots. The first match per role wins, in input order.
pub fn classify<P: AsRef<Path>>(candidates: &[P]) -> Classification {
    let mut result = Classification::default();

    for candidate in candidates {
        let volume = Volume::inspect(candidate.as_ref());
        tracing::debug!(
            root = %volume.root.display(),
            role = %volume.role(),
            "Inspected volume"
        );
        if volume.is_boot && result.boot.is_none() {
            result.boot = Some(volume.root.clone());
        }
        if volume.is_runtime && result.runtime.is_none() {
            result.runtime = Some(volume.root);
        }
    }

    result
}

/// Source of manual partition answers when detection needs confirming.
///
/// Implementations return the raw answer; `None` or an empty string accepts
/// the detected value.
pub trait PartitionResolver {
    /// Ask for a manual path for `role`, given what was detected.
    fn manual_path(
        &self,
        role: VolumeRole,
        detected: Option<&Path>,
    ) -> UpdateResult<Option<String>>;
}

/// Resolver that always accepts the detected value.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptDetected;

impl PartitionResolver for AcceptDetected {
    fn manual_path(
        &self,
        _role: VolumeRole,
        _detected: Option<&Path>,
    ) -> UpdateResult<Option<String>> {
        Ok(None)
    }
}

/// Resolver returning fixed answers, one per role.
#[derive(Debug, Default, Clone)]
pub struct CannedResolver {
    /// Answer for the boot prompt.
    pub boot: Option<String>,
    /// Answer for the runtime prompt.
    pub runtime: Option<String>,
}

impl CannedResolver {
    /// Create a resolver with the given answers.
    pub fn new(boot: Option<&str>, runtime: Option<&str>) -> Self {
        Self {
            boot: boot.map(str::to_string),
            runtime: runtime.map(str::to_string),
        }
    }
}

impl PartitionResolver for CannedResolver {
    fn manual_path(
        &self,
        role: VolumeRole,
        _detected: Option<&Path>,
    ) -> UpdateResult<Option<String>> {
        Ok(match role {
            VolumeRole::Boot => self.boot.clone(),
            VolumeRole::Runtime => self.runtime.clone(),
            VolumeRole::Unclassified => None,
        })
    }
}

/// Turn a manual answer into a path.
///
/// A single ASCII letter names a drive (`E` becomes `E:`); anything else is
/// taken as a path. Returns `Ok(None)` for an empty answer.
pub fn parse_manual_answer(answer: &str) -> UpdateResult<Option<PathBuf>> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }

    let path = answer_path(answer);
    if !path.exists() {
        return Err(UpdateError::PartitionNotFound {
            identifier: answer.to_string(),
        });
    }

    Ok(Some(path))
}

fn answer_path(answer: &str) -> PathBuf {
    match answer.as_bytes() {
        [letter] if letter.is_ascii_alphabetic() => PathBuf::from(format!("{}:", answer)),
        _ => PathBuf::from(answer),
    }
}

/// Resolve one role.
///
/// An explicitly configured path that exists is used as-is. Otherwise the
/// detected value is offered to the resolver, whose non-empty answer
/// replaces it.
pub fn resolve_role(
    role: VolumeRole,
    configured: Option<&Path>,
    detected: Option<&Path>,
    resolver: &dyn PartitionResolver,
) -> UpdateResult<Option<PathBuf>> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        tracing::warn!(
            role = %role,
            path = %path.display(),
            "Configured partition does not exist, falling back to detection"
        );
    }

    let answer = resolver.manual_path(role, detected)?;
    match answer.as_deref().map(parse_manual_answer).transpose()?.flatten() {
        Some(manual) => Ok(Some(manual)),
        None => Ok(detected.map(Path::to_path_buf)),
    }
}

/// Enumerate mounted roots that may belong to the device.
#[cfg(target_os = "windows")]
pub fn discover_volumes() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|root| root.exists())
        .collect()
}

/// Enumerate mounted roots that may belong to the device.
#[cfg(target_os = "linux")]
pub fn discover_volumes() -> Vec<PathBuf> {
    match fs::read_to_string("/proc/mounts") {
        Ok(content) => parse_mounts(&content),
        Err(e) => {
            tracing::warn!(error = %e, "Unable to read /proc/mounts");
            Vec::new()
        }
    }
}

/// Enumerate mounted roots that may belong to the device.
#[cfg(target_os = "macos")]
pub fn discover_volumes() -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = fs::read_dir("/Volumes")
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    roots.sort();
    roots
}

/// Enumerate mounted roots that may belong to the device.
#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
pub fn discover_volumes() -> Vec<PathBuf> {
    Vec::new()
}

/// Filesystems that never hold user data.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "proc",
    "sysfs",
    "devtmpfs",
    "devpts",
    "tmpfs",
    "cgroup",
    "cgroup2",
    "securityfs",
    "pstore",
    "debugfs",
    "tracefs",
    "configfs",
    "fusectl",
    "mqueue",
    "hugetlbfs",
    "bpf",
    "autofs",
    "binfmt_misc",
    "overlay",
    "squashfs",
    "nsfs",
    "rpc_pipefs",
];

/// Parse `/proc/mounts` into mount points, skipping pseudo filesystems.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mounts(content: &str) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let (Some(_device), Some(mount_point), Some(fs_type)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if PSEUDO_FILESYSTEMS.contains(&fs_type) {
            continue;
        }
        // Spaces in mount points are octal-escaped
        let path = PathBuf::from(mount_point.replace("\\040", " "));
        if !roots.contains(&path) {
            roots.push(path);
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_volumes(temp: &TempDir, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let root = temp.path().join(name);
                fs::create_dir_all(&root).unwrap();
                root
            })
            .collect()
    }

    #[test]
    fn test_classify_picks_boot_and_runtime() {
        let temp = TempDir::new().unwrap();
        let roots = make_volumes(&temp, &["a", "b", "c"]);
        fs::write(roots[1].join("uImage"), b"kernel").unwrap();
        fs::create_dir(roots[2].join("CFW")).unwrap();

        let result = classify(&roots);

        assert_eq!(result.boot, Some(roots[1].clone()));
        assert_eq!(result.runtime, Some(roots[2].clone()));
    }

    #[test]
    fn test_classify_first_match_wins() {
        let temp = TempDir::new().unwrap();
        let roots = make_volumes(&temp, &["first", "second"]);
        fs::write(roots[0].join("uImage"), b"1").unwrap();
        fs::write(roots[1].join("uImage"), b"2").unwrap();

        let result = classify(&roots);

        assert_eq!(result.boot, Some(roots[0].clone()));
        assert_eq!(result.runtime, None);
    }

    #[test]
    fn test_markers_require_matching_kind() {
        let temp = TempDir::new().unwrap();
        let roots = make_volumes(&temp, &["odd"]);
        // uImage as a directory and CFW as a file do not count
        fs::create_dir(roots[0].join("uImage")).unwrap();
        fs::write(roots[0].join("CFW"), b"").unwrap();

        let volume = Volume::inspect(&roots[0]);
        assert_eq!(volume.role(), VolumeRole::Unclassified);
    }

    #[test]
    fn test_markers_are_not_searched_recursively() {
        let temp = TempDir::new().unwrap();
        let roots = make_volumes(&temp, &["deep"]);
        fs::create_dir_all(roots[0].join("nested")).unwrap();
        fs::write(roots[0].join("nested/uImage"), b"k").unwrap();

        assert_eq!(classify(&roots).boot, None);
    }

    #[test]
    fn test_volume_may_satisfy_both_roles() {
        let temp = TempDir::new().unwrap();
        let roots = make_volumes(&temp, &["both"]);
        fs::write(roots[0].join("uImage"), b"k").unwrap();
        fs::create_dir(roots[0].join("CFW")).unwrap();

        let result = classify(&roots);
        assert_eq!(result.boot, Some(roots[0].clone()));
        assert_eq!(result.runtime, Some(roots[0].clone()));
    }

    #[test]
    fn test_unreadable_candidate_is_unclassified() {
        let volume = Volume::inspect("/nonexistent/volume");
        assert_eq!(volume.role(), VolumeRole::Unclassified);
    }

    #[test]
    fn test_parse_manual_answer_empty() {
        assert_eq!(parse_manual_answer("  ").unwrap(), None);
    }

    #[test]
    fn test_parse_manual_answer_missing_path() {
        let err = parse_manual_answer("/nonexistent/card").unwrap_err();
        match err {
            UpdateError::PartitionNotFound { identifier } => {
                assert_eq!(identifier, "/nonexistent/card")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_drive_letter_answer_names_drive() {
        assert_eq!(answer_path("E"), PathBuf::from("E:"));
        assert_eq!(answer_path("f"), PathBuf::from("f:"));
        assert_eq!(answer_path("EF"), PathBuf::from("EF"));
        assert_eq!(answer_path("/media/E"), PathBuf::from("/media/E"));
    }

    #[test]
    fn test_parse_manual_answer_missing_drive_letter() {
        if Path::new("E:").exists() {
            return;
        }
        match parse_manual_answer(" E ").unwrap_err() {
            UpdateError::PartitionNotFound { identifier } => assert_eq!(identifier, "E"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_resolve_role_prefers_existing_configured_path() {
        let temp = TempDir::new().unwrap();
        let resolver = CannedResolver::new(Some("/nonexistent"), None);

        let resolved = resolve_role(
            VolumeRole::Boot,
            Some(temp.path()),
            None,
            &resolver,
        )
        .unwrap();

        assert_eq!(resolved, Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_resolve_role_manual_answer_overrides_detection() {
        let temp = TempDir::new().unwrap();
        let manual = temp.path().join("manual");
        fs::create_dir(&manual).unwrap();
        let resolver = CannedResolver::new(None, Some(manual.to_str().unwrap()));

        let resolved = resolve_role(
            VolumeRole::Runtime,
            None,
            Some(Path::new("/detected")),
            &resolver,
        )
        .unwrap();

        assert_eq!(resolved, Some(manual));
    }

    #[test]
    fn test_resolve_role_empty_answer_accepts_detected() {
        let resolver = CannedResolver::new(Some(""), None);
        let detected = Path::new("/detected/boot");

        let resolved = resolve_role(VolumeRole::Boot, None, Some(detected), &resolver).unwrap();
        assert_eq!(resolved, Some(detected.to_path_buf()));

        let resolved = resolve_role(VolumeRole::Boot, None, None, &AcceptDetected).unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_parse_mounts_skips_pseudo_filesystems() {
        let content = "\
proc /proc proc rw 0 0
/dev/sda1 / ext4 rw 0 0
/dev/mmcblk0p1 /media/user/BOOT vfat rw 0 0
/dev/mmcblk0p4 /media/user/ROMS\\040CARD exfat rw 0 0
tmpfs /run tmpfs rw 0 0
";
        let roots = parse_mounts(content);
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/"),
                PathBuf::from("/media/user/BOOT"),
                PathBuf::from("/media/user/ROMS CARD"),
            ]
        );
    }
}
