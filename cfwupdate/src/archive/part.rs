//! Archive part naming and ordering.
//!
//! Parts are named `<archive-name>.<NNN>` where `NNN` is the sequence
//! number starting at 1, zero-padded to three digits, e.g.
//! `RG35XX-CopyPasteOnTopOfStock.7z.002`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{UpdateError, UpdateResult};

/// Width of the zero-padded sequence suffix.
const SEQUENCE_WIDTH: usize = 3;

/// One downloaded chunk of a split archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePart {
    /// Sequence number, starting at 1.
    pub sequence: u32,
    /// Location of the part file.
    pub path: PathBuf,
}

impl ArchivePart {
    /// Create a part.
    pub fn new(sequence: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            sequence,
            path: path.into(),
        }
    }

    /// File name for part `sequence` of `archive_name`.
    pub fn file_name(archive_name: &str, sequence: u32) -> String {
        format!("{}.{:0width$}", archive_name, sequence, width = SEQUENCE_WIDTH)
    }

    /// Part `sequence` of `archive_name` inside `dir`.
    pub fn in_dir(dir: &Path, archive_name: &str, sequence: u32) -> Self {
        Self::new(sequence, dir.join(Self::file_name(archive_name, sequence)))
    }

    /// Parse the sequence number from a part file name.
    ///
    /// Returns `None` when the name does not belong to `archive_name`.
    pub fn parse_sequence(archive_name: &str, file_name: &str) -> Option<u32> {
        let suffix = file_name.strip_prefix(archive_name)?.strip_prefix('.')?;
        if suffix.len() != SEQUENCE_WIDTH || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }
}

/// Sort parts by sequence and check the sequence is complete.
///
/// The result runs 1..=N without gaps or duplicates.
pub fn order_parts(mut parts: Vec<ArchivePart>, location: &str) -> UpdateResult<Vec<ArchivePart>> {
    if parts.is_empty() {
        return Err(UpdateError::NoArchivePartsFound {
            location: location.to_string(),
        });
    }

    parts.sort_by_key(|p| p.sequence);

    for (index, part) in parts.iter().enumerate() {
        let expected = index as u32 + 1;
        if part.sequence != expected {
            return Err(UpdateError::MissingArchivePart { sequence: expected });
        }
    }

    Ok(parts)
}

/// Find the parts of `archive_name` already present in `dir`.
pub fn discover_parts(dir: &Path, archive_name: &str) -> UpdateResult<Vec<ArchivePart>> {
    let entries = fs::read_dir(dir).map_err(|e| UpdateError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let parts = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let name = entry.file_name();
            let sequence = ArchivePart::parse_sequence(archive_name, &name.to_string_lossy())?;
            Some(ArchivePart::new(sequence, entry.path()))
        })
        .collect();

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_is_zero_padded() {
        assert_eq!(ArchivePart::file_name("fw.7z", 1), "fw.7z.001");
        assert_eq!(ArchivePart::file_name("fw.7z", 12), "fw.7z.012");
        assert_eq!(ArchivePart::file_name("fw.7z", 123), "fw.7z.123");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(ArchivePart::parse_sequence("fw.7z", "fw.7z.002"), Some(2));
        assert_eq!(ArchivePart::parse_sequence("fw.7z", "fw.7z.2"), None);
        assert_eq!(ArchivePart::parse_sequence("fw.7z", "other.7z.001"), None);
        assert_eq!(ArchivePart::parse_sequence("fw.7z", "fw.7z.00a"), None);
        assert_eq!(ArchivePart::parse_sequence("fw.7z", "fw.7z"), None);
    }

    #[test]
    fn test_order_parts_reorders() {
        let parts = vec![
            ArchivePart::new(2, "p2"),
            ArchivePart::new(3, "p3"),
            ArchivePart::new(1, "p1"),
        ];

        let ordered = order_parts(parts, "test").unwrap();
        let sequences: Vec<_> = ordered.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_order_parts_missing_first() {
        let parts = vec![ArchivePart::new(2, "p2"), ArchivePart::new(3, "p3")];
        let err = order_parts(parts, "test").unwrap_err();
        assert!(matches!(err, UpdateError::MissingArchivePart { sequence: 1 }));
        assert!(err.is_missing_parts());
    }

    #[test]
    fn test_order_parts_gap() {
        let parts = vec![ArchivePart::new(1, "p1"), ArchivePart::new(3, "p3")];
        let err = order_parts(parts, "test").unwrap_err();
        assert!(matches!(err, UpdateError::MissingArchivePart { sequence: 2 }));
    }

    #[test]
    fn test_order_parts_duplicate_is_a_gap() {
        let parts = vec![ArchivePart::new(1, "a"), ArchivePart::new(1, "b")];
        let err = order_parts(parts, "test").unwrap_err();
        assert!(matches!(err, UpdateError::MissingArchivePart { sequence: 2 }));
    }

    #[test]
    fn test_order_parts_empty() {
        let err = order_parts(Vec::new(), "https://example.com").unwrap_err();
        assert!(matches!(err, UpdateError::NoArchivePartsFound { .. }));
    }

    #[test]
    fn test_discover_parts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("fw.7z.002"), b"b").unwrap();
        fs::write(temp.path().join("fw.7z.001"), b"a").unwrap();
        fs::write(temp.path().join("fw.7z"), b"").unwrap();
        fs::write(temp.path().join("notes.txt"), b"").unwrap();

        let parts = order_parts(discover_parts(temp.path(), "fw.7z").unwrap(), "dir").unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].path, temp.path().join("fw.7z.001"));
        assert_eq!(parts[1].path, temp.path().join("fw.7z.002"));
    }
}
