//! Archive extraction.
//!
//! Decoding is delegated to an `ArchiveDecoder`; the production decoder
//! reads 7z archives straight from the multi-part stream.

use std::fs;
use std::path::Path;

use super::part::{order_parts, ArchivePart};
use super::reader::MultiPartReader;
use crate::error::{UpdateError, UpdateResult};
use crate::tree::count_files;

/// Decodes an archive stream into a directory tree.
pub trait ArchiveDecoder {
    /// Extract everything in `stream` into `dest_dir`, which already exists.
    fn decode(&self, stream: MultiPartReader, dest_dir: &Path) -> UpdateResult<()>;
}

/// 7z decoder backed by `sevenz-rust`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZipDecoder;

impl SevenZipDecoder {
    /// Create a new 7z decoder.
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveDecoder for SevenZipDecoder {
    fn decode(&self, stream: MultiPartReader, dest_dir: &Path) -> UpdateResult<()> {
        let label = stream
            .first_path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dest_dir.to_path_buf());

        sevenz_rust::decompress(stream, dest_dir).map_err(|e| {
            UpdateError::ArchiveExtractionFailed {
                path: label,
                reason: e.to_string(),
            }
        })
    }
}

/// Assemble ordered-or-not parts and extract them into `dest_dir`.
///
/// Parts are validated before anything is read: an empty set or an
/// incomplete sequence fails without touching `dest_dir`.
///
/// # Returns
///
/// The number of files present under `dest_dir` after extraction.
pub fn assemble(
    parts: Vec<ArchivePart>,
    dest_dir: &Path,
    decoder: &dyn ArchiveDecoder,
) -> UpdateResult<usize> {
    let parts = order_parts(parts, &dest_dir.display().to_string())?;
    let stream = MultiPartReader::new(&parts)?;

    tracing::info!(
        parts = parts.len(),
        bytes = stream.len(),
        dest = %dest_dir.display(),
        "Extracting archive"
    );

    fs::create_dir_all(dest_dir).map_err(|e| UpdateError::CreateDirFailed {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    decoder.decode(stream, dest_dir)?;

    count_files(dest_dir)
}
