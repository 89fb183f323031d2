//! Error types for the updater.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for updater operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while updating a device.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// A manually supplied partition does not exist.
    #[error("unable to find partition for the given identifier {identifier}")]
    PartitionNotFound { identifier: String },

    /// Boot or runtime partition could not be resolved.
    #[error(
        "unable to continue, partitions not specified (boot: {}, runtime: {})",
        display_optional(.boot),
        display_optional(.runtime)
    )]
    PartitionsUnresolved {
        boot: Option<PathBuf>,
        runtime: Option<PathBuf>,
    },

    /// Network retrieval failed.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// No archive parts were found to assemble.
    #[error("no archive parts found in {location}")]
    NoArchivePartsFound { location: String },

    /// The part sequence has a gap or does not start at 1.
    #[error("archive part {sequence:03} is missing")]
    MissingArchivePart { sequence: u32 },

    /// Decompressing or unpacking the archive failed.
    #[error("failed to extract {}: {reason}", .path.display())]
    ArchiveExtractionFailed { path: PathBuf, reason: String },

    /// An override is configured but its on-device target is absent.
    #[error("override target not found at {}", .path.display())]
    ConfigTargetMissing { path: PathBuf },

    /// A configuration document could not be decoded.
    #[error("failed to parse {}: {reason}", .path.display())]
    ParseFailed { path: PathBuf, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl UpdateError {
    /// Whether the error comes from a mandatory step and must end the run.
    ///
    /// Override steps catch everything else locally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PartitionNotFound { .. }
                | Self::PartitionsUnresolved { .. }
                | Self::DownloadFailed { .. }
                | Self::NoArchivePartsFound { .. }
                | Self::MissingArchivePart { .. }
                | Self::ArchiveExtractionFailed { .. }
                | Self::InvalidConfig(_)
        )
    }

    /// Whether the error means the archive parts are absent or incomplete.
    pub fn is_missing_parts(&self) -> bool {
        matches!(
            self,
            Self::NoArchivePartsFound { .. } | Self::MissingArchivePart { .. }
        )
    }
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "none".to_string())
}
