//! CLI error type.

use std::path::PathBuf;

use cfwupdate::UpdateError;
use thiserror::Error;

/// Errors surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// The update itself failed.
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Invalid flags or configuration file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading an answer from the terminal failed.
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// The JSON report could not be written.
    #[error("Failed to write report {}: {reason}", .path.display())]
    Report { path: PathBuf, reason: String },
}

impl CliError {
    /// Follow-up advice printed under the error, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Update(err) if err.is_missing_parts() => Some(
                "make sure every archive part is in the directory, \
                 or omit --archive-dir to download them",
            ),
            _ => None,
        }
    }
}
