//! Terminal prompts.

use std::path::Path;

use cfwupdate::volume::{PartitionResolver, VolumeRole};
use cfwupdate::{UpdateError, UpdateResult};
use dialoguer::{Confirm, Input};

use crate::error::CliError;

/// Asks the user to confirm or correct each detected partition.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleResolver;

impl ConsoleResolver {
    pub fn new() -> Self {
        Self
    }
}

impl PartitionResolver for ConsoleResolver {
    fn manual_path(
        &self,
        role: VolumeRole,
        detected: Option<&Path>,
    ) -> UpdateResult<Option<String>> {
        let answer = Input::<String>::new()
            .with_prompt(prompt_text(role, detected))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| {
                UpdateError::InvalidConfig(format!("{} partition prompt failed: {}", role, e))
            })?;

        Ok(Some(answer))
    }
}

/// Prompt shown for a role.
pub fn prompt_text(role: VolumeRole, detected: Option<&Path>) -> String {
    let marker = match role {
        VolumeRole::Boot => "the one containing uImage",
        VolumeRole::Runtime => "the one containing the CFW folder",
        VolumeRole::Unclassified => "any",
    };

    match detected {
        Some(path) => format!(
            "Detected {} partition at {} ({}). \
             Press Enter to accept, or type a drive letter or path",
            role,
            path.display(),
            marker
        ),
        None => format!(
            "Could not find the {} partition ({}). Type its drive letter or path",
            role, marker
        ),
    }
}

/// Ask whether the downloaded and extracted files should be deleted.
pub fn confirm_cleanup(dir: &Path) -> Result<bool, CliError> {
    let answer = Confirm::new()
        .with_prompt(format!("Delete the downloaded files in {}?", dir.display()))
        .default(false)
        .interact()?;
    Ok(answer)
}
