//! cfwupdate - Custom firmware updater for SD-card based handhelds
//!
//! This library updates the custom firmware on a handheld whose SD card
//! exposes two volumes: a boot volume (holding `uImage`) and a runtime
//! volume (holding `CFW/`). An update run:
//!
//! 1. Detects both volumes, optionally confirmed by the user
//! 2. Downloads the split 7z firmware archive and extracts it
//! 3. Merge-copies the archive's `misc` tree onto the boot volume and its
//!    `roms` tree onto the runtime volume
//! 4. Reapplies personal overrides: RetroArch settings, skin settings,
//!    system icons and the boot logo
//!
//! # Example
//!
//! ```no_run
//! use cfwupdate::archive::{HttpPartSource, SevenZipDecoder};
//! use cfwupdate::engine::{OverrideEngine, UpdateConfig, UpdateContext};
//! use cfwupdate::events::TracingSink;
//! use cfwupdate::volume::AcceptDetected;
//!
//! # fn main() -> cfwupdate::UpdateResult<()> {
//! let source = HttpPartSource::new()?;
//! let decoder = SevenZipDecoder::new();
//! let ctx = UpdateContext::new(&source, &decoder, &AcceptDetected, &TracingSink);
//!
//! let report = OverrideEngine::new(ctx).run(&UpdateConfig::default())?;
//! println!("{} files installed", report.boot_files_copied + report.runtime_files_copied);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod layout;
pub mod store;
pub mod tree;
pub mod volume;

pub use engine::{OverrideEngine, UpdateConfig, UpdateContext, UpdateReport};
pub use error::{UpdateError, UpdateResult};
