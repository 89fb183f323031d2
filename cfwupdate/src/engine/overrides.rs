//! Individual override steps.
//!
//! Each step takes the device layout and its own source path. A missing
//! on-device target is reported as `ConfigTargetMissing`; the engine turns
//! that into a skip.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{UpdateError, UpdateResult};
use crate::events::{EventSink, UpdateEvent};
use crate::layout::{backup_path, DeviceLayout};
use crate::store::{ConfigDocument, KeyValueDocument, StructuredDocument};
use crate::tree::merge_copy;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Back up `retroarch.cfg`, then merge the override file into it.
///
/// Returns the number of override entries applied.
pub fn apply_retroarch_overrides(
    layout: &DeviceLayout,
    overrides: &Path,
    events: &dyn EventSink,
) -> UpdateResult<usize> {
    let config_file = layout.retroarch_config();
    if !config_file.is_file() {
        return Err(UpdateError::ConfigTargetMissing { path: config_file });
    }

    let backup = backup_path(&config_file);
    fs::copy(&config_file, &backup).map_err(|e| UpdateError::WriteFailed {
        path: backup.clone(),
        source: e,
    })?;
    events.emit(&UpdateEvent::BackupCreated { path: backup });

    let mut doc = KeyValueDocument::load(&config_file)?;
    let applied = doc.merge_from(overrides)?;
    doc.save_in_place()?;

    Ok(applied)
}

/// Merge the override JSON into the skin `settings.json`.
///
/// No backup is taken for this file.
pub fn apply_skin_overrides(layout: &DeviceLayout, overrides: &Path) -> UpdateResult<usize> {
    let settings = layout.skin_settings();
    if !settings.is_file() {
        return Err(UpdateError::ConfigTargetMissing { path: settings });
    }

    let mut doc = StructuredDocument::load(&settings)?;
    let applied = doc.merge_from(overrides)?;
    doc.save_in_place()?;

    Ok(applied)
}

/// Merge-copy the icon override directory onto the skin `system` directory.
///
/// Returns the number of files copied.
pub fn apply_system_icons(layout: &DeviceLayout, icons_dir: &Path) -> UpdateResult<usize> {
    let system_dir = layout.skin_system_dir();
    if !system_dir.is_dir() {
        return Err(UpdateError::ConfigTargetMissing { path: system_dir });
    }

    merge_copy(icons_dir, &system_dir)
}

/// Write the boot logo, replacing any existing one.
///
/// Gzip sources are copied as-is; anything else is compressed on the way.
/// Returns `true` when the source had to be compressed.
pub fn apply_boot_logo(layout: &DeviceLayout, logo: &Path) -> UpdateResult<bool> {
    let target = layout.boot_logo();
    let read_err = |e: io::Error| UpdateError::ReadFailed {
        path: logo.to_path_buf(),
        source: e,
    };
    let write_err = |e: io::Error| UpdateError::WriteFailed {
        path: target.clone(),
        source: e,
    };

    if is_gzip(logo).map_err(read_err)? {
        fs::copy(logo, &target).map_err(write_err)?;
        return Ok(false);
    }

    let mut reader = BufReader::new(File::open(logo).map_err(read_err)?);
    let writer = BufWriter::new(File::create(&target).map_err(write_err)?);
    let mut encoder = GzEncoder::new(writer, Compression::best());
    io::copy(&mut reader, &mut encoder).map_err(write_err)?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(write_err)?;

    Ok(true)
}

fn is_gzip(path: &Path) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}
