//! Line-oriented `key = value` documents.
//!
//! Parsing is deliberately loose: any line containing `=` is an entry, split
//! on the first `=`, with key and value trimmed. Lines whose value is empty
//! after trimming are dropped, so a blank override never clears a setting.
//! Comments and formatting are not preserved on save.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigDocument;
use crate::error::{UpdateError, UpdateResult};

/// Ordered `key = value` document.
#[derive(Debug, Clone, Default)]
pub struct KeyValueDocument {
    path: PathBuf,
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl KeyValueDocument {
    /// Create an empty document bound to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Parse document text into an empty document bound to `path`.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        let mut doc = Self::empty(path);
        for (key, value) in parse_entries(text) {
            doc.set(key, value);
        }
        doc
    }

    /// Set a key, overwriting in place or appending when new.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Apply parsed override text. Returns the number of entries applied.
    pub fn merge_text(&mut self, text: &str) -> usize {
        let mut applied = 0;
        for (key, value) in parse_entries(text) {
            self.set(key, value);
            applied += 1;
        }
        applied
    }

    /// Iterate entries in document order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize the full document.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{} = {}\n", key, value))
            .collect()
    }
}

impl ConfigDocument for KeyValueDocument {
    type Value = String;

    fn load(path: &Path) -> UpdateResult<Self> {
        let text = read_text(path)?;
        Ok(Self::parse(path, &text))
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get(&self, key: &str) -> Option<&String> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn merge_from(&mut self, override_path: &Path) -> UpdateResult<usize> {
        let text = read_text(override_path)?;
        Ok(self.merge_text(&text))
    }

    fn save(&self, path: &Path) -> UpdateResult<()> {
        fs::write(path, self.to_text()).map_err(|e| UpdateError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Parse `key = value` entries, skipping lines without `=` or with an empty value.
fn parse_entries(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let (key, value) = line.split_once('=')?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some((key.trim(), value))
    })
}

/// Device configs are not guaranteed to be UTF-8; decode lossily.
fn read_text(path: &Path) -> UpdateResult<String> {
    let bytes = fs::read(path).map_err(|e| UpdateError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
