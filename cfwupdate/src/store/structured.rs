//! JSON settings documents.
//!
//! Only the top level is merged: an override value replaces the whole value
//! stored under its key, nested objects included.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};

use super::ConfigDocument;
use crate::error::{UpdateError, UpdateResult};

const INDENT: &[u8] = b"    ";

/// Ordered top-level JSON object.
#[derive(Debug, Clone, Default)]
pub struct StructuredDocument {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl StructuredDocument {
    /// Parse JSON text into a document bound to `path`.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> UpdateResult<Self> {
        let path = path.into();
        let entries = decode_object(&path, text)?;
        Ok(Self { path, entries })
    }

    /// Set a top-level key, replacing any previous value wholesale.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Apply override JSON text. Returns the number of keys applied.
    pub fn merge_text(&mut self, override_path: &Path, text: &str) -> UpdateResult<usize> {
        let overrides = decode_object(override_path, text)?;
        let applied = overrides.len();
        for (key, value) in overrides {
            self.entries.insert(key, value);
        }
        Ok(applied)
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialize with four-space indentation.
    pub fn to_text(&self) -> UpdateResult<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(INDENT);
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        self.entries
            .serialize(&mut serializer)
            .map_err(|e| UpdateError::ParseFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        buf.push(b'\n');
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl ConfigDocument for StructuredDocument {
    type Value = Value;

    fn load(path: &Path) -> UpdateResult<Self> {
        let text = read_text(path)?;
        Self::parse(path, &text)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn merge_from(&mut self, override_path: &Path) -> UpdateResult<usize> {
        let text = read_text(override_path)?;
        self.merge_text(override_path, &text)
    }

    fn save(&self, path: &Path) -> UpdateResult<()> {
        let text = self.to_text()?;
        fs::write(path, text).map_err(|e| UpdateError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn decode_object(path: &Path, text: &str) -> UpdateResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(text).map_err(|e| UpdateError::ParseFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(UpdateError::ParseFailed {
            path: path.to_path_buf(),
            reason: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn read_text(path: &Path) -> UpdateResult<String> {
    fs::read_to_string(path).map_err(|e| UpdateError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
