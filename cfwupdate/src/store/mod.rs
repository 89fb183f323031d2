//! On-device configuration documents.
//!
//! Two document formats share one capability:
//!
//! ```text
//! ConfigDocument (trait)
//!     ├── KeyValueDocument   (retroarch.cfg, `key = value` lines)
//!     └── StructuredDocument (skin settings.json, top-level JSON object)
//! ```
//!
//! Both keep their entries in insertion order. Merging an override file
//! overwrites colliding keys in place and appends new keys in the order the
//! override file lists them. Saving rewrites the whole document.

mod key_value;
mod structured;

pub use key_value::KeyValueDocument;
pub use structured::StructuredDocument;

use std::path::Path;

use crate::error::UpdateResult;

/// A configuration document that can be loaded, merged and saved.
pub trait ConfigDocument: Sized {
    /// Value type stored under each key.
    type Value;

    /// Load a document from a file.
    fn load(path: &Path) -> UpdateResult<Self>;

    /// Path the document was loaded from.
    fn path(&self) -> &Path;

    /// Look up a value by key.
    fn get(&self, key: &str) -> Option<&Self::Value>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether the document has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge the entries of an override file into this document.
    ///
    /// Returns the number of override entries applied.
    fn merge_from(&mut self, override_path: &Path) -> UpdateResult<usize>;

    /// Write the full document to `path`.
    fn save(&self, path: &Path) -> UpdateResult<()>;

    /// Write the full document back to the file it was loaded from.
    fn save_in_place(&self) -> UpdateResult<()> {
        self.save(self.path())
    }
}
