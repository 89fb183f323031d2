//! Split firmware archive handling.
//!
//! This module provides functionality for getting the firmware archive onto
//! disk and unpacked, including:
//! - Part naming and sequence validation (`part`)
//! - Link discovery and part downloads (`source`, `http`)
//! - A seekable stream over all parts (`reader`)
//! - Extraction through a pluggable decoder (`extractor`)
//!
//! # Architecture
//!
//! ```text
//! collect_parts
//!         │
//!         ├── PartSource (trait)
//!         │       └── HttpPartSource
//!         │
//!         └── discover_parts (local directory)
//!
//! assemble
//!         │
//!         ├── order_parts (1..N, no gaps)
//!         ├── MultiPartReader (one logical stream)
//!         └── ArchiveDecoder (trait)
//!                 └── SevenZipDecoder
//! ```

mod extractor;
mod http;
mod part;
mod reader;
mod source;

pub use extractor::{assemble, ArchiveDecoder, SevenZipDecoder};
pub use http::{extract_links, HttpPartSource};
pub use part::{discover_parts, order_parts, ArchivePart};
pub use reader::MultiPartReader;
pub use source::{collect_parts, fetch_parts, ArchiveSource, PartSource, RemoteLink};
