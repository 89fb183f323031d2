//! Retrieval of archive parts.
//!
//! Network access sits behind the `PartSource` trait. `fetch_parts` turns
//! the links a source reports into numbered part files; local directories
//! of previously downloaded parts are picked up by `collect_parts`.

use std::fs;
use std::path::{Path, PathBuf};

use super::part::{discover_parts, order_parts, ArchivePart};
use crate::error::{UpdateError, UpdateResult};
use crate::events::{EventSink, UpdateEvent};

/// A downloadable link found on the release page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    /// Link display text, e.g. `RG35XX-CopyPasteOnTopOfStock.7z.001`.
    pub name: String,
    /// Target URL.
    pub url: String,
}

/// Network collaborator for release pages and part payloads.
pub trait PartSource {
    /// Find links on `page_url` whose display text is one of `link_names`.
    ///
    /// Implementations return matches sorted by display text.
    fn find_links(&self, page_url: &str, link_names: &[String]) -> UpdateResult<Vec<RemoteLink>>;

    /// Download `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> UpdateResult<u64>;
}

/// Where the update archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Download parts linked from a release page.
    Remote {
        /// Release page listing the part links.
        page_url: String,
        /// Display names of the links to download.
        link_names: Vec<String>,
        /// Base name used for the part files, e.g. `update.7z`.
        archive_name: String,
    },
    /// Use parts already present in a directory.
    Local {
        /// Directory holding `<archive_name>.NNN` files.
        dir: PathBuf,
        /// Base name of the part files.
        archive_name: String,
    },
}

impl ArchiveSource {
    /// Base name of the part files.
    pub fn archive_name(&self) -> &str {
        match self {
            Self::Remote { archive_name, .. } | Self::Local { archive_name, .. } => archive_name,
        }
    }
}

/// Download every linked part into `dir`.
///
/// Links are sorted by display text and numbered 1..N in that order; the
/// zero-padded names make the lexicographic order match the numeric one.
pub fn fetch_parts(
    source: &dyn PartSource,
    page_url: &str,
    link_names: &[String],
    archive_name: &str,
    dir: &Path,
    events: &dyn EventSink,
) -> UpdateResult<Vec<ArchivePart>> {
    let mut links = source.find_links(page_url, link_names)?;
    if links.is_empty() {
        return Err(UpdateError::NoArchivePartsFound {
            location: page_url.to_string(),
        });
    }
    links.sort_by(|a, b| a.name.cmp(&b.name));

    fs::create_dir_all(dir).map_err(|e| UpdateError::CreateDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let total = links.len();
    let mut parts = Vec::with_capacity(total);

    for (index, link) in links.iter().enumerate() {
        let part = ArchivePart::in_dir(dir, archive_name, index as u32 + 1);
        events.emit(&UpdateEvent::PartStarted {
            name: link.name.clone(),
            index: index + 1,
            total,
        });

        let bytes = source.download(&link.url, &part.path)?;

        events.emit(&UpdateEvent::PartDownloaded {
            name: link.name.clone(),
            path: part.path.clone(),
            bytes,
        });
        parts.push(part);
    }

    Ok(parts)
}

/// Produce the ordered parts for `archive` using `download_dir` for fetches.
pub fn collect_parts(
    archive: &ArchiveSource,
    source: &dyn PartSource,
    download_dir: &Path,
    events: &dyn EventSink,
) -> UpdateResult<Vec<ArchivePart>> {
    match archive {
        ArchiveSource::Remote {
            page_url,
            link_names,
            archive_name,
        } => {
            let parts = fetch_parts(
                source,
                page_url,
                link_names,
                archive_name,
                download_dir,
                events,
            )?;
            order_parts(parts, page_url)
        }
        ArchiveSource::Local { dir, archive_name } => {
            let parts = discover_parts(dir, archive_name)?;
            order_parts(parts, &dir.display().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Serves links in reverse order; payload is the URL itself.
    struct FakeSource {
        links: Vec<RemoteLink>,
        downloads: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(names: &[&str]) -> Self {
            let links = names
                .iter()
                .rev()
                .map(|name| RemoteLink {
                    name: name.to_string(),
                    url: format!("https://files.example.com/{}", name),
                })
                .collect();
            Self {
                links,
                downloads: RefCell::new(Vec::new()),
            }
        }
    }

    impl PartSource for FakeSource {
        fn find_links(
            &self,
            _page_url: &str,
            link_names: &[String],
        ) -> UpdateResult<Vec<RemoteLink>> {
            Ok(self
                .links
                .iter()
                .filter(|l| link_names.contains(&l.name))
                .cloned()
                .collect())
        }

        fn download(&self, url: &str, dest: &Path) -> UpdateResult<u64> {
            self.downloads.borrow_mut().push(url.to_string());
            fs::write(dest, url.as_bytes()).unwrap();
            Ok(url.len() as u64)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fetch_parts_numbers_in_display_order() {
        let temp = TempDir::new().unwrap();
        let source = FakeSource::new(&["fw.7z.001", "fw.7z.002", "fw.7z.003"]);
        let sink = RecordingSink::new();

        let parts = fetch_parts(
            &source,
            "https://example.com/post",
            &names(&["fw.7z.001", "fw.7z.002", "fw.7z.003"]),
            "fw.7z",
            temp.path(),
            &sink,
        )
        .unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].path, temp.path().join("fw.7z.001"));
        assert_eq!(
            fs::read_to_string(&parts[2].path).unwrap(),
            "https://files.example.com/fw.7z.003"
        );
        assert_eq!(
            source.downloads.borrow()[0],
            "https://files.example.com/fw.7z.001"
        );
        assert_eq!(sink.count(|e| matches!(e, UpdateEvent::PartDownloaded { .. })), 3);
    }

    #[test]
    fn test_fetch_parts_no_matching_links() {
        let temp = TempDir::new().unwrap();
        let source = FakeSource::new(&["other.zip"]);
        let sink = RecordingSink::new();

        let err = fetch_parts(
            &source,
            "https://example.com/post",
            &names(&["fw.7z.001"]),
            "fw.7z",
            temp.path(),
            &sink,
        )
        .unwrap_err();

        assert!(matches!(err, UpdateError::NoArchivePartsFound { .. }));
        assert!(source.downloads.borrow().is_empty());
    }

    #[test]
    fn test_collect_parts_local_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("fw.7z.002"), b"b").unwrap();
        fs::write(temp.path().join("fw.7z.001"), b"a").unwrap();
        let archive = ArchiveSource::Local {
            dir: temp.path().to_path_buf(),
            archive_name: "fw.7z".to_string(),
        };
        let source = FakeSource::new(&[]);

        let parts = collect_parts(&archive, &source, temp.path(), &RecordingSink::new()).unwrap();

        let sequences: Vec<_> = parts.iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert!(source.downloads.borrow().is_empty());
    }

    #[test]
    fn test_collect_parts_local_gap() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("fw.7z.002"), b"b").unwrap();
        let archive = ArchiveSource::Local {
            dir: temp.path().to_path_buf(),
            archive_name: "fw.7z".to_string(),
        };

        let err = collect_parts(&archive, &FakeSource::new(&[]), temp.path(), &RecordingSink::new())
            .unwrap_err();
        assert!(err.is_missing_parts());
    }
}
