//! HTTP part source.
//!
//! Fetches the release page, picks the anchors whose text matches the
//! requested part names, and streams each part to disk.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER, USER_AGENT};

use super::source::{PartSource, RemoteLink};
use crate::error::{UpdateError, UpdateResult};

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Release pages refuse clients that do not look like a browser.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:78.0) Gecko/20100101 Firefox/78.0";

/// HTTP-based part source.
#[derive(Debug)]
pub struct HttpPartSource {
    client: Client,
    pub(crate) timeout: Duration,
}

impl HttpPartSource {
    /// Create a new HTTP source with default settings.
    pub fn new() -> UpdateResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new HTTP source with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> UpdateResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                UpdateError::InvalidConfig(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }

    fn page_headers(page_url: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        if let Ok(referer) = HeaderValue::from_str(page_url) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> UpdateError {
        let reason = if e.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs())
        } else {
            e.to_string()
        };
        UpdateError::DownloadFailed {
            url: url.to_string(),
            reason,
        }
    }
}

impl PartSource for HttpPartSource {
    fn find_links(&self, page_url: &str, link_names: &[String]) -> UpdateResult<Vec<RemoteLink>> {
        let response = self
            .client
            .get(page_url)
            .headers(Self::page_headers(page_url))
            .send()
            .map_err(|e| self.request_error(page_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                url: page_url.to_string(),
                reason: format!("page request failed with status {}", status),
            });
        }

        let body = response
            .text()
            .map_err(|e| self.request_error(page_url, e))?;

        let mut links: Vec<RemoteLink> = extract_links(&body)
            .into_iter()
            .filter(|link| link_names.iter().any(|name| name == &link.name))
            .collect();
        links.sort_by(|a, b| a.name.cmp(&b.name));
        links.dedup_by(|a, b| a.name == b.name);

        tracing::debug!(page = page_url, found = links.len(), "Matched part links");
        Ok(links)
    }

    fn download(&self, url: &str, dest: &Path) -> UpdateResult<u64> {
        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(dest).map_err(|e| UpdateError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| UpdateError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("Read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| UpdateError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;
        }

        writer.flush().map_err(|e| UpdateError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(downloaded)
    }
}

fn anchor_regex() -> &'static Regex {
    static ANCHOR: OnceLock<Regex> = OnceLock::new();
    ANCHOR.get_or_init(|| {
        Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
            .expect("anchor pattern is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"))
}

/// Extract every anchor with an `href` from an HTML document.
///
/// Link text has nested tags stripped, entities decoded and surrounding
/// whitespace trimmed.
pub fn extract_links(html: &str) -> Vec<RemoteLink> {
    anchor_regex()
        .captures_iter(html)
        .map(|caps| {
            let url = decode_entities(&caps[1]);
            let text = tag_regex().replace_all(&caps[2], "");
            RemoteLink {
                name: decode_entities(text.trim()),
                url,
            }
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x2F;", "/")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Answer `requests` connections with a 404 and return the base URL.
    fn serve_not_found(requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                stream
                    .write_all(
                        b"HTTP/1.1 404 Not Found\r\n\
                          Content-Length: 0\r\n\
                          Connection: close\r\n\r\n",
                    )
                    .unwrap();
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_http_source_with_timeout() {
        let source = HttpPartSource::with_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(source.timeout.as_secs(), 60);
    }

    #[test]
    fn test_http_source_new() {
        let source = HttpPartSource::new().unwrap();
        assert_eq!(source.timeout.as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_extract_links() {
        let html = r#"
            <p>Downloads:</p>
            <a class="btn" href="https://cdn.example.com/f?id=2&amp;t=x">
                <span>fw.7z.002</span>
            </a>
            <A HREF='https://cdn.example.com/f?id=1'>fw.7z.001</A>
            <a name="anchor-without-href">nothing</a>
        "#;

        let links = extract_links(html);

        assert_eq!(
            links,
            vec![
                RemoteLink {
                    name: "fw.7z.002".to_string(),
                    url: "https://cdn.example.com/f?id=2&t=x".to_string(),
                },
                RemoteLink {
                    name: "fw.7z.001".to_string(),
                    url: "https://cdn.example.com/f?id=1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_not_found_status_is_download_failure() {
        let base = serve_not_found(2);
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("parts/fw.7z.001");
        let source = HttpPartSource::with_timeout(Duration::from_secs(10)).unwrap();

        let page_url = format!("{}/posts/1", base);
        match source.find_links(&page_url, &["fw.7z.001".to_string()]) {
            Err(UpdateError::DownloadFailed { url, reason }) => {
                assert_eq!(url, page_url);
                assert!(reason.contains("404"), "reason: {}", reason);
            }
            other => panic!("unexpected result {:?}", other),
        }

        let part_url = format!("{}/file?id=1", base);
        let err = source.download(&part_url, &dest).unwrap_err();
        assert!(matches!(err, UpdateError::DownloadFailed { .. }));
        assert!(!dest.exists());
        assert!(!dest.parent().unwrap().exists());
    }

    #[test]
    fn test_decode_entities_amp_last() {
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
    }
}
