//! Logical byte stream over split archive parts.
//!
//! The parts are never concatenated on disk. `MultiPartReader` presents
//! them as one seekable stream, opening each part file as reads reach it.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::part::ArchivePart;
use crate::error::{UpdateError, UpdateResult};

#[derive(Debug)]
struct Segment {
    path: PathBuf,
    start: u64,
    len: u64,
}

/// Read + Seek view of ordered archive parts as one stream.
#[derive(Debug)]
pub struct MultiPartReader {
    segments: Vec<Segment>,
    total: u64,
    position: u64,
    /// Open segment and the logical offset its file cursor sits at.
    open: Option<(usize, File, u64)>,
}

impl MultiPartReader {
    /// Build a reader over parts already in sequence order.
    pub fn new(parts: &[ArchivePart]) -> UpdateResult<Self> {
        let mut segments = Vec::with_capacity(parts.len());
        let mut start = 0u64;

        for part in parts {
            let len = part
                .path
                .metadata()
                .map_err(|e| UpdateError::ReadFailed {
                    path: part.path.clone(),
                    source: e,
                })?
                .len();
            segments.push(Segment {
                path: part.path.clone(),
                start,
                len,
            });
            start += len;
        }

        Ok(Self {
            segments,
            total: start,
            position: 0,
            open: None,
        })
    }

    /// Total length of the logical stream.
    pub fn len(&self) -> u64 {
        self.total
    }

    /// Whether the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Path of the first part, used to label errors.
    pub fn first_path(&self) -> Option<&Path> {
        self.segments.first().map(|s| s.path.as_path())
    }

    /// Index of the segment holding `position`. Requires `position < total`.
    fn segment_at(&self, position: u64) -> usize {
        // Empty segments share a start with their successor; pick the last match
        self.segments
            .partition_point(|s| s.start <= position)
            .saturating_sub(1)
    }
}

impl Read for MultiPartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.total {
            return Ok(0);
        }

        let index = self.segment_at(self.position);
        let segment = &self.segments[index];
        let offset_in_segment = self.position - segment.start;
        let remaining = segment.len - offset_in_segment;

        let needs_open = !matches!(self.open, Some((open_index, _, _)) if open_index == index);
        if needs_open {
            let file = File::open(&segment.path)?;
            self.open = Some((index, file, segment.start));
        }

        let Some((_, file, cursor)) = self.open.as_mut() else {
            return Ok(0);
        };
        if *cursor != self.position {
            file.seek(SeekFrom::Start(offset_in_segment))?;
            *cursor = self.position;
        }

        let limit = remaining.min(buf.len() as u64) as usize;
        let read = file.read(&mut buf[..limit])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("archive part {} ended early", segment.path.display()),
            ));
        }

        *cursor += read as u64;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for MultiPartReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.total.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_parts(temp: &TempDir, chunks: &[&[u8]]) -> Vec<ArchivePart> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let part = ArchivePart::in_dir(temp.path(), "data.bin", i as u32 + 1);
                fs::write(&part.path, chunk).unwrap();
                part
            })
            .collect()
    }

    #[test]
    fn test_reads_parts_as_one_stream() {
        let temp = TempDir::new().unwrap();
        let parts = write_parts(&temp, &[b"Hello", b" ", b"World"]);

        let mut reader = MultiPartReader::new(&parts).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();

        assert_eq!(reader.len(), 11);
        assert_eq!(content, "Hello World");
    }

    #[test]
    fn test_seek_across_part_boundaries() {
        let temp = TempDir::new().unwrap();
        let parts = write_parts(&temp, &[b"abc", b"", b"defg", b"hi"]);
        let mut reader = MultiPartReader::new(&parts).unwrap();

        reader.seek(SeekFrom::Start(2)).unwrap();
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cdef");

        reader.seek(SeekFrom::End(-2)).unwrap();
        let mut tail = Vec::new();
        reader.read_to_end(&mut tail).unwrap();
        assert_eq!(tail, b"hi");

        reader.seek(SeekFrom::Start(0)).unwrap();
        reader.seek(SeekFrom::Current(3)).unwrap();
        let mut one = [0u8; 1];
        reader.read_exact(&mut one).unwrap();
        assert_eq!(&one, b"d");
    }

    #[test]
    fn test_seek_before_start_fails() {
        let temp = TempDir::new().unwrap();
        let parts = write_parts(&temp, &[b"abc"]);
        let mut reader = MultiPartReader::new(&parts).unwrap();

        assert!(reader.seek(SeekFrom::Current(-1)).is_err());
    }

    #[test]
    fn test_read_past_end_returns_zero() {
        let temp = TempDir::new().unwrap();
        let parts = write_parts(&temp, &[b"abc"]);
        let mut reader = MultiPartReader::new(&parts).unwrap();

        reader.seek(SeekFrom::Start(10)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_missing_part_file() {
        let parts = vec![ArchivePart::new(1, "/nonexistent/data.bin.001")];
        let result = MultiPartReader::new(&parts);
        assert!(matches!(result, Err(UpdateError::ReadFailed { .. })));
    }
}
