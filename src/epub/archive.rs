//! Zip container assembly.

use std::io::{Cursor, Seek, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;

pub const MIMETYPE_PATH: &str = "mimetype";
pub const MIMETYPE: &str = "application/epub+zip";

/// A named archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub data: Vec<u8>,
}

/// Ordered list of archive entries.
///
/// The `mimetype` entry is always written first and stored uncompressed;
/// every other entry is deflated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct EpubArchive {
    entries: Vec<Entry>,
}

impl EpubArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.push(Entry {
            path: path.into(),
            data: data.into(),
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the container. `compression_level` is clamped to the deflate range.
    pub fn write_to<W: Write + Seek>(&self, writer: W, compression_level: i64) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        let stored =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(compression_level.clamp(1, 9)));

        zip.start_file(MIMETYPE_PATH, stored)?;
        zip.write_all(MIMETYPE.as_bytes())?;

        for entry in &self.entries {
            if entry.path == MIMETYPE_PATH {
                continue;
            }
            zip.start_file(entry.path.as_str(), deflated)?;
            zip.write_all(&entry.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Write the container into memory.
    pub fn to_bytes(&self, compression_level: i64) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor, compression_level)?;
        Ok(cursor.into_inner())
    }
}
