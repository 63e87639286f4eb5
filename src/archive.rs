//! Zip archive access with EPUB path normalization.
//!
//! EPUB hrefs frequently disagree with the zip directory about encoding:
//! manifest entries may be percent-encoded while the archive stores decoded
//! names, and some packages prefix absolute-looking paths with `/`. Reads
//! normalize both before giving up.

use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};

/// An EPUB archive held fully in memory.
///
/// The whole file is read up front; every derived structure (package,
/// table of contents, sections) is built from these bytes.
#[derive(Debug)]
pub struct Archive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl Archive {
    /// Open an archive from raw zip bytes.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let zip = ZipArchive::new(Cursor::new(data))?;
        Ok(Self { zip })
    }

    /// Open an archive from a file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::new(data)
    }

    /// Read an entry as raw bytes.
    ///
    /// A leading slash is dropped before lookup. If the literal path is
    /// absent, a percent-decoded form is tried as a fallback.
    pub fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        let path = path.strip_prefix('/').unwrap_or(path);

        match self.zip.by_name(path) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                return Ok(contents);
            }
            Err(zip::result::ZipError::FileNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let decoded = percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .map_err(|_| Error::InvalidEpub(format!("invalid UTF-8 in path: {path}")))?;

        match self.zip.by_name(&decoded) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                Ok(contents)
            }
            Err(zip::result::ZipError::FileNotFound) => {
                Err(Error::EntryNotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read an entry as UTF-8 text, stripping a UTF-8 BOM if present.
    pub fn read_text(&mut self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        let bytes = strip_bom(&bytes);
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Whether an entry exists under either the literal or decoded path.
    pub fn contains(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        if self.zip.index_for_name(path).is_some() {
            return true;
        }
        percent_encoding::percent_decode_str(path)
            .decode_utf8()
            .is_ok_and(|decoded| self.zip.index_for_name(&decoded).is_some())
    }
}

/// Strip UTF-8 BOM (byte order mark) if present.
pub(crate) fn strip_bom(data: &[u8]) -> &[u8] {
    // UTF-8 BOM: EF BB BF
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}
