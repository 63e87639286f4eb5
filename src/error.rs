//! Error types for epub2md operations.

use thiserror::Error;

/// Errors that can occur while reading an EPUB or exporting it to Markdown.
///
/// Structural failures (container, package document, spine sections) abort a
/// conversion; per-link and per-download failures are handled locally by the
/// converter and never surface through this type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("file not found in archive: {0}")]
    EntryNotFound(String),

    #[error("invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("no manifest item with id: {0}")]
    UnknownItem(String),

    #[error("no Markdown file was found in {0}")]
    NoMarkdownFiles(String),

    #[error("failed to download image {url}: {reason}")]
    Download { url: String, reason: String },

    #[cfg(feature = "localize")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
