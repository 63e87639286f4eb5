//! Href decomposition for manifest, TOC and content links.
//!
//! EPUB documents reference each other through hrefs whose directory
//! prefixes are inconsistent: TOC entries, spine items and in-content links
//! are often expressed relative to different directories, and may be
//! percent-encoded. Resolution therefore works on the decoded basename
//! (sans extension), which is stable across all of these spellings.

/// Decomposed parts of an href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href {
    /// Path part before any fragment.
    pub url: String,
    /// Fragment after `#`, if any.
    pub hash: Option<String>,
    /// Directory prefix of the path, without a trailing slash.
    pub prefix: String,
    /// URL-decoded basename without its extension.
    pub name: String,
    /// Extension without the leading dot; empty if none.
    pub ext: String,
}

impl Href {
    /// Split an href into path, fragment, directory, decoded stem and
    /// extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use epub2md::Href;
    ///
    /// let href = Href::parse("text/ch%202.xhtml#sec1");
    /// assert_eq!(href.url, "text/ch%202.xhtml");
    /// assert_eq!(href.hash.as_deref(), Some("sec1"));
    /// assert_eq!(href.prefix, "text");
    /// assert_eq!(href.name, "ch 2");
    /// assert_eq!(href.ext, "xhtml");
    /// ```
    pub fn parse(href: &str) -> Href {
        let (url, hash) = match href.split_once('#') {
            Some((url, hash)) => (url, Some(hash.to_string())),
            None => (href, None),
        };

        let (prefix, filename) = match url.rsplit_once('/') {
            Some((prefix, filename)) => (prefix, filename),
            None => ("", url),
        };

        let decoded = percent_encoding::percent_decode_str(filename)
            .decode_utf8()
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| filename.to_string());

        let (name, ext) = match decoded.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), ext.to_string()),
            None => (decoded.clone(), String::new()),
        };

        Href {
            url: url.to_string(),
            hash,
            prefix: prefix.to_string(),
            name,
            ext,
        }
    }

    /// The decoded basename including its extension.
    pub fn filename(&self) -> String {
        if self.ext.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.ext)
        }
    }
}

/// Whether a URL points outside the archive.
pub fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Resolve a relative href against a base directory, collapsing `.` and
/// `..` segments.
pub(crate) fn resolve_relative(base: &str, href: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !base.is_empty() {
        parts.extend(base.split('/').filter(|p| !p.is_empty() && *p != "."));
    }
    for seg in href.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
