//! The EPUB document facade.
//!
//! [`Epub`] ties the archive, container, package and TOC layers together:
//! open once, then read metadata, walk the navigation tree and pull section
//! content without caring where any of it lives inside the zip.

use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::archive::Archive;
use crate::container::{Container, parse_container};
use crate::error::{Error, Result};
use crate::link::{is_remote, resolve_relative};
use crate::package::{Metadata, Package, parse_package};
use crate::section::Section;
use crate::toc::{TocNode, parse_toc};

/// Matches <img ... src="..."> up to the closing quote of the src value
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img([^>]*?)src\s*=\s*["']([^"']+)["']"#).unwrap());

/// A parsed EPUB archive.
///
/// Construction reads and validates the structural layers up front
/// (container, package document, TOC); section content is read lazily on
/// request. Reads take `&mut self` because zip decompression seeks.
#[derive(Debug)]
pub struct Epub {
    archive: Archive,
    container: Container,
    package: Package,
    toc: Vec<TocNode>,
}

impl Epub {
    /// Open an EPUB file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Epub> {
        let data = std::fs::read(path)?;
        Epub::from_bytes(data)
    }

    /// Parse an EPUB from an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Result<Epub> {
        let mut archive = Archive::new(data)?;

        let container_xml = archive.read_text("META-INF/container.xml")?;
        let container = parse_container(&container_xml)?;

        let opf = archive.read_text(&container.opf_path)?;
        let package = parse_package(&opf)?;

        let toc = match toc_href(&package) {
            Some(href) => {
                let path = join_root(&container.content_root, &href);
                let content = archive.read_text(&path)?;
                parse_toc(&content, &package)?
            }
            None => {
                log::warn!("no table of contents declared; using file names for titles");
                Vec::new()
            }
        };

        Ok(Epub {
            archive,
            container,
            package,
            toc,
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.package.metadata
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// The normalized TOC forest; empty when the book declares none.
    pub fn structure(&self) -> &[TocNode] {
        &self.toc
    }

    /// Path prefix all manifest hrefs are relative to ("" or "OEBPS/"-like).
    pub fn content_root(&self) -> &str {
        &self.container.content_root
    }

    /// Read a manifest-relative resource.
    ///
    /// Hrefs starting with `/` address the zip root directly; everything else
    /// is joined onto the content root.
    pub fn read_item(&mut self, href: &str) -> Result<Vec<u8>> {
        if let Some(absolute) = href.strip_prefix('/') {
            self.archive.read(absolute)
        } else {
            let path = join_root(&self.container.content_root, href);
            self.archive.read(&path)
        }
    }

    /// `read_item`, decoded as UTF-8 text.
    pub fn read_item_text(&mut self, href: &str) -> Result<String> {
        if let Some(absolute) = href.strip_prefix('/') {
            self.archive.read_text(absolute)
        } else {
            let path = join_root(&self.container.content_root, href);
            self.archive.read_text(&path)
        }
    }

    /// Load one section by manifest id.
    ///
    /// Works for any manifest entry with textual content, spine-listed or
    /// not; cover pages and appendices outside the reading order are still
    /// addressable.
    pub fn section(&mut self, id: &str) -> Result<Section> {
        let item = self
            .package
            .item(id)
            .ok_or_else(|| Error::UnknownItem(id.to_string()))?;
        let href = item.href.clone();
        let content = self.read_item_text(&href)?;
        Ok(Section::new(id.to_string(), href, content))
    }

    /// All spine sections in reading order.
    pub fn sections(&mut self) -> Result<Vec<Section>> {
        let ids: Vec<String> = self.package.spine.clone();
        let mut sections = Vec::with_capacity(ids.len());
        for id in ids {
            sections.push(self.section(&id)?);
        }
        Ok(sections)
    }

    /// Rewrite a section's `<img src>` references to data URIs so the HTML
    /// is self-contained.
    ///
    /// Remote and already-inline images are left alone. An image that cannot
    /// be read keeps its original src; the section still renders, just with
    /// a broken picture.
    pub fn inline_images(&mut self, section: &Section) -> Section {
        let base_dir = section
            .href
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();
        let root = self.container.content_root.clone();
        let archive = &mut self.archive;

        let content = IMG_SRC_RE
            .replace_all(&section.content, |caps: &regex_lite::Captures| {
                let src = &caps[2];
                if is_remote(src) || src.starts_with("data:") {
                    return caps[0].to_string();
                }
                match inline_one(archive, &root, &base_dir, src) {
                    Ok(data_uri) => format!("<img{}src=\"{}\"", &caps[1], data_uri),
                    Err(e) => {
                        log::warn!("could not inline image {src}: {e}");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();

        Section::new(section.id.clone(), section.href.clone(), content)
    }
}

fn inline_one(archive: &mut Archive, root: &str, base_dir: &str, src: &str) -> Result<String> {
    use base64::Engine;

    let path = if let Some(absolute) = src.strip_prefix('/') {
        absolute.to_string()
    } else {
        join_root(root, &resolve_relative(base_dir, src))
    };
    let bytes = archive.read(&path)?;
    let ext = src.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_for(ext), encoded))
}

fn mime_for(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn join_root(root: &str, href: &str) -> String {
    if root.is_empty() {
        href.to_string()
    } else {
        format!("{root}{href}")
    }
}

/// Locate the TOC document in the manifest.
///
/// The spine `toc` attribute is authoritative; books that omit it often
/// still carry an NCX under the conventional id, a dtbncx media type, or an
/// EPUB 3 nav property, in that order of preference.
fn toc_href(package: &Package) -> Option<String> {
    if let Some(id) = &package.toc_id
        && let Some(item) = package.item(id)
    {
        return Some(item.href.clone());
    }
    if let Some(item) = package.item("ncx") {
        return Some(item.href.clone());
    }
    if let Some(item) = package
        .manifest
        .iter()
        .find(|i| i.media_type == "application/x-dtbncx+xml")
    {
        return Some(item.href.clone());
    }
    package
        .manifest
        .iter()
        .find(|i| {
            i.properties
                .as_deref()
                .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "nav"))
        })
        .map(|i| i.href.clone())
}
