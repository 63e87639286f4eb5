//! OPF package document parsing: manifest, metadata and spine.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::link::Href;
use crate::xml::{attr, local_name, resolve_entity};

/// One `<item>` from the package manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "String::is_empty"))]
    pub media_type: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub properties: Option<String>,
}

/// Package metadata, best-effort.
///
/// Absent fields stay `None` / empty rather than defaulting; a creator given
/// once or many times always lands in `creators`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Metadata {
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub creators: Vec<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub language: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub publisher: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub rights: Option<String>,
}

/// Parsed OPF package document.
///
/// The manifest keeps document order; `item()` and `spine_index()` give the
/// O(1) lookups everything downstream runs on. Built once per archive open,
/// read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub metadata: Metadata,
    pub manifest: Vec<ManifestItem>,
    /// Manifest ids in reading order.
    pub spine: Vec<String>,
    /// `<spine toc="...">` attribute, when present.
    pub toc_id: Option<String>,
    item_index: HashMap<String, usize>,
    spine_index: HashMap<String, usize>,
}

impl Package {
    /// Look up a manifest item by id.
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.item_index.get(id).map(|&i| &self.manifest[i])
    }

    /// Position of a manifest id in the spine, if it is part of the reading
    /// order.
    pub fn spine_index(&self, id: &str) -> Option<usize> {
        self.spine_index.get(id).copied()
    }

    /// Map an href (relative path, possibly percent-encoded, possibly with a
    /// fragment) onto a manifest item id.
    ///
    /// TOC documents and content documents rarely share a directory, so full
    /// paths do not compare. Matching on the decoded basename without its
    /// extension does, and EPUB filenames are unique enough in practice for
    /// that to hold. No match is not an error; callers degrade.
    pub fn resolve_item_id(&self, href: &str) -> Option<String> {
        let name = Href::parse(href).name;
        if name.is_empty() {
            return None;
        }
        self.manifest
            .iter()
            .find(|item| Href::parse(&item.href).name == name)
            .map(|item| item.id.clone())
    }
}

fn push_item(
    e: &BytesStart<'_>,
    manifest: &mut Vec<ManifestItem>,
    item_index: &mut HashMap<String, usize>,
) -> Result<()> {
    let id = attr(e, b"id").unwrap_or_default();
    let href = attr(e, b"href").unwrap_or_default();
    if id.is_empty() || href.is_empty() {
        return Ok(());
    }
    if item_index.contains_key(&id) {
        return Err(Error::InvalidEpub(format!("duplicate manifest id: {id}")));
    }
    item_index.insert(id.clone(), manifest.len());
    manifest.push(ManifestItem {
        id,
        href,
        media_type: attr(e, b"media-type").unwrap_or_default(),
        properties: attr(e, b"properties"),
    });
    Ok(())
}

/// Parse an OPF package document.
///
/// A missing `<manifest>`, `<metadata>` or `<spine>` element, a duplicate
/// manifest id, and a spine idref pointing outside the manifest are all
/// structural errors that abort the parse.
pub fn parse_package(content: &str) -> Result<Package> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut metadata = Metadata::default();
    let mut manifest: Vec<ManifestItem> = Vec::new();
    let mut item_index: HashMap<String, usize> = HashMap::new();
    let mut spine: Vec<String> = Vec::new();
    let mut toc_id: Option<String> = None;

    let mut seen_manifest = false;
    let mut seen_metadata = false;
    let mut seen_spine = false;

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => {
                        seen_metadata = true;
                        in_metadata = true;
                    }
                    b"manifest" => seen_manifest = true,
                    b"spine" => {
                        seen_spine = true;
                        if let Some(id) = attr(&e, b"toc") {
                            toc_id = Some(id);
                        }
                    }
                    b"item" => push_item(&e, &mut manifest, &mut item_index)?,
                    b"itemref" => {
                        if let Some(idref) = attr(&e, b"idref") {
                            spine.push(idref);
                        }
                    }
                    b"title" | b"creator" | b"description" | b"language" | b"publisher"
                    | b"rights" => {
                        if in_metadata {
                            current_element = Some(String::from_utf8_lossy(local).to_string());
                            buf_text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                match local {
                    b"metadata" => seen_metadata = true,
                    b"manifest" => seen_manifest = true,
                    b"spine" => {
                        seen_spine = true;
                        if let Some(id) = attr(&e, b"toc") {
                            toc_id = Some(id);
                        }
                    }
                    b"item" => push_item(&e, &mut manifest, &mut item_index)?,
                    b"itemref" => {
                        if let Some(idref) = attr(&e, b"idref") {
                            spine.push(idref);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    buf_text.push_str(&raw);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if let Some(ref elem) = current_element {
                    match elem.as_str() {
                        "title" => metadata.title = Some(buf_text.clone()),
                        "creator" => metadata.creators.push(buf_text.clone()),
                        "description" => metadata.description = Some(buf_text.clone()),
                        "language" => metadata.language = Some(buf_text.clone()),
                        "publisher" => metadata.publisher = Some(buf_text.clone()),
                        "rights" => metadata.rights = Some(buf_text.clone()),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if !seen_manifest {
        return Err(Error::InvalidEpub("manifest not found in opf".into()));
    }
    if !seen_metadata {
        return Err(Error::InvalidEpub("metadata not found in opf".into()));
    }
    if !seen_spine {
        return Err(Error::InvalidEpub("spine not found in opf".into()));
    }

    let mut spine_index = HashMap::new();
    for (index, id) in spine.iter().enumerate() {
        if !item_index.contains_key(id) {
            return Err(Error::InvalidEpub(format!(
                "spine references unknown manifest id: {id}"
            )));
        }
        spine_index.entry(id.clone()).or_insert(index);
    }

    Ok(Package {
        metadata,
        manifest,
        spine,
        toc_id,
        item_index,
        spine_index,
    })
}
