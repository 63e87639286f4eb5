//! Table-of-contents resolution.
//!
//! EPUB tables of contents come in two structurally incompatible shapes:
//! the legacy NCX navigation control file (`<navMap><navPoint>...`) and the
//! EPUB 3 XHTML navigation document (`<nav epub:type="toc"><ol><li>...`).
//! Both are normalized into one [`TocNode`] forest here; nothing downstream
//! ever branches on the source shape again.
//!
//! Nesting depth is capped during parsing and all tree walks are iterative,
//! so externally authored documents cannot blow the call stack.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::link::Href;
use crate::package::Package;
use crate::xml::{attr, local_name, resolve_entity};

/// Maximum navPoint / list-item nesting accepted before the document is
/// rejected as malformed.
const MAX_TOC_DEPTH: usize = 64;

/// One normalized navigation node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TocNode {
    /// Human-readable label, including any `<span>` numbering prefix.
    pub name: String,
    /// Manifest id of the target section; `None` when the href could not be
    /// resolved. Callers fall back to the literal href in that case.
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub section_id: Option<String>,
    /// Fragment ident within the target document, when the href carries one
    /// (for NCX, the `navPoint` id attribute serves as fallback).
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub node_id: Option<String>,
    /// The href exactly as written in the TOC document.
    pub path: String,
    /// NCX `playOrder`, or a synthetic pre-order counter for HTML navs.
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub play_order: Option<usize>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<TocNode>,
}

/// Parse a TOC document of either shape into a normalized forest.
///
/// Shape detection happens once, on the root element: `<html>` selects the
/// navigation-document branch, anything else is treated as NCX.
pub fn parse_toc(content: &str, package: &Package) -> Result<Vec<TocNode>> {
    if root_is_html(content) {
        parse_html_nav(content, package)
    } else {
        parse_ncx(content, package)
    }
}

fn root_is_html(content: &str) -> bool {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return local_name(e.name().as_ref()) == b"html";
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

// ============================================================================
// NCX branch
// ============================================================================

struct NavPointState {
    children: Vec<TocNode>,
    text: Option<String>,
    src: Option<String>,
    node_id: Option<String>,
    play_order: Option<usize>,
}

impl NavPointState {
    fn root() -> Self {
        NavPointState {
            children: Vec::new(),
            text: None,
            src: None,
            node_id: None,
            play_order: None,
        }
    }
}

fn parse_ncx(content: &str, package: &Package) -> Result<Vec<TocNode>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<NavPointState> = vec![NavPointState::root()];
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"navPoint" => {
                        if stack.len() > MAX_TOC_DEPTH {
                            return Err(Error::InvalidEpub(format!(
                                "navigation nesting exceeds {MAX_TOC_DEPTH} levels"
                            )));
                        }
                        let play_order =
                            attr(&e, b"playOrder").and_then(|order| order.parse().ok());
                        stack.push(NavPointState {
                            children: Vec::new(),
                            text: None,
                            src: None,
                            node_id: attr(&e, b"id"),
                            play_order,
                        });
                    }
                    b"text" => in_text = true,
                    b"content" => {
                        if let Some(src) = attr(&e, b"src")
                            && let Some(state) = stack.last_mut()
                        {
                            state.src = Some(src);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"content"
                    && let Some(src) = attr(&e, b"src")
                    && let Some(state) = stack.last_mut()
                {
                    state.src = Some(src);
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    match &mut state.text {
                        Some(existing) => existing.push_str(&raw),
                        None => state.text = Some(raw.into_owned()),
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        match &mut state.text {
                            Some(existing) => existing.push_str(&resolved),
                            None => state.text = Some(resolved),
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"text" => in_text = false,
                    b"navPoint" => {
                        // The root state never pops; a stray </navPoint>
                        // without a matching start is ignored.
                        if stack.len() > 1
                            && let Some(state) = stack.pop()
                            && let (Some(text), Some(src)) = (state.text, state.src)
                        {
                            let node = build_node(
                                text,
                                src,
                                state.node_id,
                                state.play_order,
                                state.children,
                                package,
                            );
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(node);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(stack.pop().map(|s| s.children).unwrap_or_default())
}

fn build_node(
    name: String,
    path: String,
    fallback_node_id: Option<String>,
    play_order: Option<usize>,
    children: Vec<TocNode>,
    package: &Package,
) -> TocNode {
    let href = Href::parse(&path);
    TocNode {
        name,
        section_id: package.resolve_item_id(&path),
        node_id: href.hash.or(fallback_node_id),
        path,
        play_order,
        children,
    }
}

// ============================================================================
// HTML navigation-document branch
// ============================================================================

struct LiState {
    name: String,
    href: Option<String>,
    play_order: usize,
    children: Vec<TocNode>,
}

fn parse_html_nav(content: &str, package: &Package) -> Result<Vec<TocNode>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut roots: Vec<TocNode> = Vec::new();
    let mut stack: Vec<LiState> = Vec::new();

    // Inside the toc nav; navs explicitly typed as something else
    // (landmarks, page-list) are skipped wholesale.
    let mut in_toc_nav = false;
    let mut toc_done = false;
    let mut in_anchor = false;
    let mut span_depth = 0usize;
    let mut running_order = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"nav" if !toc_done => {
                        let nav_type = attr(&e, b"type");
                        in_toc_nav = match nav_type.as_deref() {
                            Some("toc") | None => true,
                            Some(_) => false,
                        };
                    }
                    b"li" if in_toc_nav => {
                        if stack.len() >= MAX_TOC_DEPTH {
                            return Err(Error::InvalidEpub(format!(
                                "navigation nesting exceeds {MAX_TOC_DEPTH} levels"
                            )));
                        }
                        running_order += 1;
                        stack.push(LiState {
                            name: String::new(),
                            href: None,
                            play_order: running_order,
                            children: Vec::new(),
                        });
                    }
                    b"a" if in_toc_nav => {
                        in_anchor = true;
                        if let Some(href) = attr(&e, b"href")
                            && let Some(item) = stack.last_mut()
                            && item.href.is_none()
                        {
                            item.href = Some(href);
                        }
                    }
                    b"span" if in_toc_nav && !stack.is_empty() => span_depth += 1,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"a"
                    && in_toc_nav
                    && let Some(href) = attr(&e, b"href")
                    && let Some(item) = stack.last_mut()
                    && item.href.is_none()
                {
                    item.href = Some(href);
                }
            }
            Ok(Event::Text(e)) => {
                if in_toc_nav
                    && (in_anchor || span_depth > 0)
                    && let Some(item) = stack.last_mut()
                {
                    let raw = String::from_utf8_lossy(e.as_ref());
                    item.name.push_str(&raw);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_toc_nav
                    && (in_anchor || span_depth > 0)
                    && let Some(item) = stack.last_mut()
                {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        item.name.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"a" => in_anchor = false,
                    b"span" => span_depth = span_depth.saturating_sub(1),
                    b"li" if in_toc_nav => {
                        if let Some(item) = stack.pop() {
                            let path = item.href.unwrap_or_default();
                            let node = build_node(
                                item.name,
                                path,
                                None,
                                Some(item.play_order),
                                item.children,
                                package,
                            );
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(node);
                            } else {
                                roots.push(node);
                            }
                        }
                    }
                    b"nav" if in_toc_nav => {
                        in_toc_nav = false;
                        toc_done = true;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(roots)
}

// ============================================================================
// Traversal
// ============================================================================

/// Depth-first pre-order iterator over a [`TocNode`] forest.
///
/// Uses an explicit stack rather than recursion, so arbitrarily deep trees
/// walk in constant call-stack space.
pub struct TocIter<'a> {
    stack: Vec<&'a TocNode>,
}

impl<'a> Iterator for TocIter<'a> {
    type Item = &'a TocNode;

    fn next(&mut self) -> Option<&'a TocNode> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// Walk a forest of TOC nodes in pre-order.
pub fn iter_toc(nodes: &[TocNode]) -> TocIter<'_> {
    TocIter {
        stack: nodes.iter().rev().collect(),
    }
}

/// First TOC node targeting the given section id, in pre-order.
///
/// First match wins deliberately: TOC trees routinely contain several
/// entries pointing at the same file, and the earliest title is the
/// authoritative one for naming.
pub fn find_by_section_id<'a>(nodes: &'a [TocNode], id: &str) -> Option<&'a TocNode> {
    iter_toc(nodes).find(|node| node.section_id.as_deref() == Some(id))
}
