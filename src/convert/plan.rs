//! Output planning: decide, before any content is converted, which archive
//! entry lands where on disk and under what name.
//!
//! Planning runs as a separate first pass because the link rewriter needs
//! every section's final filename before any section's Markdown is produced.

use std::collections::{HashMap, HashSet};

use crate::link::Href;
use crate::package::Package;
use crate::toc::{TocNode, find_by_section_id};

/// What an archive entry turns into on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// HTML content, converted to a `.md` file.
    Markdown,
    /// Copied into `images/` unchanged.
    Image,
    /// CSS, fonts and the rest; copied into `static/` only when unzipping.
    Other,
}

/// One planned output file.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    /// Manifest id.
    pub id: String,
    /// Manifest href, for reading the source bytes.
    pub href: String,
    pub kind: EntryKind,
    /// Output filename within the target directory (or `images/`/`static/`).
    pub filename: String,
    /// TOC title the filename was derived from, when one matched.
    pub title: Option<String>,
    /// 1-based position among Markdown entries; `None` for resources.
    pub order: Option<usize>,
}

/// The full output plan for one conversion run.
pub struct Plan {
    pub entries: Vec<PlanEntry>,
    by_id: HashMap<String, usize>,
    /// Decoded href basename (sans extension) -> Markdown entry index.
    by_name: HashMap<String, usize>,
}

impl Plan {
    /// Look up any planned entry by manifest id.
    pub fn by_id(&self, id: &str) -> Option<&PlanEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Resolve an href to the Markdown entry it points at, by decoded
    /// basename, the same matching rule the TOC resolver uses.
    pub fn markdown_for_href(&self, href: &str) -> Option<&PlanEntry> {
        let name = Href::parse(href).name;
        if name.is_empty() {
            return None;
        }
        self.by_name.get(&name).map(|&i| &self.entries[i])
    }

    pub fn markdown_entries(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Markdown)
    }

    pub fn image_entries(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Image)
    }
}

/// Compute the output plan for a package.
///
/// Spine entries come first, in reading order; manifest entries outside the
/// spine follow in document order, so order labels stay aligned with how a
/// reader would page through the book. The manifest's TOC file and the
/// conventional `titlepage` entry produce no output.
pub fn plan(package: &Package, toc: &[TocNode]) -> Plan {
    let mut ordered: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for id in &package.spine {
        if seen.insert(id.as_str()) {
            ordered.push(id.as_str());
        }
    }
    for item in &package.manifest {
        if seen.insert(item.id.as_str()) {
            ordered.push(item.id.as_str());
        }
    }

    let eligible: Vec<(&str, &str, EntryKind)> = ordered
        .iter()
        .filter_map(|id| package.item(id))
        .filter(|item| !item.href.ends_with("ncx") && item.id != "titlepage")
        .map(|item| (item.id.as_str(), item.href.as_str(), classify(&item.href)))
        .collect();

    let section_count = eligible
        .iter()
        .filter(|(_, _, kind)| *kind == EntryKind::Markdown)
        .count();
    let width = label_width(section_count);

    let mut entries = Vec::with_capacity(eligible.len());
    let mut by_id = HashMap::new();
    let mut by_name = HashMap::new();
    let mut order = 0usize;

    for (id, href, kind) in eligible {
        let parsed = Href::parse(href);
        let (filename, title, entry_order) = match kind {
            EntryKind::Markdown => {
                order += 1;
                let title = find_by_section_id(toc, id).map(|node| node.name.clone());
                let base = title
                    .as_deref()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| sanitize_filename(&parsed.name));
                (
                    format!("{order:0width$}-{base}.md"),
                    title,
                    Some(order),
                )
            }
            EntryKind::Image | EntryKind::Other => (parsed.filename(), None, None),
        };

        if kind == EntryKind::Markdown {
            by_name.entry(parsed.name.clone()).or_insert(entries.len());
        }
        by_id.insert(id.to_string(), entries.len());
        entries.push(PlanEntry {
            id: id.to_string(),
            href: href.to_string(),
            kind,
            filename,
            title,
            order: entry_order,
        });
    }

    Plan {
        entries,
        by_id,
        by_name,
    }
}

/// Classify a manifest href by extension.
pub(crate) fn classify(href: &str) -> EntryKind {
    let ext = Href::parse(href).ext.to_ascii_lowercase();
    match ext.as_str() {
        "htm" | "html" | "xhtml" => EntryKind::Markdown,
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" => EntryKind::Image,
        _ => EntryKind::Other,
    }
}

/// Digits needed to print `n`, for zero-padding order labels.
fn label_width(n: usize) -> usize {
    let mut width = 1;
    let mut m = n;
    while m >= 10 {
        m /= 10;
        width += 1;
    }
    width
}

/// Replace filesystem-hostile characters and whitespace with underscores.
pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::parse_package;
    use crate::toc::parse_toc;

    fn fixture(extra_items: &str, spine_extra: &str) -> Package {
        parse_package(&format!(
            r#"<package>
  <metadata><dc:title>T</dc:title></metadata>
  <manifest>
    <item id="ch1" href="text/ch1.html" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.html" media-type="application/xhtml+xml"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
{extra_items}  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
{spine_extra}  </spine>
</package>"#
        ))
        .expect("package fixture")
    }

    fn fixture_toc(package: &Package) -> Vec<crate::toc::TocNode> {
        parse_toc(
            r#"<ncx><navMap>
  <navPoint id="np1" playOrder="1">
    <navLabel><text>Chapter One</text></navLabel>
    <content src="text/ch1.html"/>
  </navPoint>
  <navPoint id="np2" playOrder="2">
    <navLabel><text>Chapter Two</text></navLabel>
    <content src="text/ch2.html"/>
  </navPoint>
</navMap></ncx>"#,
            package,
        )
        .expect("toc fixture")
    }

    #[test]
    fn test_plan_names_from_toc_titles() {
        let package = fixture("", "");
        let toc = fixture_toc(&package);
        let plan = plan(&package, &toc);

        let names: Vec<&str> = plan
            .markdown_entries()
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(names, vec!["1-Chapter_One.md", "2-Chapter_Two.md"]);
    }

    #[test]
    fn test_plan_skips_ncx_and_titlepage() {
        let package = fixture(
            "    <item id=\"titlepage\" href=\"titlepage.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            "    <itemref idref=\"titlepage\"/>\n",
        );
        let toc = fixture_toc(&package);
        let plan = plan(&package, &toc);

        assert!(plan.by_id("ncx").is_none());
        assert!(plan.by_id("titlepage").is_none());
        assert_eq!(plan.entries.len(), 2);
    }

    #[test]
    fn test_plan_falls_back_to_basename_without_toc() {
        let package = fixture("", "");
        let plan = plan(&package, &[]);

        let names: Vec<&str> = plan
            .markdown_entries()
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(names, vec!["1-ch1.md", "2-ch2.md"]);
        assert!(plan.markdown_entries().all(|e| e.title.is_none()));
    }

    #[test]
    fn test_plan_classifies_resources() {
        let package = fixture(
            "    <item id=\"img1\" href=\"images/cover.png\" media-type=\"image/png\"/>\n    <item id=\"css\" href=\"style.css\" media-type=\"text/css\"/>\n",
            "",
        );
        let toc = fixture_toc(&package);
        let plan = plan(&package, &toc);

        let img = plan.by_id("img1").expect("image entry");
        assert_eq!(img.kind, EntryKind::Image);
        assert_eq!(img.filename, "cover.png");
        assert_eq!(img.order, None);

        let css = plan.by_id("css").expect("css entry");
        assert_eq!(css.kind, EntryKind::Other);
        assert_eq!(css.filename, "style.css");
    }

    #[test]
    fn test_plan_orders_spine_before_loose_manifest() {
        let package = fixture(
            "    <item id=\"extra\" href=\"text/appendix.html\" media-type=\"application/xhtml+xml\"/>\n",
            "",
        );
        let plan = plan(&package, &[]);

        let ids: Vec<&str> = plan.markdown_entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ch1", "ch2", "extra"]);
        assert_eq!(
            plan.by_id("extra").and_then(|e| e.order),
            Some(3)
        );
    }

    #[test]
    fn test_order_labels_pad_to_section_count() {
        let mut items = String::new();
        let mut refs = String::new();
        for i in 3..=12 {
            items.push_str(&format!(
                "    <item id=\"c{i}\" href=\"text/c{i}.html\" media-type=\"application/xhtml+xml\"/>\n"
            ));
            refs.push_str(&format!("    <itemref idref=\"c{i}\"/>\n"));
        }
        let package = fixture(&items, &refs);
        let plan = plan(&package, &[]);

        let names: Vec<&str> = plan
            .markdown_entries()
            .map(|e| e.filename.as_str())
            .collect();
        assert_eq!(names[0], "01-ch1.md");
        assert_eq!(names[11], "12-c12.md");
    }

    #[test]
    fn test_markdown_for_href_ignores_path_prefix_and_fragment() {
        let package = fixture("", "");
        let toc = fixture_toc(&package);
        let plan = plan(&package, &toc);

        let entry = plan
            .markdown_for_href("../text/ch2.html#sec2")
            .expect("resolve ch2");
        assert_eq!(entry.id, "ch2");
        assert!(plan.markdown_for_href("#bare-fragment").is_none());
        assert!(plan.markdown_for_href("nowhere.html").is_none());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Chapter One"), "Chapter_One");
        assert_eq!(sanitize_filename("a/b:c*d?e\"f<g>h|i\\j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("  padded  "), "padded");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[test]
    fn test_label_width() {
        assert_eq!(label_width(0), 1);
        assert_eq!(label_width(9), 1);
        assert_eq!(label_width(10), 2);
        assert_eq!(label_width(99), 2);
        assert_eq!(label_width(100), 3);
    }
}
