//! Test fixtures for assembling synthetic EPUB archives in memory.
//!
//! Used by both unit tests and integration tests; real books are too large
//! and too encumbered to check in, so tests build the smallest archive that
//! exhibits the shape under test.

use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Two-chapter NCX matching [`EpubBuilder::minimal`].
pub const MINIMAL_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="np1" playOrder="1">
      <navLabel><text>Chapter One</text></navLabel>
      <content src="text/ch1.html"/>
    </navPoint>
    <navPoint id="np2" playOrder="2">
      <navLabel><text>Chapter Two</text></navLabel>
      <content src="text/ch2.html"/>
    </navPoint>
  </navMap>
</ncx>"#;

struct TocSpec {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
    content: String,
}

/// Builds a synthetic EPUB zip, byte for byte, without touching disk.
///
/// `minimal()` gives a two-chapter book with an NCX; every knob a test needs
/// to misconfigure has a builder method.
pub struct EpubBuilder {
    title: String,
    /// (id, href, html), spine order
    sections: Vec<(String, String, String)>,
    /// (id, href, media-type) manifest entries without spine presence
    resources: Vec<(String, String, String)>,
    /// (zip path, bytes) written verbatim
    raw_files: Vec<(String, Vec<u8>)>,
    toc: Option<TocSpec>,
    spine_toc: Option<String>,
    with_container: bool,
}

impl EpubBuilder {
    pub fn minimal() -> Self {
        EpubBuilder {
            title: "Test Book".into(),
            sections: vec![
                (
                    "ch1".into(),
                    "text/ch1.html".into(),
                    "<html><body><h1>One</h1><p>First chapter.</p></body></html>".into(),
                ),
                (
                    "ch2".into(),
                    "text/ch2.html".into(),
                    "<html><body><h1>Two</h1><p>Second chapter.</p></body></html>".into(),
                ),
            ],
            resources: Vec::new(),
            raw_files: Vec::new(),
            toc: Some(TocSpec {
                id: "ncx".into(),
                href: "toc.ncx".into(),
                media_type: "application/x-dtbncx+xml".into(),
                properties: None,
                content: MINIMAL_NCX.into(),
            }),
            spine_toc: Some("ncx".into()),
            with_container: true,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Replace the HTML of an existing spine section.
    pub fn section_html(mut self, id: &str, html: &str) -> Self {
        for section in &mut self.sections {
            if section.0 == id {
                section.2 = html.into();
            }
        }
        self
    }

    /// Append a spine section.
    pub fn spine_section(mut self, id: &str, href: &str, html: &str) -> Self {
        self.sections.push((id.into(), href.into(), html.into()));
        self
    }

    /// Declare a manifest item without putting it in the spine. The file
    /// itself is added separately via [`file`](Self::file).
    pub fn manifest_item(mut self, id: &str, href: &str, media_type: &str) -> Self {
        self.resources
            .push((id.into(), href.into(), media_type.into()));
        self
    }

    /// Write a text file at an exact zip path.
    pub fn file(self, path: &str, content: &str) -> Self {
        self.file_bytes(path, content.as_bytes())
    }

    /// Write raw bytes at an exact zip path.
    pub fn file_bytes(mut self, path: &str, content: &[u8]) -> Self {
        self.raw_files.push((path.into(), content.to_vec()));
        self
    }

    /// Drop the TOC entirely: no manifest entry, no spine attribute, no file.
    pub fn without_toc(mut self) -> Self {
        self.toc = None;
        self.spine_toc = None;
        self
    }

    pub fn without_container(mut self) -> Self {
        self.with_container = false;
        self
    }

    /// Set or clear the `<spine toc="...">` attribute.
    pub fn spine_toc_attr(mut self, id: Option<&str>) -> Self {
        self.spine_toc = id.map(String::from);
        self
    }

    /// Rename the TOC's manifest id (breaks id-based discovery).
    pub fn toc_item_id(mut self, id: &str) -> Self {
        if let Some(toc) = &mut self.toc {
            toc.id = id.into();
        }
        self
    }

    /// Replace the NCX payload.
    pub fn ncx_content(mut self, xml: &str) -> Self {
        if let Some(toc) = &mut self.toc {
            toc.content = xml.into();
        }
        self
    }

    /// Swap the NCX for an EPUB 3 navigation document.
    pub fn html_nav(mut self, xhtml: &str) -> Self {
        self.toc = Some(TocSpec {
            id: "nav".into(),
            href: "nav.xhtml".into(),
            media_type: "application/xhtml+xml".into(),
            properties: Some("nav".into()),
            content: xhtml.into(),
        });
        self.spine_toc = None;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let mut add = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, path: &str, data: &[u8]| {
            zip.start_file(path, options).expect("start zip entry");
            zip.write_all(data).expect("write zip entry");
        };

        add(&mut zip, "mimetype", b"application/epub+zip");
        if self.with_container {
            add(
                &mut zip,
                "META-INF/container.xml",
                br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            );
        }

        add(&mut zip, "OEBPS/content.opf", self.render_opf().as_bytes());

        for (_, href, html) in &self.sections {
            add(&mut zip, &format!("OEBPS/{href}"), html.as_bytes());
        }
        if let Some(toc) = &self.toc {
            add(&mut zip, &format!("OEBPS/{}", toc.href), toc.content.as_bytes());
        }
        for (path, data) in &self.raw_files {
            add(&mut zip, path, data);
        }

        zip.finish().expect("finish zip").into_inner()
    }

    fn render_opf(&self) -> String {
        let mut items = String::new();
        for (id, href, _) in &self.sections {
            items.push_str(&format!(
                "    <item id=\"{id}\" href=\"{href}\" media-type=\"application/xhtml+xml\"/>\n"
            ));
        }
        for (id, href, media_type) in &self.resources {
            items.push_str(&format!(
                "    <item id=\"{id}\" href=\"{href}\" media-type=\"{media_type}\"/>\n"
            ));
        }
        if let Some(toc) = &self.toc {
            let properties = toc
                .properties
                .as_deref()
                .map(|p| format!(" properties=\"{p}\""))
                .unwrap_or_default();
            items.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
                toc.id, toc.href, toc.media_type, properties
            ));
        }

        let toc_attr = self
            .spine_toc
            .as_deref()
            .map(|id| format!(" toc=\"{id}\""))
            .unwrap_or_default();
        let mut itemrefs = String::new();
        for (id, _, _) in &self.sections {
            itemrefs.push_str(&format!("    <itemref idref=\"{id}\"/>\n"));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
    <dc:creator>Test Author</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{}  </manifest>
  <spine{}>
{}  </spine>
</package>"#,
            self.title, items, toc_attr, itemrefs
        )
    }
}
