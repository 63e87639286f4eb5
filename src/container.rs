//! META-INF/container.xml resolution.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::xml::{attr, local_name};

/// Location of the package document inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Archive path of the OPF package document.
    pub opf_path: String,
    /// Directory prefix for hrefs relative to the package document. Carries
    /// a trailing slash; empty when the OPF sits at the archive top level.
    pub content_root: String,
}

/// Parse `META-INF/container.xml`, yielding the OPF path and the content
/// root all relative hrefs are resolved against.
pub fn parse_container(content: &str) -> Result<Container> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(opf_path) = attr(&e, b"full-path") {
                    let content_root = content_root_of(&opf_path);
                    return Ok(Container {
                        opf_path,
                        content_root,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "no rootfile found in container.xml".into(),
    ))
}

fn content_root_of(opf_path: &str) -> String {
    match opf_path.rsplit_once('/') {
        None => String::new(),
        Some((dir, _)) => {
            let dir = dir.strip_prefix('/').unwrap_or(dir);
            if dir.is_empty() {
                String::new()
            } else {
                format!("{dir}/")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container() {
        let xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
        let container = parse_container(xml).expect("parse container");
        assert_eq!(container.opf_path, "OEBPS/content.opf");
        assert_eq!(container.content_root, "OEBPS/");
    }

    #[test]
    fn test_top_level_opf_has_empty_root() {
        let xml = r#"<container><rootfiles>
            <rootfile full-path="content.opf"/>
        </rootfiles></container>"#;
        let container = parse_container(xml).expect("parse container");
        assert_eq!(container.opf_path, "content.opf");
        assert_eq!(container.content_root, "");
    }

    #[test]
    fn test_leading_slash_stripped_from_root() {
        let xml = r#"<container><rootfiles>
            <rootfile full-path="/EPUB/package.opf"/>
        </rootfiles></container>"#;
        let container = parse_container(xml).expect("parse container");
        assert_eq!(container.content_root, "EPUB/");
    }

    #[test]
    fn test_missing_rootfile_is_invalid() {
        let xml = "<container><rootfiles/></container>";
        match parse_container(xml) {
            Err(Error::InvalidEpub(_)) => {}
            other => panic!("expected InvalidEpub, got {other:?}"),
        }
    }
}
