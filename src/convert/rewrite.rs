//! Markdown link rewriting.
//!
//! Runs over already-converted Markdown, after the whole output plan is
//! known, and repoints every image and internal link at its planned output
//! location. Broken references degrade to the original URL; a bad link must
//! never cost a chapter.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::plan::{EntryKind, Plan};
use crate::link::{Href, is_remote};
use crate::package::Package;

/// Matches Markdown images and inline links in one pass; the optional
/// leading `!` is captured instead of excluded by lookbehind.
static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[([^\]]*)\]\(([^)]+)\)").unwrap());

/// How rewritten links address their targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Every section is its own file; targets are relative paths.
    PerFile,
    /// One merged document; targets are per-section anchors.
    Merged,
}

/// The section being rewritten, plus the lookups rewriting needs.
pub struct RewriteContext<'a> {
    pub package: &'a Package,
    pub plan: &'a Plan,
    pub mode: LinkMode,
    /// Manifest id of the current section.
    pub section_id: &'a str,
    /// Planned filename of the current section.
    pub filename: &'a str,
}

/// Rewritten Markdown plus the remote images encountered on the way.
pub struct Rewritten {
    pub markdown: String,
    /// Remote image URLs in document order, for the localizer.
    pub remote_images: Vec<String>,
}

pub fn rewrite_links(markdown: &str, ctx: &RewriteContext<'_>) -> Rewritten {
    let mut remote_images = Vec::new();

    let markdown = MD_LINK_RE
        .replace_all(markdown, |caps: &regex_lite::Captures| {
            let text = &caps[2];
            let url = &caps[3];
            if &caps[1] == "!" {
                format!("![{text}]({})", rewrite_image(url, &mut remote_images))
            } else {
                format!("[{text}]({})", rewrite_link(url, ctx))
            }
        })
        .into_owned();

    Rewritten {
        markdown,
        remote_images,
    }
}

/// Every image ends up under `images/`, so every image URL points there.
/// Remote originals are recorded so the localizer can fetch them into that
/// same directory.
fn rewrite_image(url: &str, remote: &mut Vec<String>) -> String {
    if url.starts_with("data:") {
        return url.to_string();
    }
    if is_remote(url) {
        remote.push(url.to_string());
    }
    format!("./images/{}", image_filename(url))
}

/// Basename an image URL is stored under on disk: decoded, query stripped.
pub(crate) fn image_filename(url: &str) -> String {
    let path = url.split_once('?').map(|(p, _)| p).unwrap_or(url);
    Href::parse(path).filename()
}

fn rewrite_link(url: &str, ctx: &RewriteContext<'_>) -> String {
    if is_remote(url) || url.starts_with("mailto:") {
        return url.to_string();
    }

    // Anchor within the current section
    if let Some(fragment) = url.strip_prefix('#') {
        return match ctx.mode {
            LinkMode::Merged => format!("#{}", ctx.section_id),
            LinkMode::PerFile => format!("./{}#{fragment}", ctx.filename),
        };
    }

    let href = Href::parse(url);
    let Some(target_id) = ctx.package.resolve_item_id(url) else {
        return url.to_string();
    };
    let Some(entry) = ctx.plan.by_id(&target_id) else {
        return url.to_string();
    };

    match entry.kind {
        EntryKind::Markdown => match ctx.mode {
            LinkMode::Merged => format!("#{target_id}"),
            LinkMode::PerFile => match &href.hash {
                Some(fragment) => format!("./{}#{fragment}", entry.filename),
                None => format!("./{}", entry.filename),
            },
        },
        // Non-HTML targets have no merged anchor; both modes link the file
        EntryKind::Image => format!("./images/{}", entry.filename),
        EntryKind::Other => format!("./static/{}", entry.filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::plan::plan;
    use crate::package::{Package, parse_package};
    use crate::toc::parse_toc;

    fn fixture() -> (Package, Vec<crate::toc::TocNode>) {
        let package = parse_package(
            r#"<package>
  <metadata><dc:title>T</dc:title></metadata>
  <manifest>
    <item id="ch1" href="text/ch1.html" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.html" media-type="application/xhtml+xml"/>
    <item id="cover-img" href="images/cover.png" media-type="image/png"/>
    <item id="toc" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
  </manifest>
  <spine toc="toc">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#,
        )
        .expect("package");
        let toc = parse_toc(
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
            &package,
        )
        .expect("toc");
        (package, toc)
    }

    fn ctx<'a>(
        package: &'a Package,
        plan: &'a Plan,
        mode: LinkMode,
    ) -> RewriteContext<'a> {
        RewriteContext {
            package,
            plan,
            mode,
            section_id: "ch1",
            filename: "1-Chapter_One.md",
        }
    }

    #[test]
    fn test_cross_document_link_per_file() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "See [next](ch2.html#sec2).",
            &ctx(&package, &plan, LinkMode::PerFile),
        );
        assert_eq!(out.markdown, "See [next](./2-Chapter_Two.md#sec2).");
    }

    #[test]
    fn test_cross_document_link_merged() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "See [next](ch2.html#sec2).",
            &ctx(&package, &plan, LinkMode::Merged),
        );
        // Merged links jump to the section anchor; the inner fragment has no
        // corresponding anchor in the merged document
        assert_eq!(out.markdown, "See [next](#ch2).");
    }

    #[test]
    fn test_cross_document_link_without_fragment() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "[two](../text/ch2.html)",
            &ctx(&package, &plan, LinkMode::PerFile),
        );
        assert_eq!(out.markdown, "[two](./2-Chapter_Two.md)");
    }

    #[test]
    fn test_anchor_only_link() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);

        let per_file = rewrite_links("[note](#fn1)", &ctx(&package, &plan, LinkMode::PerFile));
        assert_eq!(per_file.markdown, "[note](./1-Chapter_One.md#fn1)");

        let merged = rewrite_links("[note](#fn1)", &ctx(&package, &plan, LinkMode::Merged));
        assert_eq!(merged.markdown, "[note](#ch1)");
    }

    #[test]
    fn test_internal_image() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "![cover](../images/cover.png)",
            &ctx(&package, &plan, LinkMode::PerFile),
        );
        assert_eq!(out.markdown, "![cover](./images/cover.png)");
        assert!(out.remote_images.is_empty());
    }

    #[test]
    fn test_remote_image_is_collected_and_repointed() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "![fig](https://example.com/figs/plot.png?v=2)",
            &ctx(&package, &plan, LinkMode::PerFile),
        );
        assert_eq!(out.markdown, "![fig](./images/plot.png)");
        assert_eq!(
            out.remote_images,
            vec!["https://example.com/figs/plot.png?v=2"]
        );
    }

    #[test]
    fn test_data_uri_image_untouched() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let md = "![dot](data:image/png;base64,iVBORw==)";
        let out = rewrite_links(md, &ctx(&package, &plan, LinkMode::PerFile));
        assert_eq!(out.markdown, md);
    }

    #[test]
    fn test_remote_link_untouched() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let md = "[home](https://example.com/page)";
        let out = rewrite_links(md, &ctx(&package, &plan, LinkMode::PerFile));
        assert_eq!(out.markdown, md);
    }

    #[test]
    fn test_unresolvable_link_degrades() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let md = "[ghost](missing.html#x)";
        let out = rewrite_links(md, &ctx(&package, &plan, LinkMode::PerFile));
        assert_eq!(out.markdown, md);
    }

    #[test]
    fn test_link_to_manifest_image() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "[the cover](images/cover.png)",
            &ctx(&package, &plan, LinkMode::Merged),
        );
        assert_eq!(out.markdown, "[the cover](./images/cover.png)");
    }

    #[test]
    fn test_image_and_link_in_one_line() {
        let (package, toc) = fixture();
        let plan = plan(&package, &toc);
        let out = rewrite_links(
            "![i](pic.jpg) and [l](ch2.html)",
            &ctx(&package, &plan, LinkMode::PerFile),
        );
        assert_eq!(
            out.markdown,
            "![i](./images/pic.jpg) and [l](./2-Chapter_Two.md)"
        );
    }

    #[test]
    fn test_image_filename() {
        assert_eq!(image_filename("https://e.com/a/pic.png?v=1"), "pic.png");
        assert_eq!(image_filename("../images/my%20pic.png"), "my pic.png");
        assert_eq!(image_filename("plain.gif"), "plain.gif");
    }
}
