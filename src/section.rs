//! Section content and HTML-to-Markdown conversion.

use std::sync::LazyLock;

use regex_lite::Regex;

/// Matches XML declarations
static XML_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s?<\?xml[^>]*\?>\s?").unwrap());

/// Matches DOCTYPE declarations
static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s?<!DOCTYPE[^>]*>\s?").unwrap());

/// Matches newline runs with trailing indent
static NEWLINE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+\s?").unwrap());

/// Strategy for turning section HTML into Markdown.
///
/// The default implementation covers books; callers with special markup
/// (math, custom footnote schemes) plug in their own.
pub trait MarkdownConverter {
    fn convert(&self, html: &str) -> String;
}

impl<F> MarkdownConverter for F
where
    F: Fn(&str) -> String,
{
    fn convert(&self, html: &str) -> String {
        self(html)
    }
}

/// Default converter: prune noise the Markdown engine chokes on, then hand
/// off to html2md.
pub struct DefaultConverter;

impl MarkdownConverter for DefaultConverter {
    fn convert(&self, html: &str) -> String {
        html2md::parse_html(&prune_html(html))
    }
}

/// Strip markup that carries no content: XML declarations, DOCTYPEs,
/// formatting newline runs. Fullwidth punctuation pairs common in CJK
/// books are narrowed so they survive conversion.
pub(crate) fn prune_html(html: &str) -> String {
    let cleaned = html.replace("（）", "()").replace("：：", "::");
    let cleaned = XML_DECL_RE.replace_all(&cleaned, "");
    let cleaned = DOCTYPE_RE.replace_all(&cleaned, "");
    NEWLINE_RUN_RE.replace_all(&cleaned, "\n").into_owned()
}

/// One content document from the spine (or, for non-linear content, the
/// manifest), with its raw HTML.
#[derive(Debug, Clone)]
pub struct Section {
    /// Manifest id.
    pub id: String,
    /// Manifest href, relative to the content root.
    pub href: String,
    /// Raw HTML as stored in the archive.
    pub content: String,
}

impl Section {
    pub fn new(id: String, href: String, content: String) -> Self {
        Section { id, href, content }
    }

    /// Convert to Markdown with the default converter.
    pub fn to_markdown(&self) -> String {
        self.markdown_with(&DefaultConverter)
    }

    /// Convert to Markdown with a caller-supplied converter.
    pub fn markdown_with(&self, converter: &dyn MarkdownConverter) -> String {
        converter.convert(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_html_strips_declarations() {
        let html = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE html>\n<html><body><p>Hi</p></body></html>";
        let pruned = prune_html(html);
        assert!(!pruned.contains("<?xml"));
        assert!(!pruned.contains("DOCTYPE"));
        assert!(pruned.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_prune_html_narrows_fullwidth_pairs() {
        assert_eq!(prune_html("fn（）"), "fn()");
        assert_eq!(prune_html("a：：b"), "a::b");
    }

    #[test]
    fn test_prune_html_collapses_newline_runs() {
        let pruned = prune_html("<p>a</p>\n\n\n   <p>b</p>");
        assert_eq!(pruned, "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn test_default_converter() {
        let section = Section::new(
            "ch1".into(),
            "text/ch1.html".into(),
            "<html><body><h1>Hello</h1><p>Some <strong>bold</strong> text.</p></body></html>"
                .into(),
        );
        let md = section.to_markdown();
        assert!(md.contains("Hello"));
        assert!(md.contains("**bold**"));
    }

    #[test]
    fn test_custom_converter_via_closure() {
        let section = Section::new("ch1".into(), "ch1.html".into(), "<p>x</p>".into());
        let upper = |html: &str| html.to_uppercase();
        assert_eq!(section.markdown_with(&upper), "<P>X</P>");
    }
}
