//! Benchmarks for the EPUB parsing and conversion pipeline.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use epub2md::Epub;
use epub2md::convert::plan::plan;
use epub2md::convert::{LinkMode, RewriteContext, rewrite_links};
use epub2md::test_fixtures::EpubBuilder;

/// Synthetic book with `chapters` spine sections and a matching NCX.
fn sample_book(chapters: usize) -> Vec<u8> {
    let mut builder = EpubBuilder::minimal();
    let mut nav = String::from(
        r#"<navPoint id="np1" playOrder="1"><navLabel><text>Chapter 1</text></navLabel><content src="text/ch1.html"/></navPoint>
<navPoint id="np2" playOrder="2"><navLabel><text>Chapter 2</text></navLabel><content src="text/ch2.html"/></navPoint>
"#,
    );

    for i in 3..=chapters {
        let href = format!("text/c{i}.html");
        let mut body = format!("<html><body><h1>Chapter {i}</h1>");
        for p in 0..12 {
            body.push_str(&format!(
                "<p>Paragraph {p} with <a href=\"ch1.html#top\">a link</a>, \
                 <em>emphasis</em>, and enough prose to resemble a real chapter.</p>"
            ));
        }
        body.push_str("</body></html>");
        builder = builder.spine_section(&format!("c{i}"), &href, &body);
        nav.push_str(&format!(
            "<navPoint id=\"np{i}\" playOrder=\"{i}\"><navLabel><text>Chapter {i}</text></navLabel><content src=\"{href}\"/></navPoint>\n"
        ));
    }

    let ncx = format!("<?xml version=\"1.0\"?>\n<ncx><navMap>\n{nav}</navMap></ncx>");
    builder.ncx_content(&ncx).build()
}

fn bench_parse_epub(c: &mut Criterion) {
    let bytes = sample_book(40);

    c.bench_function("parse_epub", |b| {
        b.iter(|| Epub::from_bytes(bytes.clone()).unwrap());
    });
}

fn bench_plan_outputs(c: &mut Criterion) {
    let epub = Epub::from_bytes(sample_book(40)).unwrap();

    c.bench_function("plan_outputs", |b| {
        b.iter(|| plan(epub.package(), epub.structure()));
    });
}

fn bench_section_to_markdown(c: &mut Criterion) {
    let mut epub = Epub::from_bytes(sample_book(40)).unwrap();
    let section = epub.section("c20").unwrap();

    c.bench_function("section_to_markdown", |b| {
        b.iter(|| section.to_markdown());
    });
}

fn bench_rewrite_links(c: &mut Criterion) {
    let mut epub = Epub::from_bytes(sample_book(40)).unwrap();
    let markdown = epub.section("c20").unwrap().to_markdown();
    let plan = plan(epub.package(), epub.structure());
    let entry = plan.by_id("c20").unwrap();

    c.bench_function("rewrite_links", |b| {
        b.iter(|| {
            let ctx = RewriteContext {
                package: epub.package(),
                plan: &plan,
                mode: LinkMode::PerFile,
                section_id: &entry.id,
                filename: &entry.filename,
            };
            rewrite_links(&markdown, &ctx)
        });
    });
}

criterion_group!(
    benches,
    bench_parse_epub,
    bench_plan_outputs,
    bench_section_to_markdown,
    bench_rewrite_links,
);
criterion_main!(benches);
