//! # epub2md
//!
//! A fast, lightweight library for converting EPUB ebooks to Markdown.
//!
//! ## Features
//!
//! - Reads EPUB 2/3 containers, package documents, and navigation (NCX or HTML nav)
//! - Converts each section to Markdown, one file per section or merged into one
//! - Rewrites internal links and image references to point at the converted files
//! - Optionally downloads remote images next to the output
//!
//! ## Quick Start
//!
//! ```no_run
//! // Convert book.epub into book/ with one Markdown file per section
//! let report = epub2md::convert("book.epub").unwrap();
//! println!("wrote {} markdown files", report.markdown_files);
//! ```
//!
//! [`Converter`] exposes the knobs the one-call form hides:
//!
//! ```no_run
//! use epub2md::{Converter, RunOptions};
//!
//! let options = RunOptions {
//!     merge: true,
//!     localize: true,
//!     ..RunOptions::default()
//! };
//! let report = Converter::open("book.epub", options).unwrap().run().unwrap();
//! ```
//!
//! ## Inspecting a Book
//!
//! [`Epub`] gives direct access to metadata, navigation, and individual
//! sections without writing anything to disk:
//!
//! ```no_run
//! use epub2md::{Epub, iter_toc};
//!
//! let mut epub = Epub::open("book.epub").unwrap();
//! println!("{:?}", epub.metadata().title);
//! for node in iter_toc(epub.structure()) {
//!     println!("{}", node.name);
//! }
//! let markdown = epub.section("chapter1").unwrap().to_markdown();
//! ```

pub mod archive;
pub mod container;
pub mod convert;
pub mod epub;
pub mod error;
pub mod link;
pub mod package;
pub mod section;
pub mod toc;
pub(crate) mod xml;

#[doc(hidden)]
pub mod test_fixtures;

pub use convert::{Converter, RunOptions, RunReport, convert};
pub use epub::Epub;
pub use error::{Error, Result};
pub use link::Href;
pub use package::{ManifestItem, Metadata, Package};
pub use section::{MarkdownConverter, Section};
pub use toc::{TocNode, find_by_section_id, iter_toc};
