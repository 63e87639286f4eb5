//! EPUB to Markdown conversion.
//!
//! Conversion is a two-pass affair. The first pass plans every output path
//! from the manifest and TOC alone; the second converts sections and
//! rewrites their links against the completed plan, so forward references
//! resolve no matter which section is processed first.

#[cfg(feature = "localize")]
pub mod images;
pub mod merge;
pub mod plan;
pub mod rewrite;

pub use merge::{assemble, merge_markdown_dir, merged_filename};
pub use plan::{EntryKind, Plan, PlanEntry};
pub use rewrite::{LinkMode, RewriteContext, Rewritten, rewrite_links};

use std::fs;
use std::path::{Path, PathBuf};

use crate::epub::Epub;
use crate::error::Result;
use crate::section::{DefaultConverter, MarkdownConverter};

/// What a conversion run should produce.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// One merged document instead of a file per section.
    pub merge: bool,
    /// Download remote images into `images/`.
    pub localize: bool,
    /// Also extract non-content assets under `static/`.
    pub unzip: bool,
    /// Output directory; defaults to the input path minus its extension.
    pub out_dir: Option<PathBuf>,
    /// Merged-output filename override.
    pub merged_filename: Option<String>,
}

/// What a conversion run did produce.
#[derive(Debug, Default)]
pub struct RunReport {
    pub out_dir: PathBuf,
    pub markdown_files: usize,
    pub images: usize,
    pub static_files: usize,
    pub localized_images: usize,
    pub merged_path: Option<PathBuf>,
}

/// Convert the EPUB at `path` with default options.
pub fn convert<P: AsRef<Path>>(path: P) -> Result<RunReport> {
    Converter::open(path, RunOptions::default())?.run()
}

/// Drives one EPUB through planning, conversion and writing.
pub struct Converter {
    epub: Epub,
    options: RunOptions,
    default_out: PathBuf,
    stem: String,
}

impl Converter {
    pub fn open<P: AsRef<Path>>(path: P, options: RunOptions) -> Result<Converter> {
        let path = path.as_ref();
        let epub = Epub::open(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "book".to_string());
        let default_out = path.with_extension("");
        Ok(Converter {
            epub,
            options,
            default_out,
            stem,
        })
    }

    pub fn epub(&self) -> &Epub {
        &self.epub
    }

    /// Convert with the default HTML-to-Markdown converter.
    pub fn run(&mut self) -> Result<RunReport> {
        self.run_with(&DefaultConverter)
    }

    /// Convert with a caller-supplied converter.
    ///
    /// Structural failures abort; a single unreadable or empty section is
    /// logged and skipped so the rest of the book still converts.
    pub fn run_with(&mut self, converter: &dyn MarkdownConverter) -> Result<RunReport> {
        let out_dir = self
            .options
            .out_dir
            .clone()
            .unwrap_or_else(|| self.default_out.clone());
        let plan = plan::plan(self.epub.package(), self.epub.structure());
        let mode = if self.options.merge {
            LinkMode::Merged
        } else {
            LinkMode::PerFile
        };

        fs::create_dir_all(&out_dir)?;

        let mut report = RunReport {
            out_dir: out_dir.clone(),
            ..RunReport::default()
        };
        let mut chapters: Vec<(String, String)> = Vec::new();
        let mut remote_images: Vec<String> = Vec::new();

        for entry in &plan.entries {
            match entry.kind {
                EntryKind::Markdown => {
                    let section = match self.epub.section(&entry.id) {
                        Ok(section) => section,
                        Err(e) => {
                            log::warn!("skipping section {}: {e}", entry.id);
                            continue;
                        }
                    };
                    let markdown = section.markdown_with(converter);
                    let markdown = markdown.trim();
                    if markdown.is_empty() {
                        log::debug!("section {} converted to nothing, dropped", entry.id);
                        continue;
                    }

                    let ctx = RewriteContext {
                        package: self.epub.package(),
                        plan: &plan,
                        mode,
                        section_id: &entry.id,
                        filename: &entry.filename,
                    };
                    let rewritten = rewrite_links(markdown, &ctx);
                    remote_images.extend(rewritten.remote_images);

                    if self.options.merge {
                        chapters.push((entry.id.clone(), rewritten.markdown));
                    } else {
                        fs::write(out_dir.join(&entry.filename), rewritten.markdown)?;
                    }
                    report.markdown_files += 1;
                }
                EntryKind::Image => match self.epub.read_item(&entry.href) {
                    Ok(bytes) if !bytes.is_empty() => {
                        let dir = out_dir.join("images");
                        fs::create_dir_all(&dir)?;
                        fs::write(dir.join(&entry.filename), bytes)?;
                        report.images += 1;
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("skipping image {}: {e}", entry.href),
                },
                EntryKind::Other => {
                    if !self.options.unzip {
                        continue;
                    }
                    match self.epub.read_item(&entry.href) {
                        Ok(bytes) if !bytes.is_empty() => {
                            let dir = out_dir.join("static");
                            fs::create_dir_all(&dir)?;
                            fs::write(dir.join(&entry.filename), bytes)?;
                            report.static_files += 1;
                        }
                        Ok(_) => {}
                        Err(e) => log::warn!("skipping file {}: {e}", entry.href),
                    }
                }
            }
        }

        if self.options.merge && !chapters.is_empty() {
            let name = merged_filename(&self.stem, self.options.merged_filename.as_deref());
            let path = out_dir.join(name);
            fs::write(&path, assemble(&chapters))?;
            report.merged_path = Some(path);
        }

        self.localize_or_warn(&remote_images, &out_dir, &mut report);

        log::info!(
            "wrote {} markdown files and {} images to {}",
            report.markdown_files,
            report.images,
            out_dir.display()
        );
        Ok(report)
    }

    fn localize_or_warn(&self, remote: &[String], out_dir: &Path, report: &mut RunReport) {
        if remote.is_empty() {
            return;
        }
        if !self.options.localize {
            log::warn!(
                "Remote images are detected, you can set --localize to true to localize the remote images"
            );
            return;
        }
        #[cfg(feature = "localize")]
        match images::localize_images(remote, &out_dir.join("images")) {
            Ok(count) => report.localized_images = count,
            Err(e) => log::error!("failed to localize images: {e}"),
        }
        #[cfg(not(feature = "localize"))]
        {
            let _ = (out_dir, report);
            log::warn!("this build lacks the localize feature; remote images were not downloaded");
        }
    }
}
