//! Merge assembly: one Markdown document out of many sections.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub(crate) const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Join converted sections into one document.
///
/// Each chapter gets a stable anchor keyed by its manifest id, the target
/// merged-mode links point at.
pub fn assemble(chapters: &[(String, String)]) -> String {
    chapters
        .iter()
        .map(|(id, markdown)| format!("<a id=\"{id}\"></a>\n{markdown}"))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Merged-output filename for a directory or book stem.
pub fn merged_filename(stem: &str, custom: Option<&str>) -> String {
    custom
        .map(String::from)
        .unwrap_or_else(|| format!("{stem}-merged.md"))
}

/// Merge the Markdown files already present in a directory into one file.
///
/// Prefers numbered files (`NN-Title.md`) in numeric order, the layout a
/// conversion run leaves behind. Without any, falls back to all `.md` files
/// except earlier merge outputs, in name order. Returns the path written.
pub fn merge_markdown_dir(directory: &Path, output: Option<&str>) -> Result<PathBuf> {
    let stem = directory
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_name = merged_filename(&stem, output);

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    // read_dir order is platform-defined; fix it before the stable
    // numeric sort so ties stay deterministic
    names.sort();

    let mut numbered: Vec<(u64, &str)> = names
        .iter()
        .filter_map(|name| numeric_prefix(name).map(|n| (n, name.as_str())))
        .collect();
    numbered.sort_by_key(|(n, _)| *n);

    let selected: Vec<&str> = if numbered.is_empty() {
        names
            .iter()
            .filter(|name| {
                name.ends_with(".md")
                    && name.as_str() != output_name
                    && !name.ends_with("-merged.md")
            })
            .map(|name| name.as_str())
            .collect()
    } else {
        numbered.into_iter().map(|(_, name)| name).collect()
    };

    if selected.is_empty() {
        return Err(Error::NoMarkdownFiles(directory.display().to_string()));
    }

    let mut merged = String::new();
    for name in selected {
        if !merged.is_empty() {
            merged.push_str(SECTION_SEPARATOR);
        }
        merged.push_str(&fs::read_to_string(directory.join(name))?);
    }

    let output_path = directory.join(output_name);
    fs::write(&output_path, merged)?;
    Ok(output_path)
}

/// Leading `NN-` counter of a conversion-run filename, if it has one.
fn numeric_prefix(name: &str) -> Option<u64> {
    if !name.ends_with(".md") {
        return None;
    }
    let end = name.find(|c: char| !c.is_ascii_digit())?;
    let (digits, rest) = name.split_at(end);
    if digits.is_empty() || !rest.starts_with('-') {
        return None;
    }
    digits.parse().ok()
}
