//! epub2md - EPUB to Markdown converter

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use epub2md::convert::merge_markdown_dir;
use epub2md::{Converter, Epub, RunOptions};

#[derive(Parser)]
#[command(name = "epub2md")]
#[command(version, about = "Convert EPUB books to Markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub2md book.epub               Convert into book/, one file per section
    epub2md -m book.epub            Convert into a single merged document
    epub2md -m -o all.md exported/  Merge already-exported NN-*.md files
    epub2md --info book.epub        Show package metadata as JSON")]
struct Cli {
    /// EPUB file(s), or a directory of exported .md files with --merge
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Produce one merged Markdown document
    #[arg(short, long)]
    merge: bool,

    /// Download remote images next to the output
    #[arg(short, long)]
    localize: bool,

    /// Also extract non-HTML, non-image assets under static/
    #[arg(short, long)]
    unzip: bool,

    /// Merged output filename (default <name>-merged.md)
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Show package metadata as JSON without converting
    #[arg(long)]
    info: bool,

    /// Show the table of contents as JSON without converting
    #[arg(long)]
    structure: bool,

    /// Show spine-ordered section ids and paths as JSON without converting
    #[arg(long)]
    sections: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut failed = false;
    for path in &cli.paths {
        if let Err(e) = run_one(path, &cli) {
            eprintln!("error: {}: {e}", path.display());
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_one(path: &Path, cli: &Cli) -> Result<(), String> {
    if cli.info || cli.structure || cli.sections {
        return inspect(path, cli);
    }

    if cli.merge && path.is_dir() {
        let merged = merge_markdown_dir(path, cli.output.as_deref()).map_err(|e| e.to_string())?;
        println!("merged {}", merged.display());
        return Ok(());
    }

    let options = RunOptions {
        merge: cli.merge,
        localize: cli.localize,
        unzip: cli.unzip,
        out_dir: None,
        merged_filename: cli.output.clone(),
    };
    let report = Converter::open(path, options)
        .map_err(|e| e.to_string())?
        .run()
        .map_err(|e| e.to_string())?;

    match &report.merged_path {
        Some(merged) => println!("converted {} -> {}", path.display(), merged.display()),
        None => println!(
            "converted {} -> {} ({} files)",
            path.display(),
            report.out_dir.display(),
            report.markdown_files + report.images + report.static_files
        ),
    }
    Ok(())
}

fn inspect(path: &Path, cli: &Cli) -> Result<(), String> {
    let epub = Epub::open(path).map_err(|e| e.to_string())?;

    if cli.info {
        let json = serde_json::to_string_pretty(epub.metadata()).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    if cli.structure {
        let json = serde_json::to_string_pretty(epub.structure()).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    if cli.sections {
        let package = epub.package();
        let sections: Vec<_> = package
            .spine
            .iter()
            .filter_map(|id| package.item(id))
            .map(|item| serde_json::json!({ "id": item.id, "href": item.href }))
            .collect();
        let json = serde_json::to_string_pretty(&sections).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    Ok(())
}
