//! Remote image localization.
//!
//! The rewriter repoints remote image URLs at `images/` regardless; this
//! module makes those paths real by fetching the originals. Downloads fan
//! out over a small fixed pool of worker threads pulling from a shared
//! index. One bad URL costs one image, nothing else.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::rewrite::image_filename;
use crate::error::{Error, Result};

const WORKER_CAP: usize = 4;
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Download the collected remote images into `images_dir`.
///
/// URLs mapping to a file already on disk are skipped, so re-running a
/// conversion does not re-fetch. A failed download is logged and dropped.
/// Returns the number of files actually written.
pub fn localize_images(urls: &[String], images_dir: &Path) -> Result<usize> {
    if urls.is_empty() {
        return Ok(0);
    }
    std::fs::create_dir_all(images_dir)?;

    let mut seen = std::collections::HashSet::new();
    let mut pending: Vec<&str> = Vec::new();
    for url in urls {
        let filename = image_filename(url);
        if filename.is_empty() || !seen.insert(filename.clone()) {
            continue;
        }
        if images_dir.join(&filename).exists() {
            log::debug!("image {filename} already localized, skipping");
            continue;
        }
        pending.push(url);
    }
    if pending.is_empty() {
        return Ok(0);
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()?;

    let written = AtomicUsize::new(0);
    let next = AtomicUsize::new(0);
    let worker_count = WORKER_CAP.min(pending.len());

    std::thread::scope(|scope| {
        let pending = &pending;
        let client = &client;
        let written = &written;
        let next = &next;
        for _ in 0..worker_count {
            scope.spawn(move || {
                loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(url) = pending.get(idx) else {
                        break;
                    };
                    match fetch_one(client, url, images_dir) {
                        Ok(()) => {
                            written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => log::warn!("{e}"),
                    }
                }
            });
        }
    });

    Ok(written.load(Ordering::Relaxed))
}

fn fetch_one(client: &reqwest::blocking::Client, url: &str, images_dir: &Path) -> Result<()> {
    let response = client.get(url).send().map_err(|e| Error::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            reason: format!("status {}", response.status()),
        });
    }
    let bytes = response.bytes().map_err(|e| Error::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    std::fs::write(images_dir.join(image_filename(url)), &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_urls_is_a_noop() {
        let dir = TempDir::new().expect("tempdir");
        let count = localize_images(&[], dir.path()).expect("localize");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_existing_files_are_not_refetched() {
        let dir = TempDir::new().expect("tempdir");
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).expect("mkdir");
        std::fs::write(images.join("plot.png"), b"cached").expect("write");

        // Duplicates collapse onto the same target file; nothing is pending,
        // so no network traffic happens at all
        let urls = vec![
            "https://example.com/figs/plot.png?v=1".to_string(),
            "https://example.com/other/plot.png".to_string(),
        ];
        let count = localize_images(&urls, &images).expect("localize");
        assert_eq!(count, 0);
        assert_eq!(
            std::fs::read(images.join("plot.png")).expect("read"),
            b"cached"
        );
    }
}
