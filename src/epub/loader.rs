use std::path::{Component, Path};

use epub::doc::EpubDoc;
use log::{debug, info, warn};

use super::rewrite::rewrite_image_sources;
use super::staging::StagingDir;
use crate::error::{FolioError, Result};

/// Shown when a book has no readable spine documents
pub const NO_CONTENT_PAGE: &str = "<h3>No readable content found.</h3>";

/// An unpacked EPUB: one resolved HTML string per spine document
#[derive(Debug)]
pub struct EpubBook {
    pub pages: Vec<String>,
    /// `dc:title` from the package metadata, if any
    pub title: Option<String>,
    staging: StagingDir,
}

impl EpubBook {
    #[must_use]
    pub fn staging_path(&self) -> &Path {
        self.staging.path()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Remove the unpacked files
    pub fn release(self) {
        self.staging.release();
    }
}

/// Unpack `path` into a fresh staging directory and resolve every chapter.
///
/// The staging directory is removed again if loading fails part way.
pub fn load_epub(path: &Path) -> Result<EpubBook> {
    let mut doc = EpubDoc::new(path).map_err(|e| FolioError::load(path, e))?;
    let staging = StagingDir::create()?;

    let resources = doc.resources.clone();
    let mut unpacked = 0usize;
    for (id, item) in &resources {
        let Some((bytes, _mime)) = doc.get_resource(id) else {
            warn!("Manifest item {id} ({:?}) is missing from the archive", item.path);
            continue;
        };
        if staging.write(&item.path, &bytes)?.is_some() {
            unpacked += 1;
        }
    }
    debug!("Unpacked {unpacked} of {} manifest items", resources.len());

    let spine: Vec<String> = doc.spine.iter().map(|s| s.idref.clone()).collect();
    let mut pages = Vec::with_capacity(spine.len());
    for idref in &spine {
        let Some(item) = resources.get(idref) else {
            warn!("Spine references unknown manifest id {idref}");
            continue;
        };
        if !is_html(&item.mime) {
            debug!("Skipping non-HTML spine item {idref} ({})", item.mime);
            continue;
        }
        let Some((bytes, _)) = doc.get_resource(idref) else {
            continue;
        };
        let html = String::from_utf8_lossy(&bytes);
        let archive_path = archive_path(&item.path);
        pages.push(rewrite_image_sources(&html, &archive_path, staging.path())?);
    }

    if pages.is_empty() {
        warn!("{path:?} has no readable spine documents");
        pages.push(NO_CONTENT_PAGE.to_string());
    }

    let title = doc.mdata("title").map(|m| m.value.clone());
    info!("Opened EPUB {path:?} with {} pages", pages.len());
    Ok(EpubBook {
        pages,
        title,
        staging,
    })
}

fn is_html(mime: &str) -> bool {
    matches!(mime, "application/xhtml+xml" | "text/html")
}

/// Manifest path as a `/`-separated archive path
fn archive_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_path_uses_forward_slashes() {
        let path: std::path::PathBuf = ["OEBPS", "text", "c1.xhtml"].iter().collect();
        assert_eq!(archive_path(&path), "OEBPS/text/c1.xhtml");
    }

    #[test]
    fn html_mime_types() {
        assert!(is_html("application/xhtml+xml"));
        assert!(is_html("text/html"));
        assert!(!is_html("image/png"));
        assert!(!is_html("application/x-dtbncx+xml"));
    }
}
