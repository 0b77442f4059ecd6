//! The single live document and everything derived from it

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::epub::{EpubBook, load_epub};
use crate::error::{FolioError, Result};
use crate::navigation::{Command, DocumentKind, Effect, Navigator, Orientation};
use crate::pdf::{
    Bitmap, CacheKey, ContinuousView, LastRender, PasswordPrompt, PdfDocument, PdfEngine, Viewport,
    load_pdf,
};
use crate::settings::{InitialZoom, Settings};

/// Construction-time configuration of a [`Session`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOptions {
    pub viewport: Viewport,
    pub initial_zoom: InitialZoom,
    pub base_font_size: u16,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            initial_zoom: InitialZoom::default(),
            base_font_size: 16,
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings, viewport: Viewport) -> Self {
        Self {
            viewport,
            initial_zoom: settings.initial_zoom,
            base_font_size: settings.font_size,
        }
    }
}

/// What is known about the open document independently of its kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    pub kind: DocumentKind,
    pub path: PathBuf,
    /// File name; bookmarks and highlights are keyed by it
    pub title: String,
    /// Title from the document metadata, when it has one
    pub display_title: Option<String>,
    pub page_count: usize,
}

enum Loaded {
    Pdf(PdfDocument),
    Epub(EpubBook),
}

/// What the front end should draw for the current state
pub enum Frame<'a> {
    Empty,
    /// Single page or spread. `None` when rendering failed.
    Page(Option<Arc<Bitmap>>),
    /// Every page (or spread) top to bottom
    Continuous(&'a [Bitmap]),
    Html { markup: &'a str, font_size: u16 },
}

pub struct Session {
    engine: Box<dyn PdfEngine>,
    options: SessionOptions,
    document: Option<(DocumentInfo, Loaded)>,
    navigator: Navigator,
    continuous: ContinuousView,
    last_render: LastRender,
}

impl Session {
    pub fn new(engine: Box<dyn PdfEngine>, options: SessionOptions) -> Self {
        let mut navigator = Navigator::default();
        navigator.set_base_font_size(options.base_font_size);
        Self {
            engine,
            options,
            document: None,
            navigator,
            continuous: ContinuousView::default(),
            last_render: LastRender::default(),
        }
    }

    #[must_use]
    pub fn document(&self) -> Option<&DocumentInfo> {
        self.document.as_ref().map(|(info, _)| info)
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Viewport used to fit the next opened PDF
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.options.viewport = viewport;
    }

    /// Staging directory of the open EPUB
    #[must_use]
    pub fn staging_path(&self) -> Option<&Path> {
        match &self.document {
            Some((_, Loaded::Epub(book))) => Some(book.staging_path()),
            _ => None,
        }
    }

    /// Open a PDF or EPUB, chosen by extension.
    ///
    /// Unsupported files are rejected before anything else happens. Otherwise
    /// the current document is released first, so a failed load leaves the
    /// session empty.
    pub fn open(
        &mut self,
        path: &Path,
        password: Option<PasswordPrompt<'_>>,
    ) -> Result<&DocumentInfo> {
        let kind = document_kind(path)?;
        self.close();

        let title = document_title(path);

        let (loaded, page_count, zoom, display_title) = match kind {
            DocumentKind::Pdf => {
                let doc = load_pdf(self.engine.as_ref(), path, password)?;
                let zoom = doc.initial_zoom(self.options.viewport, self.options.initial_zoom);
                let count = doc.page_count();
                (Loaded::Pdf(doc), count, zoom, None)
            }
            DocumentKind::Epub => {
                let book = load_epub(path)?;
                let count = book.page_count();
                let display = book.title.clone();
                (Loaded::Epub(book), count, 1.0, display)
            }
        };

        self.navigator.reset(kind, page_count, zoom);
        info!(
            "Loaded {kind:?} {title:?}: {page_count} pages, zoom {:.2}",
            self.navigator.zoom()
        );

        let info = DocumentInfo {
            kind,
            path: path.to_path_buf(),
            title,
            display_title,
            page_count,
        };
        let (info, _) = self.document.insert((info, loaded));
        Ok(&*info)
    }

    /// Release the open document, if any
    pub fn close(&mut self) {
        self.continuous.clear();
        self.last_render.invalidate();
        let Some((info, loaded)) = self.document.take() else {
            return;
        };
        match loaded {
            Loaded::Pdf(doc) => drop(doc),
            Loaded::Epub(book) => book.release(),
        }
        self.navigator.reset(DocumentKind::Pdf, 0, 1.0);
        debug!("Closed {:?}", info.path);
    }

    /// Apply a navigation or zoom command
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        let effects = self.navigator.apply(cmd);
        if effects.contains(&Effect::ContinuousStale) {
            self.continuous.mark_stale();
        }
        effects
    }

    /// Frame for the current state. Builds the continuous layout if it is
    /// being shown and is stale.
    pub fn frame(&mut self) -> Frame<'_> {
        let Some((_, loaded)) = &self.document else {
            return Frame::Empty;
        };
        let nav = &self.navigator;
        match loaded {
            Loaded::Epub(book) => match book.pages.get(nav.current_index()) {
                Some(markup) => Frame::Html {
                    markup,
                    font_size: nav.font_size(),
                },
                None => Frame::Empty,
            },
            Loaded::Pdf(doc) => {
                let spread = nav.orientation() == Orientation::Spread;
                if nav.is_continuous() {
                    return Frame::Continuous(self.continuous.ensure_built(doc, spread, nav.zoom()));
                }

                let key = CacheKey::new(nav.current_index(), nav.zoom(), spread);
                if let Some(cached) = self.last_render.get(&key) {
                    return Frame::Page(cached);
                }
                let bitmap = if spread {
                    doc.render_spread(key.page, nav.zoom())
                } else {
                    doc.render_page(key.page, nav.zoom())
                };
                if bitmap.is_none() {
                    warn!("Page {} is shown blank", key.page + 1);
                }
                Frame::Page(self.last_render.insert(key, bitmap))
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Key under which annotations of the document at `path` are stored
pub fn document_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Kind of document at `path`, by extension
pub fn document_kind(path: &Path) -> Result<DocumentKind> {
    if path.as_os_str().is_empty() {
        return Err(FolioError::NoFile);
    }
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        "epub" => Ok(DocumentKind::Epub),
        _ => Err(FolioError::UnsupportedFormat { extension }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert_eq!(document_kind(Path::new("a/B.PDF")).unwrap(), DocumentKind::Pdf);
        assert_eq!(document_kind(Path::new("book.Epub")).unwrap(), DocumentKind::Epub);
    }

    #[test]
    fn unsupported_and_missing_paths() {
        assert!(matches!(
            document_kind(Path::new("notes.txt")),
            Err(FolioError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            document_kind(Path::new("")),
            Err(FolioError::NoFile)
        ));
    }
}
