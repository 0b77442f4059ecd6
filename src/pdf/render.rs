//! Opening PDFs and turning their pages into bitmaps

use std::path::Path;

use log::{debug, error, info, warn};

use super::bitmap::{self, Bitmap};
use super::engine::{EngineFault, PdfEngine, PdfHandle};
use super::zoom::{Zoom, round2};
use crate::error::{FolioError, Result};
use crate::settings::InitialZoom;

/// Asks the user for a document password. `None` means cancelled.
pub type PasswordPrompt<'a> = &'a mut dyn FnMut() -> Option<String>;

/// Size of the area pages are fitted into, in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Below this a viewport is considered not laid out yet
    const MIN_USABLE: u32 = 100;
    const FALLBACK: Viewport = Viewport {
        width: 1000,
        height: 800,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions to fit against, substituting the fallback for unusable ones
    pub fn effective(self) -> (f32, f32) {
        let width = if self.width < Self::MIN_USABLE {
            Self::FALLBACK.width
        } else {
            self.width
        };
        let height = if self.height < Self::MIN_USABLE {
            Self::FALLBACK.height
        } else {
            self.height
        };
        (width as f32, height as f32)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// An open, authenticated PDF
pub struct PdfDocument {
    handle: Box<dyn PdfHandle>,
    page_count: usize,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .finish_non_exhaustive()
    }
}

/// Open `path` with `engine`, prompting for a password when the document is
/// encrypted. The handle is closed before any error is returned.
pub fn load_pdf(
    engine: &dyn PdfEngine,
    path: &Path,
    password: Option<PasswordPrompt<'_>>,
) -> Result<PdfDocument> {
    let mut handle = engine
        .open(path)
        .map_err(|e| FolioError::load(path, e))?;

    let page_count = match unlock(handle.as_mut(), path, password)
        .and_then(|()| handle.page_count().map_err(|e| FolioError::load(path, e)))
    {
        Ok(count) => count,
        Err(e) => {
            drop(handle);
            debug!("Closed {path:?} after failed load");
            return Err(e);
        }
    };

    info!("Opened PDF {path:?} with {page_count} pages");
    Ok(PdfDocument { handle, page_count })
}

fn unlock(
    handle: &mut dyn PdfHandle,
    path: &Path,
    password: Option<PasswordPrompt<'_>>,
) -> Result<()> {
    if !handle
        .needs_password()
        .map_err(|e| FolioError::load(path, e))?
    {
        return Ok(());
    }

    let Some(prompt) = password else {
        warn!("{path:?} is encrypted and no password prompt is available");
        return Err(FolioError::PasswordRequired);
    };
    let Some(password) = prompt().filter(|p| !p.is_empty()) else {
        return Err(FolioError::PasswordRequired);
    };

    match handle.authenticate(&password) {
        Ok(true) => Ok(()),
        Ok(false) => Err(FolioError::IncorrectPassword),
        Err(e) => Err(FolioError::load(path, e)),
    }
}

impl PdfDocument {
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Rasterize one page. Failures are logged and yield `None`.
    #[must_use]
    pub fn render_page(&self, index: usize, zoom: f32) -> Option<Bitmap> {
        if index >= self.page_count {
            warn!(
                "Render requested for page {index}, document has {} pages",
                self.page_count
            );
            return None;
        }
        let zoom = zoom.max(Zoom::MIN_SCALE);

        let rendered = self
            .handle
            .render_page(index, zoom, zoom)
            .and_then(|buffer| bitmap::from_pixel_buffer(&buffer));
        match rendered {
            Ok(bitmap) => Some(bitmap),
            Err(e) => {
                error!("Render error on page {index}: {e}");
                None
            }
        }
    }

    /// Render `left` and the page after it side by side. Without a right page
    /// (odd page count) the left page is returned alone.
    #[must_use]
    pub fn render_spread(&self, left: usize, zoom: f32) -> Option<Bitmap> {
        let left_bitmap = self.render_page(left, zoom)?;

        let right_bitmap = if left + 1 < self.page_count {
            self.render_page(left + 1, zoom)
        } else {
            None
        };

        match right_bitmap {
            Some(right) => Some(bitmap::compose_spread(&left_bitmap, &right)),
            None => Some(left_bitmap),
        }
    }

    /// Zoom that fits page 0 into `viewport`, rounded to two decimals
    #[must_use]
    pub fn initial_zoom(&self, viewport: Viewport, policy: InitialZoom) -> f32 {
        if self.page_count == 0 {
            return 1.0;
        }
        match self.handle.page_size(0) {
            Ok(size) => fit_zoom(viewport, size.width, size.height, policy),
            Err(e) => {
                warn!("Could not measure first page, using 100% zoom: {e}");
                1.0
            }
        }
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn from_handle(handle: Box<dyn PdfHandle>) -> std::result::Result<Self, EngineFault> {
        let page_count = handle.page_count()?;
        Ok(Self { handle, page_count })
    }
}

fn fit_zoom(viewport: Viewport, page_width: f32, page_height: f32, policy: InitialZoom) -> f32 {
    if page_width <= 0.0 || page_height <= 0.0 {
        return 1.0;
    }
    let (view_width, view_height) = viewport.effective();
    let width_fit = round2(view_width / page_width);
    let zoom = match policy {
        InitialZoom::FitWidth => width_fit,
        InitialZoom::FitPage => width_fit.min(round2(view_height / page_height)),
    };
    Zoom::clamp_factor(zoom)
}
