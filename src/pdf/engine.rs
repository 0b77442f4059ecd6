//! Rasterizer seam: the PDF engine the viewer core talks to
//!
//! MuPDF is the production engine. Everything above this module only sees
//! [`PdfEngine`] / [`PdfHandle`], which keeps the pagination and render logic
//! testable without real documents.

use std::path::Path;

use mupdf::{Colorspace, Document, Matrix, Pixmap};

/// Errors raised by a PDF engine
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Raw RGBA pixels as handed back by the rasterizer.
///
/// Rows may be padded: `stride` is the byte distance between row starts.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub samples: Vec<u8>,
}

/// Page size in PDF points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Opens documents
pub trait PdfEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfHandle>, EngineFault>;
}

/// An open PDF document. Dropping the handle closes it.
pub trait PdfHandle {
    fn needs_password(&self) -> Result<bool, EngineFault>;

    /// Returns `Ok(false)` when the password is wrong
    fn authenticate(&mut self, password: &str) -> Result<bool, EngineFault>;

    fn page_count(&self) -> Result<usize, EngineFault>;

    fn page_size(&self, index: usize) -> Result<PageSize, EngineFault>;

    fn render_page(
        &self,
        index: usize,
        scale_x: f32,
        scale_y: f32,
    ) -> Result<PixelBuffer, EngineFault>;
}

/// MuPDF-backed engine
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfEngine;

impl PdfEngine for MupdfEngine {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfHandle>, EngineFault> {
        let doc = Document::open(path.to_string_lossy().as_ref())?;
        Ok(Box::new(MupdfHandle { doc }))
    }
}

struct MupdfHandle {
    doc: Document,
}

impl MupdfHandle {
    fn checked_index(&self, index: usize) -> Result<i32, EngineFault> {
        let count = self.page_count()?;
        if index >= count {
            return Err(EngineFault::generic(format!(
                "page {index} out of range (document has {count} pages)"
            )));
        }
        Ok(index as i32)
    }
}

impl PdfHandle for MupdfHandle {
    fn needs_password(&self) -> Result<bool, EngineFault> {
        Ok(self.doc.needs_password()?)
    }

    fn authenticate(&mut self, password: &str) -> Result<bool, EngineFault> {
        Ok(self.doc.authenticate(password)?)
    }

    fn page_count(&self) -> Result<usize, EngineFault> {
        let count = self.doc.page_count()?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn page_size(&self, index: usize) -> Result<PageSize, EngineFault> {
        let page = self.doc.load_page(self.checked_index(index)?)?;
        let bounds = page.bounds()?;
        Ok(PageSize {
            width: bounds.x1 - bounds.x0,
            height: bounds.y1 - bounds.y0,
        })
    }

    fn render_page(
        &self,
        index: usize,
        scale_x: f32,
        scale_y: f32,
    ) -> Result<PixelBuffer, EngineFault> {
        let page = self.doc.load_page(self.checked_index(index)?)?;
        let transform = Matrix::new_scale(scale_x, scale_y);
        let rgb = Colorspace::device_rgb();
        let pixmap = page.to_pixmap(&transform, &rgb, true, false)?;
        pixmap_to_rgba(&pixmap)
    }
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<PixelBuffer, EngineFault> {
    let n = pixmap.n() as usize;
    if n != 4 {
        return Err(EngineFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(EngineFault::generic("Pixmap buffer size mismatch"));
    }

    Ok(PixelBuffer {
        width: pixmap.width(),
        height: pixmap.height(),
        stride,
        samples: samples[..stride * height].to_vec(),
    })
}
