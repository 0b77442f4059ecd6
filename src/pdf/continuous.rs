//! Continuous (all pages stacked) layout
//!
//! Building renders every page, so it only happens when the layout is about
//! to be shown and something invalidated it since the last build.

use log::{debug, warn};

use super::bitmap::Bitmap;
use super::render::PdfDocument;

pub struct ContinuousView {
    frames: Vec<Bitmap>,
    stale: bool,
}

impl Default for ContinuousView {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            stale: true,
        }
    }
}

impl ContinuousView {
    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Drop built frames, e.g. when the document is closed
    pub fn clear(&mut self) {
        self.frames.clear();
        self.stale = true;
    }

    /// Rebuild if stale, then return the frames. In spread orientation there
    /// is one frame per page pair.
    pub fn ensure_built(&mut self, doc: &PdfDocument, spread: bool, zoom: f32) -> &[Bitmap] {
        if self.stale {
            self.build(doc, spread, zoom);
        }
        &self.frames
    }

    fn build(&mut self, doc: &PdfDocument, spread: bool, zoom: f32) {
        let zoom = if zoom <= 0.0 { 1.0 } else { zoom };
        let step = if spread { 2 } else { 1 };

        self.frames.clear();
        for index in (0..doc.page_count()).step_by(step) {
            let frame = if spread {
                doc.render_spread(index, zoom)
            } else {
                doc.render_page(index, zoom)
            };
            match frame {
                Some(bitmap) => self.frames.push(bitmap),
                None => warn!("Skipping page {index} in continuous view"),
            }
        }

        debug!(
            "Built continuous view: {} frames (spread: {spread}, zoom: {zoom})",
            self.frames.len()
        );
        self.stale = false;
    }
}
