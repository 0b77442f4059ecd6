//! PDF rendering infrastructure

mod bitmap;
mod cache;
mod continuous;
mod engine;
mod render;
mod zoom;

pub use bitmap::{Bitmap, compose_spread, from_pixel_buffer, stack_vertically};
pub use cache::{CacheKey, LastRender};
pub use continuous::ContinuousView;
pub use engine::{EngineFault, MupdfEngine, PageSize, PdfEngine, PdfHandle, PixelBuffer};
pub use render::{PasswordPrompt, PdfDocument, Viewport, load_pdf};
pub use zoom::{FontSize, Zoom};
