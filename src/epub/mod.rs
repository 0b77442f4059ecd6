//! EPUB unpacking and chapter preparation

mod loader;
mod rewrite;
mod staging;
mod text;

pub use loader::{EpubBook, NO_CONTENT_PAGE, load_epub};
pub use rewrite::{file_url, resolve_reference, rewrite_image_sources};
pub use staging::StagingDir;
pub use text::html_to_text;
