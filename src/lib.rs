pub mod bookmark;
pub mod cli;
pub mod convert;
pub mod epub;
pub mod error;
pub mod event_source;
pub mod i18n;
pub mod navigation;
pub mod panic_handler;
pub mod pdf;
pub mod session;
pub mod settings;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{FolioError, Result};
pub use session::{DocumentInfo, Frame, Session, SessionOptions};
