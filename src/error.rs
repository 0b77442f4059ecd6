//! Error types shared by the document, render and conversion layers

use std::path::PathBuf;

/// Errors surfaced to the caller of a document or conversion operation.
///
/// Render failures on a single page are deliberately absent: those are logged
/// and show up as a blank page instead.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("no file selected")]
    NoFile,

    #[error("unsupported file type {extension:?}: only PDF and EPUB are supported")]
    UnsupportedFormat { extension: String },

    #[error("password required")]
    PasswordRequired,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to open {}: {detail}", path.display())]
    Load { path: PathBuf, detail: String },

    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::Error),

    #[error("EPUB: {0}")]
    Epub(#[from] epub::doc::DocError),

    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub fn load(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for errors caused by what the user asked for rather than by the
    /// document or the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoFile
                | Self::UnsupportedFormat { .. }
                | Self::PasswordRequired
                | Self::IncorrectPassword
                | Self::InvalidInput(_)
        )
    }
}

pub type Result<T, E = FolioError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_user_errors() {
        assert!(FolioError::PasswordRequired.is_user_error());
        assert!(FolioError::IncorrectPassword.is_user_error());
        assert!(
            FolioError::UnsupportedFormat {
                extension: "txt".into()
            }
            .is_user_error()
        );
    }

    #[test]
    fn load_failures_are_not_user_errors() {
        let err = FolioError::load("broken.pdf", "no objects found");
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "failed to open broken.pdf: no objects found");
    }
}
