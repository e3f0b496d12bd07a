use thiserror::Error;

/// Terminal failures of the split pipeline. A missing name or phone on a page
/// is not one of these; the extractor falls back to placeholders instead.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("unreadable PDF: {0}")]
    UnreadableDocument(String),

    #[error("staging failed: {0}")]
    Staging(#[from] std::io::Error),

    #[error("archive failed: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl SplitError {
    pub fn unreadable(e: impl std::fmt::Display) -> Self {
        SplitError::UnreadableDocument(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
