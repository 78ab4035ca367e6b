use crate::datatypes::{FileResolution, IntRect};

#[derive(Debug, thiserror::Error)]
pub enum ImportErr {
    #[error("file type not recognised: {0}")]
    UnknownFileType(String),
    #[error("the file has an invalid size ({0} bytes)")]
    InvalidFileSize(u64),
    #[error("the file's resolution {actual} does not match the requested resolution {expected}")]
    ResolutionMismatch {
        expected: FileResolution,
        actual: FileResolution,
    },
    #[error("the file holds {bytes} bytes, which does not match the requested resolution {expected}")]
    FileSizeMismatch { expected: FileResolution, bytes: u64 },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TerrafieldError {
    #[error("degenerate rectangle {0}")]
    DegenerateRect(IntRect),
    #[error("sample buffer holds {actual} values but {expected} were expected")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("invalid component layout: {0}")]
    InvalidLayout(String),
    #[error("import failed: {0}")]
    Import(#[from] ImportErr),
    #[error("malformed gizmo clipboard text: {0}")]
    Clipboard(String),
    #[error("malformed gizmo snapshot: {0}")]
    Snapshot(String),
    #[error("i/o failure: {0}")]
    IOFailure(#[from] std::io::Error),
    #[error("image codec failure: {0}")]
    Image(#[from] image::ImageError),
    #[error("settings parse failure: {0}")]
    JSONError(#[from] serde_json::Error),
    #[error("snapshot encoding failure: {0}")]
    Encoding(#[from] bincode::Error),
}

impl TerrafieldError {
    pub(crate) fn size_mismatch(expected: usize, actual: usize) -> Self {
        TerrafieldError::SizeMismatch { expected, actual }
    }
}
