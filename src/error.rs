/// Error taxonomy for the editor core.
///
/// `OutOfBounds` is produced by the bounds-checked grid API; pointer paths
/// treat it as a no-op and never surface it. `InvalidMode` and
/// `InvalidColorIndex` come from collaborators passing bad values across the
/// API boundary. `MalformedInput` is a rejected load.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cell ({x}, {y}) is outside the grid")]
    OutOfBounds { x: i64, y: i64 },
    #[error("malformed puzzle data: {0}")]
    MalformedInput(String),
    #[error("unknown mode `{0}` (expected `paint` or `debug`)")]
    InvalidMode(String),
    #[error("color index {0} is not in the palette")]
    InvalidColorIndex(i32),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        EditorError::MalformedInput(msg.into())
    }
}
