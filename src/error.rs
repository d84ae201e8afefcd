use thiserror::Error;

use crate::layer::LayerId;

/// All errors produced by the vertex editor.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The scene document is not JSON or does not have the expected shape.
    #[error("invalid scene document: {0}")]
    Format(String),
    /// An index buffer entry does not address the vertex store.
    #[error("index {index} out of range for {count} vertices")]
    IndexOutOfRange { index: u32, count: usize },
    #[error("period must be a positive finite number, got {0}")]
    InvalidPeriod(f64),
    #[error("no layer with id {0}")]
    UnknownLayer(LayerId),
    #[error("unknown draw mode: {0}")]
    UnknownDrawMode(String),
    #[error("invalid editor config: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Walking a site directory failed.
    #[cfg(not(target_arch = "wasm32"))]
    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, EditorError>;

/// Shorthand constructors.
impl EditorError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn out_of_range(index: u32, count: usize) -> Self {
        Self::IndexOutOfRange { index, count }
    }
}
