use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The collector ran but exited unsuccessfully. `detail` carries whatever
    /// it wrote to stderr.
    #[error("gocov test failure: {message}")]
    Collection {
        message: String,
        detail: Option<String>,
    },

    #[error("Failed to decode gocov output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid selection: {0}")]
    SelectionResolution(String),

    #[error("Failed to read source file {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Unable to find the gocov binary")]
    ToolNotFound,

    #[error("Failed to acquire gocov: {0}")]
    ToolAcquisition(String),
}

impl ViewerError {
    /// Full diagnostic text for errors that carry more than a one-line message.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ViewerError::Collection {
                detail: Some(detail),
                ..
            } => Some(detail),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
