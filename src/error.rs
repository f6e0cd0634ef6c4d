//! library error type

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// not a style layer descriptor at all; fatal for the whole run
    #[error("{} is not a style layer descriptor document", path.display())]
    Unsupported { path: PathBuf },

    #[error("style translator failed: {0}")]
    Translator(String),

    #[error("invalid style document: {0}")]
    InvalidStyle(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
