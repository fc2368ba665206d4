use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
    #[error("path '{name}' needs at least 2 distinct points, got {count}")]
    EmptyPath { name: String, count: usize },
    #[error("no path is being drawn")]
    NoActivePath,
    #[error("no annotation with id {0}")]
    UnknownId(u32),
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

impl AnnotatorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotatorError>;
