use crate::facebook;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no access token provided")]
    MissingAccessToken,
    #[error("no output directory provided")]
    MissingOutputDirectory,
    #[error("Graph API client error: {0}")]
    Client(#[from] facebook::Error),
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("index error: {0}")]
    Index(#[from] csv::Error),
    #[error("invalid index row at line {line} in {path:?}")]
    InvalidIndexRow { path: PathBuf, line: u64 },
    #[error("invalid timestamp in index: {0}")]
    InvalidTimestamp(String),
}
