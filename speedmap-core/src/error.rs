use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid node index")]
    InvalidNodeIndex,
    #[error("All-pairs shortest paths are not available")]
    PathsNotComputed,
    #[error("Path cache holds {actual} bytes, expected {expected}")]
    CacheSizeMismatch { expected: usize, actual: usize },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
