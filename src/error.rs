use thiserror::Error;

/// Errors from the spatial-reference backend.
#[derive(Error, Debug)]
pub enum ProjError {
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),

    #[error("Transform failed: {0}")]
    TransformFailed(String),
}

/// Errors from geoid grid loading.
#[derive(Error, Debug)]
pub enum GeoidError {
    #[error("I/O error reading geoid grid: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed geoid grid: {0}")]
    Malformed(String),
}
