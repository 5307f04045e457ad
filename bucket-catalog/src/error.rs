use crate::parser::ParseError;
use datafusion::arrow::error::ArrowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Layout error: {0}")]
    Layout(#[from] bucket_layout::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Arrow error: {0}")]
    Arrow(String),

    #[error("Object source error: {0}")]
    Source(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[cfg(feature = "metadata-api")]
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ArrowError> for Error {
    fn from(err: ArrowError) -> Self {
        Error::Arrow(err.to_string())
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        Error::Source(err.to_string())
    }
}

#[cfg(feature = "metadata-api")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpClient(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
