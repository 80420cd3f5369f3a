//!
//! src/errors.rs
//!
//! Defines the error enum and conversions used across the
//! import, catalog and history layers. The aggregation layer
//! never returns these.
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for InsightsError {
    fn from(e: reqwest::Error) -> Self { InsightsError::Http(e.to_string()) }
}

impl From<serde_json::Error> for InsightsError {
    fn from(e: serde_json::Error) -> Self { InsightsError::Parse(e.to_string()) }
}

impl From<csv::Error> for InsightsError {
    fn from(e: csv::Error) -> Self { InsightsError::Parse(format!("csv: {e}")) }
}

impl From<sqlx::Error> for InsightsError {
    fn from(e: sqlx::Error) -> Self { InsightsError::Db(e.to_string()) }
}
