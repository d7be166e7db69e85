// Source trait for measurement data access
use crate::domain::measurement::SourceRow;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Network, authentication or file access problems
    #[error("connection failure: {0}")]
    ConnectionFailure(String),
    /// Expected columns are absent or hold unusable values
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("query returned no rows")]
    EmptyResult,
}

impl FetchError {
    pub fn missing_columns(columns: &[&str]) -> Self {
        FetchError::SchemaMismatch(format!("missing columns: {}", columns.join(", ")))
    }
}

#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Short name used in logs, e.g. "mysql" or "spreadsheet"
    fn name(&self) -> &str;

    /// Read every row of the configured query or sheet, in source order
    async fn fetch_rows(&self) -> Result<Vec<SourceRow>, FetchError>;
}
