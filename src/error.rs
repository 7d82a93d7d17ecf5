use arrow_schema::ArrowError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Load Error: {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("Persistence Error: {0}")]
    Persistence(#[from] rusqlite::Error),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet Error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow Error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Logger Error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

impl PipelineError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
