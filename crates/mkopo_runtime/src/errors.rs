use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid database url: {0}")]
    InvalidUrl(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("pdf encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report encoding failed: {0}")]
    Encode(String),
}
