use thiserror::Error;

/// Errors that stop a batch. Per-domain fetch and decode problems are not
/// represented here; see [`crate::pipeline::Failure`].
#[derive(Debug, Error)]
pub enum Error {
    /// The domain table has no column with the required name.
    #[error("column '{column}' does not exist in the domain table")]
    MissingColumn {
        /// Name of the required column.
        column: &'static str,
    },

    /// The `domain` column exists but does not hold text.
    #[error("column '{column}' must hold text, found {found}")]
    ColumnType {
        /// Name of the required column.
        column: &'static str,
        /// Data type actually stored in the column.
        found: String,
    },

    /// The domain table has no header line at all.
    #[error("domain table is empty, expected a header line")]
    EmptyTable,

    /// A domain was inserted twice into a fingerprint table.
    #[error("domain '{domain}' is already present in the fingerprint table")]
    DuplicateDomain {
        /// The offending domain.
        domain: String,
    },

    /// Invalid configuration value.
    #[error("invalid parameter {name}: {message}")]
    InvalidConfig {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The hashing worker pool went away before answering.
    #[error("worker pool: {0}")]
    WorkerPool(String),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
