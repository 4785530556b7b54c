use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table '{table}' column '{column}' holds a value no tabular sink can store")]
    UnsupportedCell { table: String, column: String },

    #[error(
        "Asset target {target} unreachable with {portfolios} portfolios (each holds 1 or 2 assets)"
    )]
    AssetTargetUnreachable { target: usize, portfolios: usize },

    #[error("Partition of '{what}' sums to {actual}, expected {expected}")]
    PartitionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Table '{table}' has no row with key '{key}'")]
    MissingParent { table: &'static str, key: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SynthResult<T> = Result<T, SynthError>;
