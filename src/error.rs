use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChemError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Missing required CSV header: {0}")]
    MissingHeader(String),

    #[error("Missing required value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Empty input for required field '{0}'")]
    EmptyInput(&'static str),

    #[error("API request error: {0}")]
    ApiRequestError(reqwest::Error),

    #[error("API returned an error status: {status} for query: {query}")]
    ApiStatusError {
        status: reqwest::StatusCode,
        query: String,
    },

    #[error("Failed to decode API JSON response: {0}")]
    ApiJsonDecodeError(reqwest::Error),

    #[error("NER backend error: {0}")]
    BackendError(String),

    #[error(
        "Emission matrix has {rows} rows for {tokens} tokens in window [{start}, {end})"
    )]
    DimensionMismatch {
        rows: usize,
        tokens: usize,
        start: usize,
        end: usize,
    },

    #[error("NER backend timed out after {0} ms")]
    BackendTimeout(u64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Rate limiter is shut down")]
    RateLimiterClosed,

    #[error("Cheminformatics operation '{operation}' failed: {reason}")]
    CheminformaticsError { operation: String, reason: String },

    #[error("All {0} items in the batch failed")]
    BatchFailed(usize),
}

pub type Result<T> = std::result::Result<T, ChemError>;
