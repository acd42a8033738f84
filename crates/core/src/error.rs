//! Error types for the gridcast forecasting pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gridcast pipeline.
///
/// Stage failures are fail-fast: every variant propagates to the top of the
/// run; nothing in the core retries.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed input columns; aborts the stage.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Join keys produced zero overlapping rows; usually a time-range or
    /// timezone mismatch.
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// Fewer than nine quantile model artifacts were discovered. A partial
    /// quantile set cannot support a probabilistic submission.
    #[error("Incomplete quantile ensemble: found {found} of 9 models")]
    IncompleteEnsemble { found: usize },

    /// Model artifact or prediction error.
    #[error("Model error: {0}")]
    Model(String),

    /// Forecast-provider API error.
    #[error("API error: {0}")]
    Api(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data format error.
    pub fn data_format(msg: impl Into<String>) -> Self {
        Error::DataFormat(msg.into())
    }

    /// Create an alignment error.
    pub fn alignment(msg: impl Into<String>) -> Self {
        Error::Alignment(msg.into())
    }

    /// Create a model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }

    /// Create an API error.
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }
}
