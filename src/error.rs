//! Error type shared by the loaders, configuration and runner

use thiserror::Error;

/// Errors surfaced to callers of the reserving engine
///
/// Numeric edge cases (zero denominators, empty triangles) are never reported
/// here; those resolve to defined defaults inside each stage.
#[derive(Debug, Error)]
pub enum ReservingError {
    /// Unsupported selector or unusable configuration for a single request
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record field could not be interpreted
    #[error("invalid value for {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReservingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ReservingError::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ReservingError>;
