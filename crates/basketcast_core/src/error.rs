use std::time::Duration;

/// A request field that failed boundary validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid parameter: {field} - {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the forecasting pipeline
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A computed figure came out as NaN or infinite
    #[error("non-finite value in {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// Monte Carlo run was cancelled through its control handle
    #[error("simulation cancelled")]
    Cancelled,
}

/// Failures of the external forecast refinement step.
///
/// These never reach the caller of the engine; they are logged and the
/// historical statistics are used instead.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("no forecast bridge configured")]
    NotConfigured,

    #[error("failed to spawn forecast process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("forecast process I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("forecast process timed out after {0:?}")]
    Timeout(Duration),

    #[error("forecast process exited with {0}")]
    ExitStatus(std::process::ExitStatus),

    #[error("forecast output exceeded {0} bytes")]
    OutputTooLarge(usize),

    #[error("forecast output contained no JSON object")]
    NoJson,

    #[error("malformed forecast output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("forecast process reported an error: {0}")]
    Reported(String),

    #[error("forecast response missing field {0}")]
    MissingField(&'static str),

    #[error("forecast response field {field} is not finite: {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// Errors from reading a price dataset
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV header is missing required column {0}")]
    MissingColumn(&'static str),

    #[error("price dataset contains no usable rows")]
    NoData,
}

pub type Result<T> = std::result::Result<T, EngineError>;
