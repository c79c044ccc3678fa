use thiserror::Error;

/// Errors raised while loading parameters, running simulations or writing reports.
#[derive(Debug, Error)]
pub enum HveError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Could not build the week distribution for dose {dose}: {reason}")]
    Distribution { dose: u8, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
