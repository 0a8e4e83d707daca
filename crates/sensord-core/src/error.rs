use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Threshold errors
    #[error("Unknown threshold level: {0}")]
    UnknownThresholdLevel(String),

    #[error("Unknown threshold direction: {0}")]
    UnknownThresholdDirection(String),

    #[error("Duplicate threshold: {0}")]
    DuplicateThreshold(String),

    // Sensor errors
    #[error("Invalid scale factor: {0}")]
    InvalidScaleFactor(f64),

    #[error("Invalid display range: min {min} is above max {max}")]
    InvalidRange { min: f64, max: f64 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
