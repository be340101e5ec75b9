//! Error types for the transaction stream detector.

use thiserror::Error;

/// Result type alias for stream operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stream detection operations
///
/// Every variant is recovered at the boundary where it occurs; the
/// detection loop never terminates because of one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// Historical dataset missing, empty or malformed
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Fit batch empty or degenerate
    #[error("Training error: {0}")]
    Training(String),

    /// Prediction requested from an untrained detector
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Sink failed to render or persist an observation
    #[error("Presentation error: {0}")]
    Presentation(String),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
