use thiserror::Error;

/// Main error type for the GammaGuard system.
///
/// Most risk-engine failure modes are deliberately NOT errors: degenerate
/// pricing inputs degrade to sentinel Greeks, limit violations return `false`
/// plus an alert, and unknown position ids return empty results. `GgError` is
/// reserved for genuinely exceptional conditions at the edges — malformed
/// input, configuration problems, serialization.
#[derive(Error, Debug)]
pub enum GgError {
    #[error("Quote error: {0}")]
    Quote(String),

    #[error("Position error: {0}")]
    Position(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for GammaGuard operations.
pub type GgResult<T> = Result<T, GgError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::errors::GgError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::errors::GgError::Internal(format!($($arg)*))
    };
}
