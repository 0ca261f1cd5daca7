use std::io;
use thiserror::Error;

/// Crate-wide error type.
///
/// The first three variants are local validation failures raised before any
/// persistence happens. `UnexpectedError` covers cascade failures detected
/// after the in-memory transition has already been applied; by then earlier
/// writes may have committed and are not rolled back.
#[derive(Error, Debug)]
pub enum CapworksError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("transition {from} -> {to} requires a '{required}' decision")]
    MissingDecision {
        from: String,
        to: String,
        required: String,
    },
    #[error("validation error on {target}: {message}")]
    ValidationError { target: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected error: {0}")]
    UnexpectedError(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl CapworksError {
    /// Stable machine-readable code for boundary-layer mapping.
    pub fn code(&self) -> &'static str {
        match self {
            CapworksError::InvalidTransition { .. } => "invalidTransition",
            CapworksError::MissingDecision { .. } => "missingDecision",
            CapworksError::ValidationError { .. } => "invalidInput",
            CapworksError::NotFound(_) => "notFound",
            CapworksError::UnexpectedError(_) => "unexpectedError",
            CapworksError::ConfigError(_) => "invalidConfig",
            CapworksError::IoError(_) => "ioError",
        }
    }

    /// Human-readable target of the failure, when one exists.
    pub fn target(&self) -> Option<&str> {
        match self {
            CapworksError::ValidationError { target, .. } => Some(target.as_str()),
            CapworksError::NotFound(target) => Some(target.as_str()),
            _ => None,
        }
    }

    pub fn validation(target: &str, message: impl Into<String>) -> Self {
        CapworksError::ValidationError {
            target: target.to_string(),
            message: message.into(),
        }
    }
}
