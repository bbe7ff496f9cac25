//! Error types and handling for Solmate
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Solmate operations
pub type Result<T> = std::result::Result<T, SolmateError>;

/// Main error type for Solmate
#[derive(Debug, Error)]
pub enum SolmateError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A power/SoC reading was missing or non-numeric at evaluation time.
    /// Recovered locally by the controller; never forwarded into the machine.
    #[error("Invalid reading: {point} - {message}")]
    InvalidReading { point: String, message: String },

    /// Timer contract violations (arming an already-armed timer)
    #[error("Timer error: {timer} - {message}")]
    Timer { timer: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl SolmateError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SolmateError::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid-reading error
    pub fn invalid_reading<S: Into<String>>(point: S, message: S) -> Self {
        SolmateError::InvalidReading {
            point: point.into(),
            message: message.into(),
        }
    }

    /// Create a new timer error
    pub fn timer<S: Into<String>>(timer: S, message: S) -> Self {
        SolmateError::Timer {
            timer: timer.into(),
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SolmateError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SolmateError::Io {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        SolmateError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SolmateError {
    fn from(err: std::io::Error) -> Self {
        SolmateError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SolmateError {
    fn from(err: serde_yaml::Error) -> Self {
        SolmateError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SolmateError {
    fn from(err: serde_json::Error) -> Self {
        SolmateError::Serialization {
            message: err.to_string(),
        }
    }
}
