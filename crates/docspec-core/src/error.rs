//! Error types and error code constants for docspec-typedoc.
//!
//! This module provides a unified error type (`DocgenError`) that bridges
//! domain-specific errors from the subsystems (type resolution, inheritance,
//! configuration, I/O) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments or malformed input
//! - `3`: Type resolution failed (external parser could not run)
//! - `4`: Inheritance failed (an inherited member has no group)
//! - `5`: I/O failure reading input or writing output
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! ## Design
//!
//! - **Unified type**: `DocgenError` is the single error type for CLI output
//! - **Bridging**: `impl From<X> for DocgenError` lives next to each domain error
//! - **Code mapping**: `OutputErrorCode` provides stable integer codes for JSON

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments or malformed input.
    InvalidArguments = 2,
    /// The external type parser could not be run or returned garbage.
    TypeResolutionError = 3,
    /// Inherited members could not be placed.
    InheritanceError = 4,
    /// Reading input or writing output failed.
    IoError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// Every fatal condition of a conversion ends up here. A conversion that
/// fails with a `DocgenError` writes no output.
#[derive(Debug, Error)]
pub enum DocgenError {
    /// Invalid arguments or input.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The external type resolution step failed.
    #[error("type resolution failed: {message}")]
    TypeResolution { message: String },

    /// An inherited member could not be assigned to a group.
    #[error("inheritance failed: {message}")]
    Inheritance {
        message: String,
        member: String,
        ancestor: String,
    },

    /// File I/O failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl DocgenError {
    /// Create an InvalidArguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DocgenError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an InvalidArguments error with structured details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        DocgenError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create an Io error for a path.
    pub fn io(path: impl fmt::Display, err: impl fmt::Display) -> Self {
        DocgenError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Create an InternalError.
    pub fn internal(message: impl Into<String>) -> Self {
        DocgenError::InternalError {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&DocgenError> for OutputErrorCode {
    fn from(err: &DocgenError) -> Self {
        match err {
            DocgenError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DocgenError::TypeResolution { .. } => OutputErrorCode::TypeResolutionError,
            DocgenError::Inheritance { .. } => OutputErrorCode::InheritanceError,
            DocgenError::Io { .. } => OutputErrorCode::IoError,
            DocgenError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<DocgenError> for OutputErrorCode {
    fn from(err: DocgenError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<serde_json::Error> for DocgenError {
    fn from(err: serde_json::Error) -> Self {
        DocgenError::invalid_args(format!("malformed JSON: {}", err))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
        assert_eq!(OutputErrorCode::TypeResolutionError.code(), 3);
        assert_eq!(OutputErrorCode::InheritanceError.code(), 4);
        assert_eq!(OutputErrorCode::IoError.code(), 5);
        assert_eq!(OutputErrorCode::InternalError.code(), 10);
    }

    #[test]
    fn each_variant_maps_to_its_code() {
        let cases = [
            (DocgenError::invalid_args("bad"), 2),
            (
                DocgenError::TypeResolution {
                    message: "python exited with 1".to_string(),
                },
                3,
            ),
            (
                DocgenError::Inheritance {
                    message: "no group".to_string(),
                    member: "m".to_string(),
                    ancestor: "A".to_string(),
                },
                4,
            ),
            (DocgenError::io("out.json", "permission denied"), 5),
            (DocgenError::internal("oops"), 10),
        ];
        for (err, code) in cases {
            assert_eq!(OutputErrorCode::from(&err).code(), code, "{}", err);
        }
    }

    #[test]
    fn json_errors_are_invalid_input() {
        let err: DocgenError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, DocgenError::InvalidArguments { .. }));
        assert!(err.to_string().starts_with("invalid arguments: malformed JSON"));
    }
}
