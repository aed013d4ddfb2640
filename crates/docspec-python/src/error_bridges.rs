//! Error bridge implementations for the Python frontend.
//!
//! This module provides `impl From<X> for DocgenError` conversions from the
//! frontend's error types to the unified `DocgenError` type. They live here
//! rather than in `docspec-core` because core knows nothing about docspec
//! input or the type parser.

use docspec_core::error::DocgenError;

use crate::docspec::DocspecParseError;
use crate::inheritance::InheritanceError;
use crate::transform::TransformError;
use crate::worker::TypeParserError;

// ============================================================================
// Bridge: DocspecParseError -> DocgenError
// ============================================================================

impl From<DocspecParseError> for DocgenError {
    fn from(err: DocspecParseError) -> Self {
        match &err {
            DocspecParseError::Malformed { line, .. } => DocgenError::invalid_args_with_details(
                err.to_string(),
                serde_json::json!({ "line": line }),
            ),
        }
    }
}

// ============================================================================
// Bridge: InheritanceError -> DocgenError
// ============================================================================

impl From<InheritanceError> for DocgenError {
    fn from(err: InheritanceError) -> Self {
        let message = err.to_string();
        match err {
            InheritanceError::MissingGroup { member, ancestor } => DocgenError::Inheritance {
                message,
                member,
                ancestor,
            },
        }
    }
}

// ============================================================================
// Bridge: TypeParserError -> DocgenError
// ============================================================================

impl From<TypeParserError> for DocgenError {
    fn from(err: TypeParserError) -> Self {
        DocgenError::TypeResolution {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Bridge: TransformError -> DocgenError
// ============================================================================

impl From<TransformError> for DocgenError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Input(err) => DocgenError::from(err),
            TransformError::Inheritance(err) => DocgenError::from(err),
            TransformError::TypeResolution(err) => DocgenError::from(err),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
