//! JSON output types for CLI responses.
//!
//! The converted project itself is written to the output file; stdout only
//! ever carries one of the small envelopes defined here, so callers can
//! parse the result of a run without reading the (possibly large) output.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::{DocgenError, OutputErrorCode};

/// Version of the envelope format.
pub const SCHEMA_VERSION: &str = "1";

/// Summary of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Where the project JSON was written.
    pub output: String,
    /// Number of modules read from the input.
    pub modules: usize,
    /// Number of nodes in the output tree, the root included.
    pub declarations: usize,
    /// Members copied or filled in from ancestors.
    pub inherited_members: usize,
    /// Type placeholders replaced with structural types.
    pub resolved_types: usize,
    /// Warnings surfaced during the run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Error information in an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a DocgenError.
    pub fn from_error(err: &DocgenError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let details = match err {
            DocgenError::InvalidArguments { details, .. } => details.clone(),
            DocgenError::Inheritance {
                member, ancestor, ..
            } => Some(serde_json::json!({
                "member": member,
                "ancestor": ancestor,
            })),
            DocgenError::Io { path, .. } => Some(serde_json::json!({ "path": path })),
            DocgenError::TypeResolution { .. } | DocgenError::InternalError { .. } => None,
        };

        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a DocgenError.
    pub fn from_error(err: &DocgenError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_carries_code_and_details() {
        let err = DocgenError::Inheritance {
            message: "no group for `m` (inherited from `A`)".to_string(),
            member: "m".to_string(),
            ancestor: "A".to_string(),
        };
        let response = ErrorResponse::from_error(&err);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["error"]["code"], 4);
        assert_eq!(json["error"]["details"]["ancestor"], "A");
    }

    #[test]
    fn emit_response_writes_one_json_document() {
        let response = ConvertResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            output: "api-typedoc.json".to_string(),
            modules: 1,
            declarations: 3,
            inherited_members: 0,
            resolved_types: 0,
            warnings: Vec::new(),
        };

        let mut buffer = Vec::new();
        emit_response(&response, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["declarations"], 3);
        assert!(parsed.get("warnings").is_none());
    }
}
