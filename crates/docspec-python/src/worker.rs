//! Type parser worker: runs the embedded Python script as a subprocess.
//!
//! One batch per conversion:
//!
//! 1. Materialize `parse_types.py` and the request (a JSON array of raw type
//!    expressions) into a fresh temporary directory
//! 2. Run `python parse_types.py REQUEST RESPONSE` and wait for it with a
//!    timeout (OS-level wait, no polling)
//! 3. Read the response: a JSON object keyed by the submitted expressions
//!
//! Expressions missing from the response could not be parsed; that is not an
//! error. A process that cannot start, times out, exits non-zero or leaves an
//! unreadable response fails the whole batch.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::env::{resolve_python, PythonEnvError};

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for one batch.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Embedded parser script.
const PARSER_SCRIPT: &str = include_str!("parse_types.py");

const SCRIPT_FILE: &str = "parse_types.py";
const REQUEST_FILE: &str = "types-request.json";
const RESPONSE_FILE: &str = "types-parsed.json";
const STDERR_FILE: &str = "stderr.log";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while running the type parser.
#[derive(Debug, Error)]
pub enum TypeParserError {
    /// No interpreter to run the parser with.
    #[error(transparent)]
    Environment(#[from] PythonEnvError),

    /// The parser process failed to start.
    #[error("failed to spawn type parser with {python}: {reason}")]
    SpawnFailed { python: PathBuf, reason: String },

    /// The parser did not finish in time.
    #[error("type parser timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The parser exited unsuccessfully.
    #[error("type parser exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The parser's response could not be read.
    #[error("invalid type parser response: {reason}")]
    InvalidResponse { reason: String },

    /// IO error preparing the batch.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw descriptors keyed by the exact submitted expression.
pub type ParsedTypes = HashMap<String, serde_json::Value>;

// ============================================================================
// TypeParser
// ============================================================================

/// Turns raw type expressions into structural descriptors.
pub trait TypeParser {
    /// Parse one batch. Expressions that cannot be parsed are absent from
    /// the result.
    fn parse_batch(&mut self, expressions: &[String]) -> Result<ParsedTypes, TypeParserError>;
}

/// Runs the embedded script under a discovered Python interpreter.
///
/// Discovery happens on the first non-empty batch, so a missing interpreter
/// only matters when there is something to parse.
#[derive(Debug, Clone)]
pub struct PythonTypeParser {
    python: Option<PathBuf>,
    timeout: Duration,
}

impl PythonTypeParser {
    pub fn new(python: Option<PathBuf>, timeout: Duration) -> Self {
        PythonTypeParser { python, timeout }
    }
}

impl Default for PythonTypeParser {
    fn default() -> Self {
        PythonTypeParser::new(None, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl TypeParser for PythonTypeParser {
    fn parse_batch(&mut self, expressions: &[String]) -> Result<ParsedTypes, TypeParserError> {
        if expressions.is_empty() {
            return Ok(ParsedTypes::new());
        }
        let python = resolve_python(self.python.as_deref())?;
        debug!(python = %python.path.display(), source = %python.source, "resolved interpreter");
        run_type_parser(&python.path, expressions, self.timeout)
    }
}

/// Leaves every expression unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTypeParser;

impl TypeParser for NullTypeParser {
    fn parse_batch(&mut self, _expressions: &[String]) -> Result<ParsedTypes, TypeParserError> {
        Ok(ParsedTypes::new())
    }
}

/// Answers from a fixed table and records every batch it receives.
#[derive(Debug, Clone, Default)]
pub struct StaticTypeParser {
    entries: ParsedTypes,
    batches: Vec<Vec<String>>,
}

impl StaticTypeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor for `expression`.
    pub fn with(mut self, expression: impl Into<String>, descriptor: serde_json::Value) -> Self {
        self.entries.insert(expression.into(), descriptor);
        self
    }

    /// Batches received so far.
    pub fn batches(&self) -> &[Vec<String>] {
        &self.batches
    }
}

impl TypeParser for StaticTypeParser {
    fn parse_batch(&mut self, expressions: &[String]) -> Result<ParsedTypes, TypeParserError> {
        self.batches.push(expressions.to_vec());
        Ok(expressions
            .iter()
            .filter_map(|expression| {
                self.entries
                    .get(expression)
                    .map(|descriptor| (expression.clone(), descriptor.clone()))
            })
            .collect())
    }
}

// ============================================================================
// Subprocess
// ============================================================================

/// Run one batch through `parse_types.py` under `python`.
pub fn run_type_parser(
    python: &Path,
    expressions: &[String],
    timeout: Duration,
) -> Result<ParsedTypes, TypeParserError> {
    let workdir = tempfile::TempDir::new()?;
    let script = materialize_parser_script(workdir.path())?;
    let request = workdir.path().join(REQUEST_FILE);
    let response = workdir.path().join(RESPONSE_FILE);
    let stderr_path = workdir.path().join(STDERR_FILE);

    std::fs::write(&request, serde_json::to_vec(expressions)?)?;
    let stderr = File::create(&stderr_path)?;

    debug!(count = expressions.len(), "running type parser");
    let mut child = Command::new(python)
        .arg(&script)
        .arg(&request)
        .arg(&response)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr))
        .spawn()
        .map_err(|e| TypeParserError::SpawnFailed {
            python: python.to_path_buf(),
            reason: e.to_string(),
        })?;

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            // Timeout - kill the process
            let _ = child.kill();
            let _ = child.wait(); // Reap the zombie
            return Err(TypeParserError::Timeout {
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    if !status.success() {
        let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
        return Err(TypeParserError::Failed {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    let output =
        std::fs::read_to_string(&response).map_err(|e| TypeParserError::InvalidResponse {
            reason: format!("cannot read {}: {}", RESPONSE_FILE, e),
        })?;
    let parsed: ParsedTypes =
        serde_json::from_str(&output).map_err(|e| TypeParserError::InvalidResponse {
            reason: e.to_string(),
        })?;

    debug!(
        submitted = expressions.len(),
        parsed = parsed.len(),
        "type parser finished"
    );
    Ok(parsed)
}

/// Write the embedded script into `dir`.
fn materialize_parser_script(dir: &Path) -> Result<PathBuf, TypeParserError> {
    let script_path = dir.join(SCRIPT_FILE);
    std::fs::write(&script_path, PARSER_SCRIPT)?;
    Ok(script_path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Tests that need a real interpreter check for one at runtime and return
    // early when none is installed.

    fn find_python() -> Option<PathBuf> {
        which::which("python3")
            .or_else(|_| which::which("python"))
            .ok()
    }

    fn expressions(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn materialize_writes_embedded_script() {
        let temp = TempDir::new().unwrap();
        let path = materialize_parser_script(temp.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("def parse_expression"));
        assert!(content.contains("def main(argv)"));
    }

    #[test]
    fn empty_batch_needs_no_interpreter() {
        let mut parser = PythonTypeParser::new(
            Some(PathBuf::from("/definitely/not/here/python3")),
            Duration::from_secs(1),
        );
        assert!(parser.parse_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn missing_interpreter_fails_non_empty_batch() {
        let mut parser = PythonTypeParser::new(
            Some(PathBuf::from("/definitely/not/here/python3")),
            Duration::from_secs(1),
        );
        let err = parser.parse_batch(&expressions(&["int"])).unwrap_err();
        assert!(matches!(err, TypeParserError::Environment(_)));
    }

    #[test]
    fn static_parser_answers_known_expressions_only() {
        let mut parser =
            StaticTypeParser::new().with("int", serde_json::json!({"type": "reference", "name": "int"}));

        let parsed = parser.parse_batch(&expressions(&["int", "Foo["])).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("int"));
        assert_eq!(parser.batches().len(), 1);
    }

    #[test]
    fn null_parser_resolves_nothing() {
        let parsed = NullTypeParser.parse_batch(&expressions(&["int"])).unwrap();
        assert!(parsed.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_reported_with_stderr() {
        let temp = TempDir::new().unwrap();
        let fake = temp.path().join("python");
        std::fs::write(&fake, "#!/bin/sh\necho boom >&2\nexit 3\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let err = run_type_parser(&fake, &expressions(&["int"]), Duration::from_secs(10))
            .unwrap_err();
        match err {
            TypeParserError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn hung_parser_times_out() {
        let temp = TempDir::new().unwrap();
        let fake = temp.path().join("python");
        std::fs::write(&fake, "#!/bin/sh\nsleep 30\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let err = run_type_parser(&fake, &expressions(&["int"]), Duration::from_millis(200))
            .unwrap_err();
        assert!(matches!(err, TypeParserError::Timeout { .. }));
    }

    #[test]
    fn real_parser_produces_descriptors() {
        let Some(python) = find_python() else {
            eprintln!("Skipping test: Python not found");
            return;
        };

        let batch = expressions(&[
            "int",
            "Optional[str]",
            "dict[str, list[Request]]",
            "int | None",
            "Literal['GET', 'POST']",
            "'Dataset'",
            "not a type(",
        ]);
        let parsed = run_type_parser(&python, &batch, Duration::from_secs(60)).unwrap();

        assert_eq!(parsed["int"], serde_json::json!({"type": "reference", "name": "int"}));
        assert_eq!(
            parsed["Optional[str]"],
            serde_json::json!({"type": "union", "types": [
                {"type": "reference", "name": "str"},
                {"type": "literal", "value": null}
            ]})
        );
        assert_eq!(parsed["dict[str, list[Request]]"]["typeArguments"][1]["name"], "list");
        assert_eq!(parsed["int | None"]["type"], "union");
        assert_eq!(parsed["Literal['GET', 'POST']"]["types"][1]["value"], "POST");
        assert_eq!(parsed["'Dataset'"]["name"], "Dataset");
        assert!(!parsed.contains_key("not a type("));
    }
}
