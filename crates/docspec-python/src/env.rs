//! Python interpreter discovery.
//!
//! The type parser runs under whatever Python the user has at hand; it only
//! needs the standard library.
//!
//! ## Resolution Order
//!
//! 1. Explicit interpreter (`--python` flag or `python` config key)
//! 2. `$DOCSPEC_PYTHON` environment variable
//! 3. `$VIRTUAL_ENV/bin/python` (user's active venv)
//! 4. `python3`, then `python` from `$PATH`

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming the interpreter to use.
pub const PYTHON_ENV_VAR: &str = "DOCSPEC_PYTHON";

/// Interpreter names tried in venvs and on `$PATH`.
const PYTHON_NAMES: &[&str] = &["python3", "python"];

#[cfg(windows)]
const VENV_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const VENV_BIN_DIR: &str = "bin";

// ============================================================================
// Error Types
// ============================================================================

/// A single step in the resolution process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionStep {
    /// Source being checked (e.g., "$DOCSPEC_PYTHON", "$PATH").
    pub source: String,
    /// What was found (if anything).
    pub found: Option<PathBuf>,
    /// Why this step did not produce an interpreter.
    pub failure_reason: String,
}

impl ResolutionStep {
    fn not_set(source: impl Into<String>) -> Self {
        ResolutionStep {
            source: source.into(),
            found: None,
            failure_reason: "not set".to_string(),
        }
    }

    fn not_found(source: impl Into<String>) -> Self {
        ResolutionStep {
            source: source.into(),
            found: None,
            failure_reason: "not found".to_string(),
        }
    }

    fn rejected(source: impl Into<String>, path: PathBuf, reason: impl Into<String>) -> Self {
        ResolutionStep {
            source: source.into(),
            found: Some(path),
            failure_reason: reason.into(),
        }
    }
}

impl fmt::Display for ResolutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.source)?;
        if let Some(ref path) = self.found {
            write!(f, "found {} - ", path.display())?;
        }
        write!(f, "{}", self.failure_reason)
    }
}

/// Trace of all resolution steps attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionTrace {
    pub steps: Vec<ResolutionStep>,
}

impl ResolutionTrace {
    fn add(&mut self, step: ResolutionStep) {
        self.steps.push(step);
    }

    /// Format the trace for display.
    pub fn format_trace(&self) -> String {
        let mut output = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, step));
        }
        output
    }
}

/// Errors that can occur during interpreter discovery.
#[derive(Debug, Error)]
pub enum PythonEnvError {
    /// No Python interpreter found.
    #[error("{}", format_python_not_found_error(.trace))]
    PythonNotFound { trace: ResolutionTrace },

    /// The explicitly configured interpreter does not exist.
    #[error("Python interpreter {path} does not exist")]
    ExplicitNotFound { path: PathBuf },
}

fn format_python_not_found_error(trace: &ResolutionTrace) -> String {
    let mut msg = String::from("no Python interpreter found for type resolution\n\n");
    msg.push_str("Resolution attempted:\n");
    msg.push_str(&trace.format_trace());
    msg.push('\n');
    msg.push_str("Remediation:\n");
    msg.push_str(&format!(
        "  a) Point {} at a Python 3 interpreter\n",
        PYTHON_ENV_VAR
    ));
    msg.push_str("  b) Pass --python /path/to/python3\n");
    msg.push_str("  c) Skip type resolution with --no-type-resolution\n");
    msg
}

// ============================================================================
// Resolution
// ============================================================================

/// Where the interpreter was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// From `--python` or the config file.
    Explicit,
    /// From `$DOCSPEC_PYTHON`.
    EnvDocspecPython,
    /// From `$VIRTUAL_ENV/bin/python`.
    VirtualEnv,
    /// From `$PATH`.
    Path,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Explicit => write!(f, "--python"),
            ResolutionSource::EnvDocspecPython => write!(f, "${}", PYTHON_ENV_VAR),
            ResolutionSource::VirtualEnv => write!(f, "$VIRTUAL_ENV"),
            ResolutionSource::Path => write!(f, "$PATH"),
        }
    }
}

/// A discovered interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPython {
    pub path: PathBuf,
    pub source: ResolutionSource,
}

/// Resolve the interpreter from the process environment.
pub fn resolve_python(explicit: Option<&Path>) -> Result<ResolvedPython, PythonEnvError> {
    resolve_python_with(explicit, |key| std::env::var(key).ok())
}

/// Resolve the interpreter, reading environment variables through `var`.
pub fn resolve_python_with<F>(
    explicit: Option<&Path>,
    var: F,
) -> Result<ResolvedPython, PythonEnvError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Explicit interpreter: a path, or a bare command name on $PATH
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(ResolvedPython {
                path: path.to_path_buf(),
                source: ResolutionSource::Explicit,
            });
        }
        if let Ok(found) = which::which(path) {
            return Ok(ResolvedPython {
                path: found,
                source: ResolutionSource::Explicit,
            });
        }
        return Err(PythonEnvError::ExplicitNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut trace = ResolutionTrace::default();
    trace.add(ResolutionStep::not_set("--python"));

    // 2. $DOCSPEC_PYTHON
    let env_source = format!("${}", PYTHON_ENV_VAR);
    match var(PYTHON_ENV_VAR).filter(|value| !value.is_empty()) {
        Some(value) => {
            let path = PathBuf::from(value);
            if !path.exists() {
                trace.add(ResolutionStep::rejected(&env_source, path, "path does not exist"));
            } else if !is_executable(&path) {
                trace.add(ResolutionStep::rejected(&env_source, path, "not executable"));
            } else {
                return Ok(ResolvedPython {
                    path,
                    source: ResolutionSource::EnvDocspecPython,
                });
            }
        }
        None => trace.add(ResolutionStep::not_set(&env_source)),
    }

    // 3. $VIRTUAL_ENV/bin/python
    match var("VIRTUAL_ENV").filter(|value| !value.is_empty()) {
        Some(venv) => {
            let bin_dir = PathBuf::from(venv).join(VENV_BIN_DIR);
            let found = PYTHON_NAMES
                .iter()
                .map(|name| bin_dir.join(name))
                .find(|path| path.exists() && is_executable(path));
            match found {
                Some(path) => {
                    return Ok(ResolvedPython {
                        path,
                        source: ResolutionSource::VirtualEnv,
                    })
                }
                None => trace.add(ResolutionStep::not_found("$VIRTUAL_ENV")),
            }
        }
        None => trace.add(ResolutionStep::not_set("$VIRTUAL_ENV")),
    }

    // 4. python3/python from $PATH
    for name in PYTHON_NAMES {
        if let Ok(path) = which::which(name) {
            return Ok(ResolvedPython {
                path,
                source: ResolutionSource::Path,
            });
        }
    }
    trace.add(ResolutionStep::not_found("$PATH (python3/python)"));

    Err(PythonEnvError::PythonNotFound { trace })
}

/// Check if a path is executable.
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn fake_interpreter(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    fn vars(entries: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        let python = fake_interpreter(temp.path(), "python3");
        let other = fake_interpreter(temp.path(), "other");

        let resolved = resolve_python_with(
            Some(&python),
            vars(&[(PYTHON_ENV_VAR, other.display().to_string())]),
        )
        .unwrap();
        assert_eq!(resolved.path, python);
        assert_eq!(resolved.source, ResolutionSource::Explicit);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = resolve_python_with(
            Some(Path::new("/definitely/not/here/python3")),
            vars(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, PythonEnvError::ExplicitNotFound { .. }));
    }

    #[test]
    fn env_var_is_used_when_executable() {
        let temp = TempDir::new().unwrap();
        let python = fake_interpreter(temp.path(), "python3");

        let resolved =
            resolve_python_with(None, vars(&[(PYTHON_ENV_VAR, python.display().to_string())]))
                .unwrap();
        assert_eq!(resolved.path, python);
        assert_eq!(resolved.source, ResolutionSource::EnvDocspecPython);
    }

    #[test]
    fn virtual_env_bin_is_searched() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join(VENV_BIN_DIR);
        std::fs::create_dir_all(&bin).unwrap();
        let python = fake_interpreter(&bin, "python");

        let resolved =
            resolve_python_with(None, vars(&[("VIRTUAL_ENV", temp.path().display().to_string())]))
                .unwrap();
        assert_eq!(resolved.path, python);
        assert_eq!(resolved.source, ResolutionSource::VirtualEnv);
    }

    #[test]
    fn not_found_error_lists_steps_and_remediation() {
        let mut trace = ResolutionTrace::default();
        trace.add(ResolutionStep::not_set("--python"));
        trace.add(ResolutionStep::not_found("$PATH (python3/python)"));

        let message = PythonEnvError::PythonNotFound { trace }.to_string();
        assert!(message.contains("1. --python: not set"));
        assert!(message.contains("2. $PATH (python3/python): not found"));
        assert!(message.contains("--no-type-resolution"));
    }
}
