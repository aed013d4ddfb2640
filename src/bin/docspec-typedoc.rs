//! Binary entry point for the docspec-typedoc CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Convert a docspec dump, resolving types with the discovered Python
//! docspec-typedoc --input docspec-dump.jsonl --output typedoc-api.json
//!
//! # Project name and re-export shortcuts from a config file
//! docspec-typedoc --input dump.jsonl --output api.json --config docspec-typedoc.json
//!
//! # Skip the type parser subprocess entirely
//! docspec-typedoc --input dump.jsonl --output api.json --no-type-resolution
//! ```
//!
//! On success a summary envelope is printed to stdout; on failure an error
//! envelope is printed and the process exits with the error's code.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use docspec_core::error::{DocgenError, OutputErrorCode};
use docspec_core::output::{emit_response, ErrorResponse};
use docspec_typedoc::cli::{run_convert, ConvertRequest};
use docspec_typedoc::config::Config;

// ============================================================================
// CLI Structure
// ============================================================================

/// Convert docspec dumps of Python packages into TypeDoc JSON.
#[derive(Parser, Debug)]
#[command(name = "docspec-typedoc", version, about = "Convert docspec dumps into TypeDoc JSON")]
struct Cli {
    /// Docspec dump (JSON array or one module per line).
    #[arg(long)]
    input: PathBuf,

    /// Path of the TypeDoc project JSON to write.
    #[arg(long)]
    output: PathBuf,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Python interpreter for type resolution (overrides the config file).
    #[arg(long)]
    python: Option<PathBuf>,

    /// Name of the project root (overrides the config file).
    #[arg(long)]
    project_name: Option<String>,

    /// Do not run the type parser; types stay bare references.
    #[arg(long)]
    no_type_resolution: bool,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), DocgenError> {
    let config = Config::load_or_default(cli.config.as_deref())?
        .with_overrides(cli.python, cli.project_name);
    let request = ConvertRequest {
        input: cli.input,
        output: cli.output,
        config,
        resolve_types: !cli.no_type_resolution,
    };

    let response = run_convert(&request)?;
    emit_response(&response, &mut io::stdout()).map_err(|e| DocgenError::internal(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod cli_parsing {
        use super::*;

        #[test]
        fn minimal_invocation() {
            let cli =
                Cli::try_parse_from(["docspec-typedoc", "--input", "in.json", "--output", "out.json"])
                    .unwrap();
            assert_eq!(cli.input, PathBuf::from("in.json"));
            assert_eq!(cli.output, PathBuf::from("out.json"));
            assert!(!cli.no_type_resolution);
            assert_eq!(cli.log_level, LogLevel::Warn);
        }

        #[test]
        fn overrides_and_flags() {
            let cli = Cli::try_parse_from([
                "docspec-typedoc",
                "--input",
                "in.json",
                "--output",
                "out.json",
                "--python",
                "/usr/bin/python3",
                "--project-name",
                "crawlee",
                "--no-type-resolution",
                "--log-level",
                "debug",
            ])
            .unwrap();
            assert_eq!(cli.python, Some(PathBuf::from("/usr/bin/python3")));
            assert_eq!(cli.project_name.as_deref(), Some("crawlee"));
            assert!(cli.no_type_resolution);
            assert_eq!(cli.log_level, LogLevel::Debug);
        }

        #[test]
        fn output_is_required() {
            assert!(Cli::try_parse_from(["docspec-typedoc", "--input", "in.json"]).is_err());
        }
    }
}
