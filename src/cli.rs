//! CLI front door.
//!
//! [`run_convert`] is the whole conversion: read the docspec dump, transform
//! it, write the project JSON. It returns the summary envelope the binary
//! prints on stdout.
//!
//! ## All or nothing
//!
//! The output file is written through a temporary file in the destination
//! directory and moved into place only once the project has been fully
//! serialized. A failing run leaves any previous output untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use docspec_core::error::DocgenError;
use docspec_core::output::{ConvertResponse, SCHEMA_VERSION};
use docspec_core::reflection::Project;
use docspec_python::transform::convert_docspec;
use docspec_python::worker::{NullTypeParser, PythonTypeParser, TypeParser};

use crate::config::Config;

/// Everything one conversion needs.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Docspec dump to read.
    pub input: PathBuf,
    /// Where to write the project JSON.
    pub output: PathBuf,
    pub config: Config,
    /// Run the external type parser. When off, every type stays a bare
    /// reference to its cleaned expression.
    pub resolve_types: bool,
}

/// Convert `request.input` into `request.output`.
pub fn run_convert(request: &ConvertRequest) -> Result<ConvertResponse, DocgenError> {
    let input = fs::read_to_string(&request.input)
        .map_err(|err| DocgenError::io(request.input.display(), err))?;
    debug!(input = %request.input.display(), bytes = input.len(), "read docspec dump");

    let mut parser: Box<dyn TypeParser> = if request.resolve_types {
        Box::new(PythonTypeParser::new(
            request.config.python.clone(),
            request.config.type_parser_timeout(),
        ))
    } else {
        Box::new(NullTypeParser)
    };

    let output = convert_docspec(&input, request.config.transform_options(), parser.as_mut())?;
    write_project(&output.project, &request.output)?;
    info!(output = %request.output.display(), "wrote project");

    Ok(ConvertResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        output: request.output.display().to_string(),
        modules: output.stats.modules,
        declarations: output.stats.declarations,
        inherited_members: output.stats.inherited_members,
        resolved_types: output.stats.resolved_types,
        warnings: output.stats.warnings,
    })
}

/// Serialize `project` to `path` atomically.
pub fn write_project(project: &Project, path: &Path) -> Result<(), DocgenError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |err: std::io::Error| DocgenError::io(path.display(), err);

    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    serde_json::to_writer_pretty(&mut file, project)
        .map_err(|err| DocgenError::internal(format!("failed to serialize project: {}", err)))?;
    writeln!(file).map_err(io_err)?;
    file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
