//! docspec-typedoc: Python API documentation for TypeDoc-based sites
//!
//! Converts the docspec dump of a Python package into the JSON declaration
//! tree TypeDoc themes render: class hierarchies with inherited members,
//! structural types, groups and call signatures.

// Core infrastructure - re-exported from docspec-core
pub use docspec_core::error;
pub use docspec_core::grouping;
pub use docspec_core::ids;
pub use docspec_core::output;
pub use docspec_core::reflection;
pub use docspec_core::types;

// Python frontend - re-exported from docspec-python
pub use docspec_python::transform;
pub use docspec_python::worker;

// Front door
pub mod cli;
pub mod config;
