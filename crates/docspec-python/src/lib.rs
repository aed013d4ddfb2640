//! Python frontend for docspec-typedoc.
//!
//! This crate turns docspec dumps of Python packages into the declaration
//! tree from `docspec-core`. It includes:
//! - The docspec input model and docstring parsing
//! - Python interpreter discovery
//! - The type expression parser subprocess
//! - Inheritance resolution across the class hierarchy
//! - The transformer driving one conversion

pub mod docspec;
pub mod docstring;
pub mod env;
pub mod inheritance;
pub mod transform;
pub mod type_resolver;
pub mod worker;

// Error bridges - converts frontend errors to DocgenError
mod error_bridges;
