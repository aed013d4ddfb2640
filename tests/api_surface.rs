//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Core Infrastructure Types
// ============================================================================

// ids module - declaration identifiers
use docspec_typedoc::ids::{IdAllocator, ReflectionId, ROOT_ID};

// reflection module - the declaration tree
use docspec_typedoc::reflection::{
    BlockTag, Comment, CommentPart, Decoration, Project, Reflection, ReflectionFlags,
    ReflectionGroup, ReflectionKind, ReflectionRef, SourceReference, SymbolIdEntry,
};

// types module - type references
use docspec_typedoc::types::{TypeRef, TypeSlot};

// grouping module - group classification and sorting
use docspec_typedoc::grouping::{
    classify, compare_groups, sort_groups_and_children, GroupAssignment, GroupSource,
    GROUP_DECORATOR, GROUP_ORDER,
};

// error module - error types and codes
use docspec_typedoc::error::{DocgenError, OutputErrorCode};

// output module - JSON output types
use docspec_typedoc::output::{
    emit_response, ConvertResponse, ErrorInfo, ErrorResponse, SCHEMA_VERSION,
};

// ============================================================================
// Python Frontend Types
// ============================================================================

use docspec_typedoc::transform::{
    convert_docspec, DocspecTransformer, TransformError, TransformOptions, TransformOutput,
    TransformStats,
};
use docspec_typedoc::worker::{
    NullTypeParser, ParsedTypes, PythonTypeParser, StaticTypeParser, TypeParser, TypeParserError,
};

// ============================================================================
// Front Door
// ============================================================================

use docspec_typedoc::cli::{run_convert, write_project, ConvertRequest};
use docspec_typedoc::config::{Config, ConfigError};

// ============================================================================
// Test
// ============================================================================

#[test]
fn api_surface_compiles() {
    // The imports above form the public API contract.
    // Any change that breaks these imports is a breaking change.
    let _ = std::any::type_name::<Reflection>();
    let _ = std::any::type_name::<Project>();
    let _ = std::any::type_name::<TypeRef>();
    let _ = std::any::type_name::<DocgenError>();
    let _ = std::any::type_name::<DocspecTransformer>();
    let _ = std::any::type_name::<ConvertRequest>();
    let _ = std::any::type_name::<Config>();
}

#[test]
fn schema_version_is_stable() {
    // The schema version is part of the public API contract
    assert_eq!(SCHEMA_VERSION, "1");
}
