//! Core infrastructure for docspec-typedoc.
//!
//! This crate provides the language-agnostic half of the converter:
//! - Identifier allocation for declarations
//! - The TypeDoc-compatible declaration tree (reflections, type references)
//! - Group classification and deterministic sorting
//! - Error types and error codes
//! - JSON output envelopes for CLI responses

pub mod error;
pub mod grouping;
pub mod ids;
pub mod output;
pub mod reflection;
pub mod types;
