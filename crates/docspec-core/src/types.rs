//! Type references carried by declarations.
//!
//! A [`TypeRef`] starts life as a bare placeholder (`reference` with only a
//! name) created while the docspec tree is walked. It is later replaced by the
//! structural form produced by the external type parser, and finally linked to
//! a declaration id by the reference fix-up pass.
//!
//! The serialized shape follows TypeDoc's JSON output: an internally tagged
//! object whose `type` field names the variant.

use serde::{Deserialize, Serialize};

use crate::ids::ReflectionId;

/// Index of a placeholder registered with the type resolver.
///
/// Placeholders carry their slot so the resolution pass can find them again
/// after they have been moved into the declaration tree (or cloned into an
/// inheriting class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSlot(pub usize);

/// A type expression in TypeDoc form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypeRef {
    /// A named type, optionally generic and optionally linked to a declaration.
    Reference {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ReflectionId>,
        #[serde(
            default,
            rename = "typeArguments",
            skip_serializing_if = "Vec::is_empty"
        )]
        type_arguments: Vec<TypeRef>,
        #[serde(skip)]
        slot: Option<TypeSlot>,
    },
    /// A literal value (enum member values, `None`, `Literal[...]` members).
    Literal { value: serde_json::Value },
    /// `Union[A, B]`, `A | B` and `Optional[A]`.
    Union { types: Vec<TypeRef> },
    /// Fixed-shape tuples.
    Tuple {
        #[serde(default)]
        elements: Vec<TypeRef>,
    },
}

impl TypeRef {
    /// A bare, unlinked reference to `name`.
    pub fn reference(name: impl Into<String>) -> Self {
        TypeRef::Reference {
            name: name.into(),
            target: None,
            type_arguments: Vec::new(),
            slot: None,
        }
    }

    /// A placeholder reference registered under `slot`.
    pub fn placeholder(name: impl Into<String>, slot: TypeSlot) -> Self {
        TypeRef::Reference {
            name: name.into(),
            target: None,
            type_arguments: Vec::new(),
            slot: Some(slot),
        }
    }

    /// A literal type.
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        TypeRef::Literal {
            value: value.into(),
        }
    }

    /// Name of a reference type, `None` for other variants.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Reference { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Linked declaration id of a reference type.
    pub fn target(&self) -> Option<ReflectionId> {
        match self {
            TypeRef::Reference { target, .. } => *target,
            _ => None,
        }
    }

    /// Placeholder slot, if this is a still-pending reference.
    pub fn slot(&self) -> Option<TypeSlot> {
        match self {
            TypeRef::Reference { slot, .. } => *slot,
            _ => None,
        }
    }

    /// Visit every reference in this type, including nested generic
    /// arguments and union members.
    ///
    /// The callback receives the reference name and a mutable handle on its
    /// `target`.
    pub fn for_each_reference_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&str, &mut Option<ReflectionId>),
    {
        match self {
            TypeRef::Reference {
                name,
                target,
                type_arguments,
                ..
            } => {
                f(name, target);
                for argument in type_arguments {
                    argument.for_each_reference_mut(f);
                }
            }
            TypeRef::Literal { .. } => {}
            TypeRef::Union { types } => {
                for member in types {
                    member.for_each_reference_mut(f);
                }
            }
            TypeRef::Tuple { elements } => {
                for element in elements {
                    element.for_each_reference_mut(f);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
