//! The docspec input model.
//!
//! Docspec is the JSON dump produced by `pydoc-markdown`'s loader: one tree of
//! API objects per scanned module. Only the fields the transformer reads are
//! modeled; unknown fields are ignored and `null` collections read as empty.
//!
//! The dump comes either as one JSON array of modules or as JSON lines with one
//! module per line; [`parse_modules`] accepts both.

use docspec_core::reflection::{Decoration, ReflectionKind};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Kind tag of module objects.
pub const MODULE_KIND: &str = "module";

/// Decorator that hides a symbol (and flattens its members into the parent).
pub const HIDE_DECORATOR: &str = "ignore_docs";

/// Decorator that renames a symbol in the output.
pub const RENAME_DECORATOR: &str = "docs_name";

/// Decorator marking an alternate call signature.
pub const OVERLOAD_DECORATOR: &str = "overload";

/// Decorators that turn a method into a property.
pub const PROPERTY_DECORATORS: &[&str] = &["property", "dualproperty"];

/// Datatype marking a `data` symbol as a type alias.
pub const TYPE_ALIAS_DATATYPE: &str = "TypeAlias";

// ============================================================================
// Error Types
// ============================================================================

/// Errors reading a docspec dump.
#[derive(Debug, Error)]
pub enum DocspecParseError {
    /// The dump is not valid JSON (or a line of it is not).
    #[error("malformed docspec input at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Input Types
// ============================================================================

/// Source location of a docspec object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default)]
    pub lineno: u32,
}

/// Raw docstring; `content` is either plain text or the structured JSON
/// produced by the Google docstring processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawDocstring {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

/// One function argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocspecArgument {
    pub name: String,
    /// Passing mode: `POSITIONAL_ONLY`, `POSITIONAL`, `KEYWORD_ONLY`, ...
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl DocspecArgument {
    pub fn is_keyword_only(&self) -> bool {
        self.kind == "KEYWORD_ONLY"
    }

    /// Implicit receivers never appear in signatures.
    pub fn is_receiver(&self) -> bool {
        self.name == "self" || self.name == "cls"
    }
}

/// One extracted API object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocspecObject {
    pub name: String,
    /// Kind tag: `module`, `class`, `function`, `data`, ...
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: Location,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<DocspecObject>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub decorations: Vec<Decoration>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bases: Vec<String>,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub docstring: Option<RawDocstring>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modifiers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<DocspecArgument>,
}

impl DocspecObject {
    /// Output kind for this object's kind tag, `None` for unknown tags
    /// (modules included).
    pub fn base_kind(&self) -> Option<ReflectionKind> {
        match self.kind.as_str() {
            "class" => Some(ReflectionKind::Class),
            "data" => Some(ReflectionKind::Property),
            "enum" => Some(ReflectionKind::Enum),
            "enumValue" => Some(ReflectionKind::EnumMember),
            "function" => Some(ReflectionKind::Method),
            _ => None,
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind == MODULE_KIND
    }

    /// Hidden objects emit nothing; their members are reparented.
    pub fn is_hidden(&self) -> bool {
        self.base_kind().is_none()
            || self.has_decoration(HIDE_DECORATOR)
            || self.name == HIDE_DECORATOR
    }

    pub fn is_overload(&self) -> bool {
        self.has_decoration(OVERLOAD_DECORATOR)
    }

    pub fn is_property(&self) -> bool {
        self.decorations
            .iter()
            .any(|d| PROPERTY_DECORATORS.contains(&d.name.as_str()))
    }

    pub fn is_type_alias(&self) -> bool {
        self.kind == "data"
            && self.datatype.as_deref().map(str::trim) == Some(TYPE_ALIAS_DATATYPE)
    }

    pub fn has_decoration(&self, name: &str) -> bool {
        self.decorations.iter().any(|d| d.name == name)
    }

    /// Display name: the `docs_name` literal when present, else the raw name.
    pub fn display_name(&self) -> &str {
        self.decorations
            .iter()
            .find(|d| d.name == RENAME_DECORATOR)
            .and_then(Decoration::literal_arg)
            .unwrap_or(self.name.as_str())
    }

    /// Raw docstring text, empty when absent.
    pub fn docstring_content(&self) -> &str {
        self.docstring
            .as_ref()
            .map(|d| d.content.as_str())
            .unwrap_or("")
    }

    /// `value` as source text. String values are taken verbatim, anything
    /// else is rendered as JSON.
    pub fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Whether any object or decoration in this tree is named `name`.
    pub fn mentions(&self, name: &str) -> bool {
        self.name == name
            || self.decorations.iter().any(|d| d.name == name)
            || self.members.iter().any(|member| member.mentions(name))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a docspec dump: a JSON array of modules, or one module per line.
pub fn parse_modules(input: &str) -> Result<Vec<DocspecObject>, DocspecParseError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|source| DocspecParseError::Malformed {
            line: source.line(),
            source,
        });
    }

    let mut modules = Vec::new();
    for (index, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let module = serde_json::from_str(line).map_err(|source| DocspecParseError::Malformed {
            line: index + 1,
            source,
        })?;
        modules.push(module);
    }
    Ok(modules)
}

// ============================================================================
// Tests
// ============================================================================
