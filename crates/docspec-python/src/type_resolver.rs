//! Batched resolution of Python type expressions.
//!
//! While the docspec tree is walked, every type expression is registered here
//! and a placeholder [`TypeRef`] is handed back. After the walk all distinct
//! expressions go to the [`TypeParser`] in one batch, and
//! [`ResolvedTypes::apply`] swaps each placeholder for its structural form.
//!
//! Type aliases (`HttpMethod: TypeAlias = Literal['GET', 'POST']`) register
//! their aliased expression under the alias name. A placeholder whose
//! expression is an alias name resolves to the aliased structure, and alias
//! references nested inside other types are expanded the same way.

use std::collections::{HashMap, HashSet};

use docspec_core::reflection::Reflection;
use docspec_core::types::{TypeRef, TypeSlot};
use tracing::{debug, warn};

use crate::worker::{TypeParser, TypeParserError};

/// Name given to missing type expressions.
pub const UNDEFINED_TYPE: &str = "Undefined";

/// Bound on nested alias expansion; deeper (or cyclic) aliases stay named.
const MAX_ALIAS_DEPTH: usize = 8;

/// Strip `#` comments and line breaks from a raw type expression.
pub fn clean_type_expression(raw: &str) -> String {
    raw.lines()
        .map(|line| match line.find('#') {
            Some(index) => &line[..index],
            None => line,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Join key for base classes: `Optional[...]` unwrapped, generic arguments
/// dropped. `Generic[T]` gives `Generic`, `Optional[Base[int]]` gives `Base`.
pub fn canonical_base_type_name(expression: &str) -> String {
    let trimmed = expression.trim();
    let unwrapped = trimmed
        .strip_prefix("Optional[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    unwrapped
        .split('[')
        .next()
        .unwrap_or(unwrapped)
        .trim()
        .to_string()
}

// ============================================================================
// TypeResolver
// ============================================================================

/// Collects type expressions for one conversion run.
#[derive(Debug, Default)]
pub struct TypeResolver {
    /// Cleaned expression per slot.
    expressions: Vec<String>,
    /// Alias name to aliased expression.
    aliases: HashMap<String, String>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type expression and return its placeholder.
    ///
    /// A missing expression registers as `Undefined`. With `alias`, the
    /// expression is also recorded as the meaning of that alias name.
    pub fn register_type(&mut self, raw: Option<&str>, alias: Option<&str>) -> TypeRef {
        let name = raw
            .map(clean_type_expression)
            .unwrap_or_else(|| UNDEFINED_TYPE.to_string());
        if let Some(alias) = alias {
            self.aliases.insert(alias.to_string(), name.clone());
        }
        let slot = TypeSlot(self.expressions.len());
        self.expressions.push(name.clone());
        TypeRef::placeholder(name, slot)
    }

    /// Number of registered placeholders.
    pub fn pending(&self) -> usize {
        self.expressions.len()
    }

    /// Whether `name` was registered as an alias.
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Distinct non-empty expressions, in registration order.
    pub fn batch(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut batch = Vec::new();
        for expression in &self.expressions {
            if !expression.is_empty() && seen.insert(expression.as_str()) {
                batch.push(expression.clone());
            }
        }
        batch
    }

    /// Send every distinct expression to `parser` in a single batch.
    ///
    /// Descriptors that do not decode are logged and leave their
    /// placeholders unresolved.
    pub fn resolve_all(
        &self,
        parser: &mut dyn TypeParser,
    ) -> Result<ResolvedTypes, TypeParserError> {
        let batch = self.batch();
        debug!(
            placeholders = self.expressions.len(),
            distinct = batch.len(),
            "resolving types"
        );
        let raw = parser.parse_batch(&batch)?;

        let mut decoded = HashMap::new();
        for (expression, descriptor) in raw {
            match serde_json::from_value::<TypeRef>(descriptor) {
                Ok(ty) => {
                    decoded.insert(expression, ty);
                }
                Err(e) => {
                    warn!(expression = %expression, error = %e, "undecodable type descriptor")
                }
            }
        }

        let by_slot = self
            .expressions
            .iter()
            .map(|expression| {
                self.aliases
                    .get(expression)
                    .and_then(|aliased| decoded.get(aliased))
                    .or_else(|| decoded.get(expression))
                    .map(|ty| self.expand_aliases(ty.clone(), &decoded, 1))
            })
            .collect();
        Ok(ResolvedTypes { by_slot })
    }

    fn expand_aliases(
        &self,
        ty: TypeRef,
        decoded: &HashMap<String, TypeRef>,
        depth: usize,
    ) -> TypeRef {
        match ty {
            TypeRef::Reference {
                name,
                target,
                type_arguments,
                slot,
            } => {
                if type_arguments.is_empty() && depth <= MAX_ALIAS_DEPTH {
                    let aliased = self
                        .aliases
                        .get(&name)
                        .and_then(|expression| decoded.get(expression));
                    if let Some(aliased) = aliased {
                        return self.expand_aliases(aliased.clone(), decoded, depth + 1);
                    }
                }
                TypeRef::Reference {
                    name,
                    target,
                    type_arguments: type_arguments
                        .into_iter()
                        .map(|argument| self.expand_aliases(argument, decoded, depth))
                        .collect(),
                    slot,
                }
            }
            TypeRef::Union { types } => TypeRef::Union {
                types: types
                    .into_iter()
                    .map(|member| self.expand_aliases(member, decoded, depth))
                    .collect(),
            },
            TypeRef::Tuple { elements } => TypeRef::Tuple {
                elements: elements
                    .into_iter()
                    .map(|element| self.expand_aliases(element, decoded, depth))
                    .collect(),
            },
            literal @ TypeRef::Literal { .. } => literal,
        }
    }
}

// ============================================================================
// ResolvedTypes
// ============================================================================

/// Structural types per placeholder slot.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTypes {
    by_slot: Vec<Option<TypeRef>>,
}

impl ResolvedTypes {
    /// Resolution for `slot`, if the parser produced one.
    pub fn get(&self, slot: TypeSlot) -> Option<&TypeRef> {
        self.by_slot.get(slot.0).and_then(Option::as_ref)
    }

    /// Number of slots that resolved.
    pub fn resolved(&self) -> usize {
        self.by_slot.iter().filter(|ty| ty.is_some()).count()
    }

    /// Replace every resolvable placeholder in `root`. Returns the number of
    /// replacements. Cloned placeholders (inherited members) resolve too.
    pub fn apply(&self, root: &mut Reflection) -> usize {
        let mut replaced = 0;
        root.for_each_type_mut(&mut |ty| {
            if let Some(resolved) = ty.slot().and_then(|slot| self.get(slot)) {
                *ty = resolved.clone();
                replaced += 1;
            }
        });
        replaced
    }
}

// ============================================================================
// Tests
// ============================================================================
