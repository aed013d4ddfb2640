//! Docspec to TypeDoc transformation.
//!
//! [`DocspecTransformer::transform`] turns the extracted modules into one
//! project tree in a single depth-first walk followed by four passes, each run
//! exactly once and in this order:
//!
//! 1. inheritance resolution (members copied down the class hierarchy)
//! 2. type resolution (one batch through the [`TypeParser`])
//! 3. reference fix-up (reference names linked to declaration ids)
//! 4. sorting of the root's groups
//!
//! A transformer owns its id allocator, type resolver and inheritance graph,
//! and is consumed by the run, so no state leaks between conversions.

use std::collections::{BTreeMap, HashMap, HashSet};

use docspec_core::grouping::{classify, sort_groups_and_children, GroupSource, GROUP_DECORATOR};
use docspec_core::ids::{IdAllocator, ReflectionId, ROOT_ID};
use docspec_core::reflection::{
    Comment, Project, Reflection, ReflectionFlags, ReflectionKind, SourceReference, SymbolIdEntry,
};
use docspec_core::types::TypeRef;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::docspec::{parse_modules, DocspecObject, DocspecParseError};
use crate::docstring::ParsedDocstring;
use crate::inheritance::{InheritanceError, InheritanceGraph};
use crate::type_resolver::{canonical_base_type_name, TypeResolver};
use crate::worker::{TypeParser, TypeParserError};

/// Placeholder the extractor puts in front of repository-relative paths.
pub const DEFAULT_REPO_ROOT_PLACEHOLDER: &str = "REPO_ROOT_PLACEHOLDER";

/// Name of the project root when none is configured.
pub const DEFAULT_PROJECT_NAME: &str = "python";

/// Base class that turns a class into an enumeration.
const ENUM_BASE: &str = "Enum";

/// Python's constructor name.
const CONSTRUCTOR_NAME: &str = "__init__";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that abort a transformation. No partial output is produced.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Input(#[from] DocspecParseError),

    #[error(transparent)]
    Inheritance(#[from] InheritanceError),

    #[error(transparent)]
    TypeResolution(#[from] TypeParserError),
}

// ============================================================================
// Options and Output
// ============================================================================

/// Settings of one transformation.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Name of the project root declaration.
    pub project_name: String,
    /// `module.symbol` to the dotted path it is re-exported as, e.g.
    /// `crawlee.storages._dataset.Dataset` to `crawlee.storages.Dataset`.
    pub module_shortcuts: HashMap<String, String>,
    /// Prefix stripped from source file names.
    pub repo_root_placeholder: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            module_shortcuts: HashMap::new(),
            repo_root_placeholder: DEFAULT_REPO_ROOT_PLACEHOLDER.to_string(),
        }
    }
}

/// Counters and warnings of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub modules: usize,
    pub declarations: usize,
    pub inherited_members: usize,
    pub resolved_types: usize,
    pub linked_references: usize,
    pub warnings: Vec<String>,
}

/// Result of a transformation.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub project: Project,
    pub stats: TransformStats,
}

// ============================================================================
// Symbol Registry
// ============================================================================

/// Every emitted node by id, and every declaration by display name.
#[derive(Debug, Default)]
struct SymbolRegistry {
    by_name: HashMap<String, Vec<ReflectionId>>,
    entries: BTreeMap<ReflectionId, SymbolIdEntry>,
}

impl SymbolRegistry {
    fn register(&mut self, id: ReflectionId, name: &str, source_file_name: &str) {
        self.by_name.entry(name.to_string()).or_default().push(id);
        self.record(id, name, source_file_name);
    }

    /// Map entries for a call signature and its parameters. They are never
    /// reference targets.
    fn register_signature(&mut self, signature: &Reflection, source_file_name: &str) {
        for node in std::iter::once(signature).chain(&signature.parameters) {
            self.record(node.id, &node.name, source_file_name);
        }
    }

    fn record(&mut self, id: ReflectionId, name: &str, source_file_name: &str) {
        self.entries.insert(
            id,
            SymbolIdEntry {
                qualified_name: name.to_string(),
                source_file_name: source_file_name.to_string(),
            },
        );
    }

    /// Point every by-name reference in `root` at the declaration of that
    /// name. The last registered declaration still in the tree wins.
    fn link_references(&self, root: &mut Reflection, present: &HashSet<ReflectionId>) -> usize {
        let lookup = |name: &str| {
            self.by_name
                .get(name)
                .and_then(|ids| ids.iter().rev().find(|id| present.contains(id)).copied())
        };
        let mut linked = 0;
        root.for_each_reference_mut(&mut |name, target| {
            if let Some(id) = lookup(name) {
                *target = Some(id);
                linked += 1;
            }
        });
        linked
    }

    /// Give every copied node the entry of the node it was copied from.
    fn register_copies(&mut self, copies: &[(ReflectionId, ReflectionId)]) {
        for (original, copy) in copies {
            if let Some(entry) = self.entries.get(original).cloned() {
                self.entries.insert(*copy, entry);
            }
        }
    }

    fn into_symbol_map(
        self,
        present: &HashSet<ReflectionId>,
    ) -> BTreeMap<ReflectionId, SymbolIdEntry> {
        self.entries
            .into_iter()
            .filter(|(id, _)| present.contains(id))
            .collect()
    }
}

// ============================================================================
// Transformer
// ============================================================================

/// A node under construction plus the overloads buffered for its members.
struct Frame {
    node: Reflection,
    overloads: Vec<DocspecObject>,
}

impl Frame {
    fn new(node: Reflection) -> Self {
        Frame {
            node,
            overloads: Vec::new(),
        }
    }
}

/// Converts docspec modules into a TypeDoc project. One instance per run.
pub struct DocspecTransformer {
    options: TransformOptions,
    ids: IdAllocator,
    types: TypeResolver,
    graph: InheritanceGraph,
    registry: SymbolRegistry,
    /// Docstrings of enclosing classes, innermost last.
    context: Vec<ParsedDocstring>,
    /// Parsed docstrings of callables, for overloads without their own.
    docstrings: HashMap<ReflectionId, ParsedDocstring>,
    uses_docs_group: bool,
    warnings: Vec<String>,
}

impl DocspecTransformer {
    pub fn new(options: TransformOptions) -> Self {
        DocspecTransformer {
            options,
            ids: IdAllocator::new(),
            types: TypeResolver::new(),
            graph: InheritanceGraph::new(),
            registry: SymbolRegistry::default(),
            context: Vec::new(),
            docstrings: HashMap::new(),
            uses_docs_group: false,
            warnings: Vec::new(),
        }
    }

    /// Transform `modules` into a project, resolving types through `parser`.
    pub fn transform(
        mut self,
        modules: &[DocspecObject],
        parser: &mut dyn TypeParser,
    ) -> Result<TransformOutput, TransformError> {
        self.uses_docs_group = modules.iter().any(|module| module.mentions(GROUP_DECORATOR));

        let root = Reflection::new(ROOT_ID, self.options.project_name.as_str(), ReflectionKind::Project);
        let mut frame = Frame::new(root);
        for module in modules {
            self.walk_symbol(module, &mut frame, "", "");
        }
        self.merge_overloads(&mut frame);
        let mut root = frame.node;
        debug!(
            symbols = self.registry.entries.len(),
            edges = self.graph.edge_count(),
            types = self.types.pending(),
            "walk finished"
        );

        let inherited = self.graph.resolve_inheritance(&mut root, &mut self.ids)?;
        self.registry.register_copies(&inherited.copies);

        let resolved = self.types.resolve_all(parser)?;
        let resolved_types = resolved.apply(&mut root);

        let mut present = HashSet::new();
        root.walk(&mut |node| {
            present.insert(node.id);
        });
        let linked_references = self.registry.link_references(&mut root, &present);

        sort_groups_and_children(&mut root);

        let project = Project {
            root,
            symbol_id_map: self.registry.into_symbol_map(&present),
        };
        let stats = TransformStats {
            modules: modules.len(),
            declarations: project.node_count(),
            inherited_members: inherited.members,
            resolved_types,
            linked_references,
            warnings: self.warnings,
        };
        info!(
            modules = stats.modules,
            declarations = stats.declarations,
            inherited = stats.inherited_members,
            resolved_types = stats.resolved_types,
            "transformation finished"
        );
        Ok(TransformOutput { project, stats })
    }

    /// `file` is the source file of the closest enclosing symbol that has one.
    fn walk_symbol(&mut self, symbol: &DocspecObject, parent: &mut Frame, module: &str, file: &str) {
        let file = if symbol.location.filename.is_empty() {
            file
        } else {
            symbol.location.filename.as_str()
        };
        if symbol.is_module() {
            for member in &symbol.members {
                self.walk_symbol(member, parent, &symbol.name, file);
            }
            return;
        }
        if symbol.is_hidden() {
            for member in &symbol.members {
                self.walk_symbol(member, parent, module, file);
            }
            return;
        }
        if symbol.is_type_alias() {
            let value = symbol.value_text();
            self.types.register_type(value.as_deref(), Some(&symbol.name));
            return;
        }
        if symbol.is_overload() {
            parent.overloads.push(symbol.clone());
            return;
        }

        let docstring = self.docstring_for(symbol);
        let node = self.declaration(symbol, &docstring, parent.node.kind, module, file);
        let mut frame = Frame::new(node);
        let id = frame.node.id;
        let is_class = frame.node.kind == ReflectionKind::Class;

        if is_class {
            self.context.push(docstring.clone());
        }
        for member in &symbol.members {
            self.walk_symbol(member, &mut frame, module, file);
        }
        if is_class {
            self.context.pop();
            for base in &symbol.bases {
                self.graph.add_edge(canonical_base_type_name(base), id);
            }
        }
        self.merge_overloads(&mut frame);
        if is_class {
            self.graph.register_node(symbol.name.as_str(), id);
        }
        if frame.node.kind.is_callable() {
            self.docstrings.insert(id, docstring);
        }

        if let Some(group) = classify(&frame.node) {
            let allowed = group.source == GroupSource::Annotation
                || parent.node.kind != ReflectionKind::Project
                || self.uses_docs_group;
            if allowed {
                parent.node.add_to_group(&group.title, id);
            }
        }

        sort_groups_and_children(&mut frame.node);
        parent.node.children.push(frame.node);
    }

    /// Own docstring, or the enclosing class's description of this name.
    fn docstring_for(&self, symbol: &DocspecObject) -> ParsedDocstring {
        let mut docstring = ParsedDocstring::parse(symbol.docstring_content());
        if docstring.is_empty() {
            if let Some(text) = self.context.last().and_then(|context| context.arg(&symbol.name)) {
                docstring.text = text.to_string();
            }
        }
        docstring
    }

    /// Build the declaration for `symbol` (without its members).
    fn declaration(
        &mut self,
        symbol: &DocspecObject,
        docstring: &ParsedDocstring,
        parent_kind: ReflectionKind,
        module: &str,
        file: &str,
    ) -> Reflection {
        let base_kind = symbol.base_kind().unwrap_or(ReflectionKind::Property);
        let (kind, type_ref) = if parent_kind == ReflectionKind::Enum {
            let value = symbol.value.clone().unwrap_or(serde_json::Value::Null);
            (ReflectionKind::EnumMember, Some(TypeRef::literal(value)))
        } else if symbol.is_property() {
            let declared = symbol.return_type.as_deref().or(symbol.datatype.as_deref());
            (
                ReflectionKind::Property,
                Some(self.types.register_type(declared, None)),
            )
        } else if symbol.bases.iter().any(|base| base.trim() == ENUM_BASE) {
            (ReflectionKind::Enum, None)
        } else if base_kind == ReflectionKind::Property {
            let declared = symbol.datatype.as_deref();
            (base_kind, Some(self.types.register_type(declared, None)))
        } else {
            (base_kind, None)
        };

        let id = self.ids.next_id();
        let name = symbol.display_name().to_string();
        let file_name = file.replace(&self.options.repo_root_placeholder, "");
        self.registry.register(id, &name, &file_name);

        let mut node = Reflection::new(id, name.as_str(), kind);
        if !docstring.is_empty() {
            node.comment = Some(Comment::summary(docstring.text.as_str()));
        }
        node.decorations = symbol.decorations.clone();
        node.module = self.module_label(module, &symbol.name);
        node.sources.push(SourceReference {
            file_name: file_name.clone(),
            line: symbol.location.lineno,
            character: 1,
        });
        node.type_ref = type_ref;
        node.bases = symbol.bases.clone();

        if kind == ReflectionKind::Method {
            let signature = self.call_signature(symbol, docstring, &name);
            self.registry.register_signature(&signature, &file_name);
            node.signatures.push(signature);
            if symbol.name == CONSTRUCTOR_NAME {
                node.kind = ReflectionKind::Constructor;
            }
        }
        node
    }

    /// Module label of a symbol, following re-export shortcuts.
    fn module_label(&self, module: &str, name: &str) -> Option<String> {
        if module.is_empty() {
            return None;
        }
        let qualified = format!("{}.{}", module, name);
        match self.options.module_shortcuts.get(&qualified) {
            Some(shortcut) => {
                let suffix = format!(".{}", name);
                Some(shortcut.strip_suffix(&suffix).unwrap_or(shortcut).to_string())
            }
            None => Some(module.to_string()),
        }
    }

    fn call_signature(
        &mut self,
        symbol: &DocspecObject,
        docstring: &ParsedDocstring,
        name: &str,
    ) -> Reflection {
        let mut signature =
            Reflection::new(self.ids.next_id(), name, ReflectionKind::CallSignature);
        signature.modifiers = symbol.modifiers.clone();
        if !docstring.is_empty() {
            let mut comment = Comment::summary(docstring.text.as_str());
            if let Some(returns) = &docstring.returns {
                comment = comment.with_returns(returns.as_str());
            }
            signature.comment = Some(comment);
        }
        signature.type_ref = Some(self.types.register_type(symbol.return_type.as_deref(), None));

        for argument in symbol.args.iter().filter(|argument| !argument.is_receiver()) {
            let mut parameter = Reflection::new(
                self.ids.next_id(),
                argument.name.as_str(),
                ReflectionKind::Parameter,
            );
            parameter.flags = ReflectionFlags {
                is_optional: argument
                    .datatype
                    .as_deref()
                    .is_some_and(|datatype| datatype.contains("Optional"))
                    || argument.default_value.is_some(),
                keyword_only: argument.is_keyword_only(),
            };
            parameter.type_ref = Some(self.types.register_type(argument.datatype.as_deref(), None));
            parameter.comment = docstring.arg(&argument.name).map(Comment::summary);
            parameter.default_value = argument.default_value.clone();
            signature.parameters.push(parameter);
        }
        signature
    }

    /// Attach buffered overloads as extra signatures of their base callable.
    fn merge_overloads(&mut self, frame: &mut Frame) {
        for overload in std::mem::take(&mut frame.overloads) {
            let name = overload.display_name();
            let base = frame
                .node
                .children
                .iter()
                .position(|child| child.kind.is_callable() && child.name == name);
            let Some(index) = base else {
                warn!(overload = %name, parent = %frame.node.name, "overload without a base method, discarded");
                self.warnings.push(format!(
                    "overload `{}` in `{}` has no base method",
                    name, frame.node.name
                ));
                continue;
            };

            let mut docstring = ParsedDocstring::parse(overload.docstring_content());
            if docstring.is_empty() {
                if let Some(base_docstring) = self.docstrings.get(&frame.node.children[index].id) {
                    docstring = base_docstring.clone();
                }
            }
            let signature = self.call_signature(&overload, &docstring, name);
            let base_id = frame.node.children[index].id;
            let file_name = self
                .registry
                .entries
                .get(&base_id)
                .map(|entry| entry.source_file_name.clone())
                .unwrap_or_default();
            self.registry.register_signature(&signature, &file_name);
            frame.node.children[index].signatures.push(signature);
        }
    }
}

/// Parse a docspec dump and transform it.
pub fn convert_docspec(
    input: &str,
    options: TransformOptions,
    parser: &mut dyn TypeParser,
) -> Result<TransformOutput, TransformError> {
    let modules = parse_modules(input)?;
    DocspecTransformer::new(options).transform(&modules, parser)
}

// ============================================================================
// Tests
// ============================================================================
