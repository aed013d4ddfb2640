//! The declaration tree.
//!
//! A [`Reflection`] is one node of the TypeDoc-compatible output: a class,
//! method, property, enum, call signature or parameter. The tree owns its
//! nodes through `children`, `signatures` and `parameters`; everything else
//! (`groups`, `extendedTypes`, `extendedBy`, `inheritedFrom`) refers to other
//! nodes by id only.
//!
//! The root of a conversion is a [`Project`], which flattens its root
//! reflection into the top-level JSON object and adds the symbol id map.

use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::ids::{IdAllocator, ReflectionId};
use crate::types::TypeRef;

// ============================================================================
// Kinds
// ============================================================================

/// Declaration kind, mirroring TypeDoc's `ReflectionKind` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectionKind {
    Project,
    Enum,
    EnumMember,
    Class,
    Constructor,
    Property,
    Method,
    CallSignature,
    Parameter,
}

impl ReflectionKind {
    /// Numeric kind as understood by TypeDoc consumers.
    pub fn code(&self) -> u32 {
        match self {
            ReflectionKind::Project => 1,
            ReflectionKind::Enum => 8,
            ReflectionKind::EnumMember => 16,
            ReflectionKind::Class => 128,
            ReflectionKind::Constructor => 512,
            ReflectionKind::Property => 1024,
            ReflectionKind::Method => 2048,
            ReflectionKind::CallSignature => 4096,
            ReflectionKind::Parameter => 32_768,
        }
    }

    /// Human-readable kind (`kindString`).
    pub fn label(&self) -> &'static str {
        match self {
            ReflectionKind::Project => "Project",
            ReflectionKind::Enum => "Enumeration",
            ReflectionKind::EnumMember => "Enumeration Member",
            ReflectionKind::Class => "Class",
            ReflectionKind::Constructor => "Constructor",
            ReflectionKind::Property => "Property",
            ReflectionKind::Method => "Method",
            ReflectionKind::CallSignature => "Call signature",
            ReflectionKind::Parameter => "Parameter",
        }
    }

    /// Whether declarations of this kind carry call signatures.
    pub fn is_callable(&self) -> bool {
        matches!(self, ReflectionKind::Method | ReflectionKind::Constructor)
    }
}

/// Serializes as the `kind` / `kindString` pair, flattened into the owner.
impl Serialize for ReflectionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("kind", &self.code())?;
        map.serialize_entry("kindString", self.label())?;
        map.end()
    }
}

// ============================================================================
// Supporting Types
// ============================================================================

fn is_false(value: &bool) -> bool {
    !*value
}

/// Boolean attributes of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReflectionFlags {
    #[serde(rename = "isOptional", skip_serializing_if = "is_false")]
    pub is_optional: bool,
    #[serde(rename = "keyword-only", skip_serializing_if = "is_false")]
    pub keyword_only: bool,
}

/// A Python decorator as captured by the extractor.
///
/// `args` is the raw argument text including parentheses, e.g. `("Classes")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

impl Decoration {
    /// Create a decoration with raw argument text.
    pub fn new(name: impl Into<String>, args: Option<&str>) -> Self {
        Decoration {
            name: name.into(),
            args: args.map(String::from),
        }
    }

    /// The string literal passed to the decorator, without its quotes.
    ///
    /// `("Storage clients")` yields `Storage clients`. Returns `None` when the
    /// arguments contain no quoted literal or the literal is empty.
    pub fn literal_arg(&self) -> Option<&str> {
        let args = self.args.as_deref()?;
        let start = args.find(|c: char| c == '"' || c == '\'')?;
        let quote = args[start..].chars().next()?;
        let end = args.rfind(quote)?;
        if end <= start {
            return None;
        }
        let literal = &args[start + 1..end];
        if literal.is_empty() {
            None
        } else {
            Some(literal)
        }
    }
}

/// A named bucket of sibling ids used for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReflectionGroup {
    pub title: String,
    pub children: Vec<ReflectionId>,
}

/// One text fragment of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPart {
    pub kind: String,
    pub text: String,
}

impl CommentPart {
    pub fn text(text: impl Into<String>) -> Self {
        CommentPart {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// A block tag such as `@returns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockTag {
    pub tag: String,
    pub content: Vec<CommentPart>,
}

/// Documentation attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub summary: Vec<CommentPart>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub block_tags: Vec<BlockTag>,
}

impl Comment {
    /// A comment with a single summary paragraph.
    pub fn summary(text: impl Into<String>) -> Self {
        Comment {
            summary: vec![CommentPart::text(text)],
            block_tags: Vec::new(),
        }
    }

    /// Append a `@returns` block tag.
    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.block_tags.push(BlockTag {
            tag: "@returns".to_string(),
            content: vec![CommentPart::text(returns)],
        });
        self
    }

    /// The first summary fragment's text, empty when there is none.
    pub fn summary_text(&self) -> &str {
        self.summary.first().map(|part| part.text.as_str()).unwrap_or("")
    }
}

/// Where a declaration was defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub file_name: String,
    pub line: u32,
    pub character: u32,
}

/// A by-id link to another declaration (`extendedTypes`, `inheritedFrom`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "reference")]
pub struct ReflectionRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ReflectionId>,
}

impl ReflectionRef {
    pub fn new(name: impl Into<String>, target: ReflectionId) -> Self {
        ReflectionRef {
            name: name.into(),
            target: Some(target),
        }
    }
}

// ============================================================================
// Reflection
// ============================================================================

/// One node of the declaration tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: ReflectionId,
    pub name: String,
    #[serde(flatten)]
    pub kind: ReflectionKind,
    pub flags: ReflectionFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decorations: Vec<Decoration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Display-only label of the module the declaration is exported from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceReference>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Reflection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ReflectionGroup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Reflection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Reflection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extended_types: Vec<ReflectionRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extended_by: Vec<ReflectionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<ReflectionRef>,
    /// Raw base class expressions, kept for group classification.
    #[serde(skip)]
    pub bases: Vec<String>,
}

impl Reflection {
    /// Create an empty reflection of the given kind.
    pub fn new(id: ReflectionId, name: impl Into<String>, kind: ReflectionKind) -> Self {
        Reflection {
            id,
            name: name.into(),
            kind,
            flags: ReflectionFlags::default(),
            comment: None,
            decorations: Vec::new(),
            modifiers: Vec::new(),
            module: None,
            sources: Vec::new(),
            type_ref: None,
            default_value: None,
            children: Vec::new(),
            groups: Vec::new(),
            signatures: Vec::new(),
            parameters: Vec::new(),
            extended_types: Vec::new(),
            extended_by: Vec::new(),
            inherited_from: None,
            bases: Vec::new(),
        }
    }

    /// Whether the declaration has non-empty summary text.
    pub fn has_summary(&self) -> bool {
        self.comment
            .as_ref()
            .is_some_and(|comment| !comment.summary_text().is_empty())
    }

    /// Whether a decorator with this name is attached.
    pub fn has_decoration(&self, name: &str) -> bool {
        self.decorations.iter().any(|d| d.name == name)
    }

    /// Find a direct child by name.
    pub fn find_child(&self, name: &str) -> Option<&Reflection> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Find the direct child that is, or was inherited from, `id`.
    pub fn find_child_by_group_entry(&self, id: ReflectionId) -> Option<&Reflection> {
        self.children.iter().find(|child| {
            child.id == id
                || child
                    .inherited_from
                    .as_ref()
                    .is_some_and(|origin| origin.target == Some(id))
        })
    }

    /// Add `id` to the group titled `title`, creating the group if needed.
    pub fn add_to_group(&mut self, title: &str, id: ReflectionId) {
        match self.groups.iter_mut().find(|group| group.title == title) {
            Some(group) => group.children.push(id),
            None => self.groups.push(ReflectionGroup {
                title: title.to_string(),
                children: vec![id],
            }),
        }
    }

    /// Follow a path of child indices from this node.
    pub fn descendant(&self, path: &[usize]) -> Option<&Reflection> {
        let mut node = self;
        for &index in path {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    /// Mutable variant of [`Reflection::descendant`].
    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Reflection> {
        let mut node = self;
        for &index in path {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Map every declaration reachable through `children` to its index path.
    ///
    /// Paths stay valid while nodes are only appended to `children`.
    pub fn child_paths(&self) -> HashMap<ReflectionId, Vec<usize>> {
        let mut paths = HashMap::new();
        let mut stack: Vec<(&Reflection, Vec<usize>)> = vec![(self, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            for (index, child) in node.children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(index);
                stack.push((child, child_path));
            }
            paths.entry(node.id).or_insert(path);
        }
        paths
    }

    /// Visit this node and every owned node (children, signatures,
    /// parameters), parents first.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(&Reflection),
    {
        f(self);
        for child in self.owned_nodes() {
            child.walk(f);
        }
    }

    /// Visit every type slot in this subtree.
    pub fn for_each_type_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut TypeRef),
    {
        if let Some(type_ref) = self.type_ref.as_mut() {
            f(type_ref);
        }
        for child in self.owned_nodes_mut() {
            child.for_each_type_mut(f);
        }
    }

    /// Visit every by-name reference in this subtree: type references
    /// (including nested ones), `extendedTypes`, `extendedBy` and
    /// `inheritedFrom`.
    pub fn for_each_reference_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&str, &mut Option<ReflectionId>),
    {
        if let Some(type_ref) = self.type_ref.as_mut() {
            type_ref.for_each_reference_mut(f);
        }
        for link in self
            .extended_types
            .iter_mut()
            .chain(self.extended_by.iter_mut())
            .chain(self.inherited_from.iter_mut())
        {
            f(&link.name, &mut link.target);
        }
        for child in self.owned_nodes_mut() {
            child.for_each_reference_mut(f);
        }
    }

    /// Give this node and everything it owns fresh ids.
    ///
    /// Group entries pointing at renumbered nodes are rewritten; entries
    /// pointing outside the subtree (inherited origins) are left alone.
    /// Returns the old id to fresh id mapping.
    pub fn renumber(&mut self, ids: &mut IdAllocator) -> HashMap<ReflectionId, ReflectionId> {
        let mut remap = HashMap::new();
        self.renumber_inner(ids, &mut remap, true);
        self.remap_groups(&remap);
        remap
    }

    /// Like [`Reflection::renumber`], but keeps this node's own id.
    pub fn renumber_owned(&mut self, ids: &mut IdAllocator) -> HashMap<ReflectionId, ReflectionId> {
        let mut remap = HashMap::new();
        self.renumber_inner(ids, &mut remap, false);
        self.remap_groups(&remap);
        remap
    }

    fn renumber_inner(
        &mut self,
        ids: &mut IdAllocator,
        remap: &mut HashMap<ReflectionId, ReflectionId>,
        include_self: bool,
    ) {
        if include_self {
            let fresh = ids.next_id();
            remap.insert(self.id, fresh);
            self.id = fresh;
        }
        for child in self.owned_nodes_mut() {
            child.renumber_inner(ids, remap, true);
        }
    }

    fn remap_groups(&mut self, remap: &HashMap<ReflectionId, ReflectionId>) {
        for group in &mut self.groups {
            for entry in &mut group.children {
                if let Some(&fresh) = remap.get(entry) {
                    *entry = fresh;
                }
            }
        }
        for child in self.owned_nodes_mut() {
            child.remap_groups(remap);
        }
    }

    fn owned_nodes(&self) -> impl Iterator<Item = &Reflection> {
        self.children
            .iter()
            .chain(self.signatures.iter())
            .chain(self.parameters.iter())
    }

    fn owned_nodes_mut(&mut self) -> impl Iterator<Item = &mut Reflection> {
        self.children
            .iter_mut()
            .chain(self.signatures.iter_mut())
            .chain(self.parameters.iter_mut())
    }
}

// ============================================================================
// Project
// ============================================================================

/// Side-table entry used downstream for source links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolIdEntry {
    pub qualified_name: String,
    pub source_file_name: String,
}

/// The converted project: the root reflection (id 0) plus the symbol id map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(flatten)]
    pub root: Reflection,
    pub symbol_id_map: BTreeMap<ReflectionId, SymbolIdEntry>,
}

impl Project {
    /// Count every node in the tree, the root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.root.walk(&mut |_| count += 1);
        count
    }
}

// ============================================================================
// Tests
// ============================================================================
