//! Inheritance graph: collect base-class edges during the walk, resolve them
//! in one pass afterwards.
//!
//! Edges are keyed by the ancestor's *name* because a subclass may be walked
//! before its base class exists in the tree. Resolution looks every ancestor
//! name up among the registered classes, orders the resolved edges
//! topologically (ancestors first) and then copies members down each edge.
//! Because an ancestor is complete before any of its descendants is
//! processed, multi-level hierarchies compose without recursion through
//! grandparents.
//!
//! ## Member injection
//!
//! For every member of the ancestor:
//! - the descendant has no member of that name: a copy with fresh ids is
//!   appended, attributed through `inheritedFrom` and grouped under the
//!   original's id
//! - the descendant has a member of that name without summary text (its own
//!   or one inherited from an earlier base): the member takes over the
//!   ancestor's documentation and shape, keeping its own id
//! - otherwise the descendant's member stands

use std::collections::{HashMap, HashSet};

use docspec_core::grouping::{classify, sort_groups_and_children};
use docspec_core::ids::{IdAllocator, ReflectionId};
use docspec_core::reflection::{Reflection, ReflectionRef};
use thiserror::Error;
use tracing::debug;

/// Errors that abort inheritance resolution.
#[derive(Debug, Error)]
pub enum InheritanceError {
    /// An inherited member matches no group, so it cannot be presented.
    #[error("cannot determine a group for `{member}` (inherited from `{ancestor}`)")]
    MissingGroup { member: String, ancestor: String },
}

/// Outcome of [`InheritanceGraph::resolve_inheritance`].
#[derive(Debug, Default)]
pub struct Inherited {
    /// Members copied or filled in.
    pub members: usize,
    /// `(original, copy)` id pairs for every node created by copying, in
    /// creation order.
    pub copies: Vec<(ReflectionId, ReflectionId)>,
}

#[derive(Debug, Clone)]
struct Edge {
    ancestor: String,
    descendant: ReflectionId,
}

/// Name-keyed class hierarchy of one conversion run.
#[derive(Debug, Default)]
pub struct InheritanceGraph {
    nodes: HashMap<String, ReflectionId>,
    edges: Vec<Edge>,
}

impl InheritanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that class `descendant` extends a class named `ancestor`.
    pub fn add_edge(&mut self, ancestor: impl Into<String>, descendant: ReflectionId) {
        self.edges.push(Edge {
            ancestor: ancestor.into(),
            descendant,
        });
    }

    /// Make a class available as an ancestor. A later class with the same
    /// name replaces an earlier one.
    pub fn register_node(&mut self, name: impl Into<String>, id: ReflectionId) {
        self.nodes.insert(name.into(), id);
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve every edge against `root`, injecting inherited members.
    ///
    /// Edges to unknown ancestors are dropped.
    pub fn resolve_inheritance(
        &self,
        root: &mut Reflection,
        ids: &mut IdAllocator,
    ) -> Result<Inherited, InheritanceError> {
        let mut resolved: Vec<(ReflectionId, ReflectionId)> = Vec::new();
        for edge in &self.edges {
            match self.nodes.get(&edge.ancestor) {
                Some(&ancestor) if ancestor == edge.descendant => {
                    debug!(class = %edge.ancestor, "ignoring self-inheritance");
                }
                Some(&ancestor) => {
                    if !resolved.contains(&(ancestor, edge.descendant)) {
                        resolved.push((ancestor, edge.descendant));
                    }
                }
                None => {
                    debug!(ancestor = %edge.ancestor, descendant = edge.descendant, "unknown ancestor, edge dropped");
                }
            }
        }

        let paths = root.child_paths();
        let mut inherited = Inherited::default();
        for class in topological_order(&resolved) {
            for &(ancestor, descendant) in resolved.iter().filter(|(_, d)| *d == class) {
                propagate(root, &paths, ancestor, descendant, ids, &mut inherited)?;
            }
        }
        debug!(edges = resolved.len(), injected = inherited.members, "inheritance resolved");
        Ok(inherited)
    }
}

/// Ancestors before descendants; ties keep discovery order.
fn topological_order(edges: &[(ReflectionId, ReflectionId)]) -> Vec<ReflectionId> {
    let mut adjacency: HashMap<ReflectionId, Vec<ReflectionId>> = HashMap::new();
    let mut nodes = Vec::new();
    let mut seen = HashSet::new();
    for &(ancestor, descendant) in edges {
        adjacency.entry(ancestor).or_default().push(descendant);
        for node in [ancestor, descendant] {
            if seen.insert(node) {
                nodes.push(node);
            }
        }
    }

    let mut visited = HashSet::new();
    let mut postorder = Vec::new();
    for &start in nodes.iter().rev() {
        if !visited.insert(start) {
            continue;
        }
        let mut stack: Vec<(ReflectionId, usize)> = vec![(start, 0)];
        while let Some(&(node, index)) = stack.last() {
            let next = adjacency.get(&node).and_then(|children| children.get(index));
            match next {
                Some(&child) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if visited.insert(child) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    postorder.push(node);
                    stack.pop();
                }
            }
        }
    }
    postorder.reverse();
    postorder
}

/// Copy `ancestor`'s members into `descendant` and link the two.
fn propagate(
    root: &mut Reflection,
    paths: &HashMap<ReflectionId, Vec<usize>>,
    ancestor: ReflectionId,
    descendant: ReflectionId,
    ids: &mut IdAllocator,
    inherited: &mut Inherited,
) -> Result<(), InheritanceError> {
    let (Some(ancestor_path), Some(descendant_path)) = (paths.get(&ancestor), paths.get(&descendant))
    else {
        debug!(ancestor, descendant, "class no longer in tree, edge skipped");
        return Ok(());
    };

    let Some((ancestor_name, members)) = root
        .descendant(ancestor_path)
        .map(|node| (node.name.clone(), node.children.clone()))
    else {
        return Ok(());
    };

    let Some(target) = root.descendant_mut(descendant_path) else {
        return Ok(());
    };
    let descendant_name = target.name.clone();
    target
        .extended_types
        .push(ReflectionRef::new(ancestor_name.as_str(), ancestor));

    for member in members {
        let origin = member.inherited_from.clone().unwrap_or_else(|| {
            ReflectionRef::new(format!("{}.{}", ancestor_name, member.name), member.id)
        });

        match target.children.iter().position(|child| child.name == member.name) {
            None => {
                let group = classify(&member).ok_or_else(|| InheritanceError::MissingGroup {
                    member: member.name.clone(),
                    ancestor: ancestor_name.clone(),
                })?;
                let mut copy = member;
                record_copies(inherited, copy.renumber(ids));
                if let Some(origin_id) = origin.target {
                    target.add_to_group(&group.title, origin_id);
                }
                copy.inherited_from = Some(origin);
                target.children.push(copy);
                inherited.members += 1;
            }
            Some(index) => {
                let own = &mut target.children[index];
                if own.has_summary() {
                    continue;
                }
                let id = own.id;
                let previous_origin = own.inherited_from.as_ref().and_then(|r| r.target);
                *own = member;
                own.id = id;
                record_copies(inherited, own.renumber_owned(ids));
                let new_origin = origin.target;
                own.inherited_from = Some(origin);
                inherited.members += 1;

                // Inherited copies are grouped under their origin's id.
                if let (Some(previous), Some(fresh)) = (previous_origin, new_origin) {
                    for group in &mut target.groups {
                        for entry in group.children.iter_mut().filter(|e| **e == previous) {
                            *entry = fresh;
                        }
                    }
                }
            }
        }
    }
    sort_groups_and_children(target);

    if let Some(ancestor_node) = root.descendant_mut(ancestor_path) {
        ancestor_node
            .extended_by
            .push(ReflectionRef::new(descendant_name, descendant));
    }
    Ok(())
}

fn record_copies(inherited: &mut Inherited, remap: HashMap<ReflectionId, ReflectionId>) {
    let mut pairs: Vec<_> = remap.into_iter().collect();
    pairs.sort_unstable_by_key(|&(_, copy)| copy);
    inherited.copies.extend(pairs);
}

// ============================================================================
// Tests
// ============================================================================
