//! Group classification and deterministic ordering.
//!
//! Every declaration may belong to one named presentation group of its
//! parent ("Classes", "Methods", ...). An explicit `@docs_group("...")`
//! decorator always wins; otherwise the first matching entry of
//! [`GROUP_PREDICATES`] decides.
//!
//! Sorting is deterministic: group entries sort by the referenced child's
//! name, groups sort by [`GROUP_ORDER`] with lexical fallback.

use std::cmp::Ordering;

use crate::ids::ReflectionId;
use crate::reflection::{Reflection, ReflectionKind};

/// Decorator that assigns an explicit group.
pub const GROUP_DECORATOR: &str = "docs_group";

/// Canonical display order of well-known groups.
pub const GROUP_ORDER: &[&str] = &[
    "Classes",
    "Abstract classes",
    "Data structures",
    "Errors",
    "Functions",
    "Constructors",
    "Methods",
    "Properties",
    "Constants",
    "Enumeration members",
];

/// Base classes that mark a class as a plain data structure.
const DATA_STRUCTURE_BASES: &[&str] = &["BaseModel", "TypedDict"];

type GroupPredicate = fn(&Reflection) -> bool;

/// Structural group rules, evaluated in order.
pub const GROUP_PREDICATES: &[(&str, GroupPredicate)] = &[
    ("Data structures", is_data_structure),
    ("Errors", is_error_class),
    ("Classes", |r| r.kind == ReflectionKind::Class),
    ("Methods", |r| r.kind == ReflectionKind::Method),
    ("Constructors", |r| r.kind == ReflectionKind::Constructor),
    ("Properties", |r| r.kind == ReflectionKind::Property),
    ("Constants", |r| r.kind == ReflectionKind::Enum),
    ("Enumeration members", |r| r.kind == ReflectionKind::EnumMember),
];

fn is_data_structure(reflection: &Reflection) -> bool {
    reflection
        .bases
        .iter()
        .any(|base| DATA_STRUCTURE_BASES.contains(&base.as_str()))
        || reflection.has_decoration("dataclass")
}

fn is_error_class(reflection: &Reflection) -> bool {
    reflection.kind == ReflectionKind::Class && reflection.name.to_lowercase().ends_with("error")
}

/// Where a group assignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSource {
    /// An explicit `@docs_group` decorator.
    Annotation,
    /// A structural rule from [`GROUP_PREDICATES`].
    Predicate,
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub title: String,
    pub source: GroupSource,
}

/// Determine the group a declaration belongs to.
///
/// Returns `None` when neither a decorator nor any predicate applies.
pub fn classify(reflection: &Reflection) -> Option<GroupAssignment> {
    let annotated = reflection
        .decorations
        .iter()
        .find(|decoration| decoration.name == GROUP_DECORATOR)
        .and_then(|decoration| decoration.literal_arg());
    if let Some(title) = annotated {
        return Some(GroupAssignment {
            title: title.to_string(),
            source: GroupSource::Annotation,
        });
    }

    GROUP_PREDICATES
        .iter()
        .find(|(_, predicate)| predicate(reflection))
        .map(|(title, _)| GroupAssignment {
            title: (*title).to_string(),
            source: GroupSource::Predicate,
        })
}

/// Compare two group titles.
///
/// Titles that both appear in [`GROUP_ORDER`] compare by position; any pair
/// involving an unlisted title compares lexically.
pub fn compare_groups(a: &str, b: &str) -> Ordering {
    let position = |title: &str| GROUP_ORDER.iter().position(|known| *known == title);
    match (position(a), position(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}

/// Sort each group's entries by child name, then the groups themselves.
///
/// Group entries resolve to a child either by id or through the child's
/// `inheritedFrom` target, since inherited members are listed under their
/// origin id. Both sorts are stable, so running this twice is a no-op.
pub fn sort_groups_and_children(reflection: &mut Reflection) {
    let mut groups = std::mem::take(&mut reflection.groups);
    for group in &mut groups {
        group.children.sort_by(|a, b| {
            entry_name(reflection, *a).cmp(&entry_name(reflection, *b))
        });
    }
    insertion_sort_by(&mut groups, |a, b| compare_groups(&a.title, &b.title));
    reflection.groups = groups;
}

fn entry_name(reflection: &Reflection, id: ReflectionId) -> &str {
    reflection
        .find_child_by_group_entry(id)
        .map(|child| child.name.as_str())
        .unwrap_or("")
}

/// Stable insertion sort.
///
/// [`compare_groups`] mixes positional and lexical ordering and is not a
/// total order over arbitrary titles, so the standard library sorts (which
/// may panic on inconsistent comparators) are avoided here.
fn insertion_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
