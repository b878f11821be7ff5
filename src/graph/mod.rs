//! Dependency graph of code units
//!
//! Types are keyed by fully-qualified name in a hash map; edges are stored
//! as names on the referring type. A raw referenced name becomes a resolved
//! link once a type of that name exists. Types are only ever added during a
//! run, never removed.

pub mod extraction;
pub mod names;
pub mod supplemental;

use crate::models::{ErrorKind, Problem};
use crate::problems::ProblemSink;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::debug;

/// A code unit node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Type {
    pub name: String,
    /// Raw referenced names, without self-references and ignored names
    pub reference_names: BTreeSet<String>,
    /// Referenced names that resolved to a known type
    pub references: BTreeSet<String>,
    /// Owning component, set by correlation
    pub component: Option<String>,
}

impl Type {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Referenced names with no matching type
    pub fn unresolved_names(&self) -> impl Iterator<Item = &str> {
        self.reference_names
            .difference(&self.references)
            .map(String::as_str)
    }
}

/// All known types plus the names nothing resolved to
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: FxHashMap<String, Type>,
    unresolved: BTreeSet<String>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The type called `name`, created on first sight
    pub fn entry(&mut self, name: &str) -> &mut Type {
        self.types
            .entry(name.to_string())
            .or_insert_with(|| Type::new(name))
    }

    /// Add a raw edge. Self-references are dropped.
    pub fn add_reference(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.entry(from).reference_names.insert(to.to_string());
    }

    pub(crate) fn set_component(&mut self, name: &str, component: &str) {
        if let Some(ty) = self.types.get_mut(name) {
            ty.component = Some(component.to_string());
        }
    }

    /// All types ordered by name
    pub fn sorted(&self) -> Vec<&Type> {
        let mut types: Vec<&Type> = self.types.values().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types
    }

    /// Raw names that matched no type after the last resolution
    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    pub fn is_unresolved(&self, name: &str) -> bool {
        self.unresolved.contains(name)
    }

    pub(crate) fn mark_resolved(&mut self, name: &str) {
        self.unresolved.remove(name);
    }

    /// Recompute every type's resolved links and the unresolved-name set.
    ///
    /// Returns the number of unresolved names.
    pub fn resolve_references(&mut self) -> usize {
        let known: FxHashSet<String> = self.types.keys().cloned().collect();
        let mut unresolved = BTreeSet::new();
        for ty in self.types.values_mut() {
            ty.references.clear();
            for name in &ty.reference_names {
                if known.contains(name) {
                    ty.references.insert(name.clone());
                } else {
                    unresolved.insert(name.clone());
                }
            }
        }
        self.unresolved = unresolved;
        debug!(
            "Resolved references across {} type(s); {} unresolved name(s)",
            self.types.len(),
            self.unresolved.len()
        );
        self.unresolved.len()
    }

    /// Report one `UnresolvedReference` per referring type and missing name
    pub fn report_unresolved(&self, sink: &mut ProblemSink) {
        for ty in self.sorted() {
            for name in ty.unresolved_names() {
                sink.add(
                    Problem::new(
                        ErrorKind::UnresolvedReference,
                        format!("{}:{}", ty.name, name),
                    )
                    .with_detail(format!(
                        "{} references {}, which matches no known type",
                        ty.name, name
                    )),
                );
            }
        }
    }
}
