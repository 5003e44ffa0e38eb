//! Dependency Map - classified reference edges between declarations
//!
//! Edges are derived purely from lexical matching inside resource blocks and
//! are partitioned by what the target is:
//! - `Resource`: another resource or a data source
//! - `Module`: a module output
//! - `Variable`: an input variable or a local value
//! - `Output`: an output value
//! - `Implicit`: keyword heuristic, not a literal reference

pub mod blocks;
pub mod resolver;

pub use resolver::{ReferenceResolver, ResolverOptions};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Category of a recorded dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyCategory {
    Resource,
    Module,
    Variable,
    Output,
    Implicit,
}

impl DependencyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyCategory::Resource => "resource",
            DependencyCategory::Module => "module",
            DependencyCategory::Variable => "variable",
            DependencyCategory::Output => "output",
            DependencyCategory::Implicit => "implicit",
        }
    }

    pub fn all() -> &'static [DependencyCategory] {
        &[
            DependencyCategory::Resource,
            DependencyCategory::Module,
            DependencyCategory::Variable,
            DependencyCategory::Output,
            DependencyCategory::Implicit,
        ]
    }
}

impl std::fmt::Display for DependencyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Referenced ids of one resource, per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceDependencies {
    pub resources: BTreeSet<String>,
    pub modules: BTreeSet<String>,
    pub variables: BTreeSet<String>,
    pub outputs: BTreeSet<String>,
    pub implicit: BTreeSet<String>,
}

impl ResourceDependencies {
    pub fn get(&self, category: DependencyCategory) -> &BTreeSet<String> {
        match category {
            DependencyCategory::Resource => &self.resources,
            DependencyCategory::Module => &self.modules,
            DependencyCategory::Variable => &self.variables,
            DependencyCategory::Output => &self.outputs,
            DependencyCategory::Implicit => &self.implicit,
        }
    }

    fn get_mut(&mut self, category: DependencyCategory) -> &mut BTreeSet<String> {
        match category {
            DependencyCategory::Resource => &mut self.resources,
            DependencyCategory::Module => &mut self.modules,
            DependencyCategory::Variable => &mut self.variables,
            DependencyCategory::Output => &mut self.outputs,
            DependencyCategory::Implicit => &mut self.implicit,
        }
    }

    /// Union of all categories
    pub fn combined(&self) -> BTreeSet<String> {
        DependencyCategory::all()
            .iter()
            .flat_map(|c| self.get(*c).iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        DependencyCategory::all().iter().all(|c| self.get(*c).is_empty())
    }
}

/// A single dependency edge, as listed in summaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub category: DependencyCategory,
}

/// Per-resource dependencies for one import
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyMap {
    entries: BTreeMap<String, ResourceDependencies>,
    /// Resource ids in the order they were first recorded
    order: Vec<String>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `from -> to`; returns false when the edge was already present
    pub fn record(&mut self, from: &str, to: impl Into<String>, category: DependencyCategory) -> bool {
        self.entry(from).get_mut(category).insert(to.into())
    }

    /// Make sure `from` has an entry even when it references nothing
    pub fn touch(&mut self, from: &str) {
        self.entry(from);
    }

    fn entry(&mut self, from: &str) -> &mut ResourceDependencies {
        if !self.entries.contains_key(from) {
            self.order.push(from.to_string());
        }
        self.entries.entry(from.to_string()).or_default()
    }

    pub fn get(&self, resource_id: &str) -> Option<&ResourceDependencies> {
        self.entries.get(resource_id)
    }

    /// Combined view of everything `resource_id` depends on
    pub fn combined(&self, resource_id: &str) -> BTreeSet<String> {
        self.entries
            .get(resource_id)
            .map(ResourceDependencies::combined)
            .unwrap_or_default()
    }

    /// Resources with their dependencies, in encounter order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourceDependencies)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|deps| (id, deps)))
    }

    /// Every edge, in encounter order of the source resource
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges = Vec::new();
        for (from, deps) in self.iter() {
            for category in DependencyCategory::all() {
                for to in deps.get(*category) {
                    edges.push(DependencyEdge {
                        from: from.clone(),
                        to: to.clone(),
                        category: *category,
                    });
                }
            }
        }
        edges
    }

    /// Aggregate number of recorded edges (diagnostic)
    pub fn total_count(&self) -> usize {
        self.entries
            .values()
            .map(|deps| DependencyCategory::all().iter().map(|c| deps.get(*c).len()).sum::<usize>())
            .sum()
    }

    pub fn count(&self, category: DependencyCategory) -> usize {
        self.entries.values().map(|deps| deps.get(category).len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
