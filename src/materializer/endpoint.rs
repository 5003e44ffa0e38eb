//! Relationship endpoint resolution
//!
//! Maps the textual `source`/`target` of a relationship descriptor to a
//! stored node. Strategies run in order and stop at the first hit:
//! 1. Descriptor id (the analyzer's own id stored on the node)
//! 2. Node id
//! 3. `type.name`, split on the first `.`
//! 4. For `module.` references, substring match of the module name
//!    against node type or name

use crate::Result;
use crate::node::GraphNode;
use crate::storage::GraphStore;
use serde::Serialize;

const MODULE_PREFIX: &str = "module.";

/// Strategy that resolved an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    DescriptorId,
    NodeId,
    TypeAndName,
    ModuleFuzzy,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DescriptorId => "descriptor_id",
            Self::NodeId => "node_id",
            Self::TypeAndName => "type_and_name",
            Self::ModuleFuzzy => "module_fuzzy",
        }
    }

    /// Default cascade order
    pub fn all() -> &'static [ResolutionStrategy] {
        &[
            Self::DescriptorId,
            Self::NodeId,
            Self::TypeAndName,
            Self::ModuleFuzzy,
        ]
    }

    /// Try this strategy alone
    pub fn lookup(&self, store: &dyn GraphStore, reference: &str) -> Result<Option<GraphNode>> {
        match self {
            Self::DescriptorId => store.find_node_by_resource_id(reference),
            Self::NodeId => store.find_node_by_id(reference),
            Self::TypeAndName => match reference.split_once('.') {
                Some((node_type, name)) if !node_type.is_empty() && !name.is_empty() => {
                    store.find_node_by_type_and_name(node_type, name)
                }
                _ => Ok(None),
            },
            Self::ModuleFuzzy => match reference.strip_prefix(MODULE_PREFIX) {
                Some(rest) => {
                    let name = rest.split('.').next().unwrap_or_default();
                    store.find_node_by_fuzzy_name(name)
                }
                None => Ok(None),
            },
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered list of strategies, short-circuiting on the first match
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    strategies: Vec<ResolutionStrategy>,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointResolver {
    pub fn new() -> Self {
        Self::with_strategies(ResolutionStrategy::all().to_vec())
    }

    pub fn with_strategies(strategies: Vec<ResolutionStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[ResolutionStrategy] {
        &self.strategies
    }

    /// Resolve a reference to a node and the strategy that found it
    pub fn resolve(&self, store: &dyn GraphStore, reference: &str) -> Result<Option<(GraphNode, ResolutionStrategy)>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }
        for strategy in &self.strategies {
            if let Some(node) = strategy.lookup(store, reference)? {
                tracing::debug!("Resolved '{}' to {} via {}", reference, node.id, strategy);
                return Ok(Some((node, *strategy)));
            }
        }
        Ok(None)
    }
}
