//! Storage Layer - graph persistence
//!
//! The materializer talks to a [`GraphStore`]; SQLite is the shipped
//! implementation with tables:
//! - graph_nodes(id, resource_id, name, type, provider, category, properties)
//! - graph_edges(source_id, target_id, type, description, confidence)

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::Result;
use crate::edge::GraphEdge;
use crate::node::GraphNode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Operations the materializer needs from a graph store.
///
/// Each call is an independent unit of work; nothing here is transactional
/// across calls.
pub trait GraphStore {
    /// Delete every managed node and edge, returning the number of nodes removed
    fn clear_graph(&self) -> Result<usize>;

    /// Insert a node or update the node with the same id
    fn upsert_node(&self, node: &GraphNode) -> Result<()>;

    /// Insert an edge or update the one with the same source, target and type
    fn upsert_edge(&self, edge: &GraphEdge) -> Result<()>;

    /// Create secondary indexes, returning how many statements ran
    fn create_indexes(&self) -> Result<usize>;

    fn find_node_by_resource_id(&self, resource_id: &str) -> Result<Option<GraphNode>>;

    fn find_node_by_id(&self, id: &str) -> Result<Option<GraphNode>>;

    fn find_node_by_type_and_name(&self, node_type: &str, name: &str) -> Result<Option<GraphNode>>;

    /// First node (by id) whose type or name contains `fragment`
    fn find_node_by_fuzzy_name(&self, fragment: &str) -> Result<Option<GraphNode>>;

    fn count_nodes(&self) -> Result<usize>;

    fn count_edges(&self) -> Result<usize>;

    fn stats(&self) -> Result<GraphStats>;

    fn edges_from(&self, node_id: &str) -> Result<Vec<GraphEdge>>;

    fn edges_to(&self, node_id: &str) -> Result<Vec<GraphEdge>>;
}

/// Graph statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub nodes_by_category: BTreeMap<String, usize>,
    pub edges_by_type: BTreeMap<String, usize>,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph Statistics:")?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        for (category, count) in &self.nodes_by_category {
            writeln!(f, "    {}: {}", category, count)?;
        }
        writeln!(f, "  Edges: {}", self.edges)?;
        for (edge_type, count) in &self.edges_by_type {
            writeln!(f, "    {}: {}", edge_type, count)?;
        }
        Ok(())
    }
}
