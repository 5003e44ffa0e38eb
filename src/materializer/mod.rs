//! Graph Materializer - writes analyzer output into the graph store
//!
//! Two entry points:
//! - [`GraphMaterializer::materialize`] replaces the stored graph: clear,
//!   then nodes, then edges, then secondary indexes.
//! - [`GraphMaterializer::merge`] upserts without deleting anything.
//!
//! Every node and edge write is independent. A failed write is logged and
//! counted; only a failure to clear the previous graph aborts the run.
//! Running both phases against a store shared with another import at the
//! same time is not supported.

pub mod endpoint;

pub use endpoint::{EndpointResolver, ResolutionStrategy};

use crate::analyzer::{AnalysisOutput, RelationshipDescriptor};
use crate::edge::GraphEdge;
use crate::node::GraphNode;
use crate::storage::GraphStore;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// How a materialization treats the existing graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterializeMode {
    /// Delete the prior graph, then write
    #[default]
    Replace,
    /// Upsert into the existing graph
    Merge,
}

impl MaterializeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterializeMode::Replace => "replace",
            MaterializeMode::Merge => "merge",
        }
    }
}

impl std::fmt::Display for MaterializeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-category outcome counts of one materialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub mode: MaterializeMode,
    pub cleared_nodes: usize,
    pub nodes_written: usize,
    pub nodes_failed: usize,
    pub edges_written: usize,
    pub edges_unresolved: usize,
    pub edges_failed: usize,
    pub indexes_created: usize,
    /// Endpoints resolved per strategy
    pub resolved_by: BTreeMap<ResolutionStrategy, usize>,
}

pub struct GraphMaterializer<'a> {
    store: &'a dyn GraphStore,
    resolver: EndpointResolver,
}

impl<'a> GraphMaterializer<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            resolver: EndpointResolver::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: EndpointResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the stored graph with `output`
    pub fn materialize(&self, output: &AnalysisOutput) -> Result<MaterializeReport> {
        self.run(output, MaterializeMode::Replace)
    }

    /// Upsert `output` into the stored graph, keeping existing data
    pub fn merge(&self, output: &AnalysisOutput) -> Result<MaterializeReport> {
        self.run(output, MaterializeMode::Merge)
    }

    pub fn run(&self, output: &AnalysisOutput, mode: MaterializeMode) -> Result<MaterializeReport> {
        let mut report = MaterializeReport {
            mode,
            ..Default::default()
        };

        if mode == MaterializeMode::Replace {
            report.cleared_nodes = self.store.clear_graph().map_err(|e| {
                tracing::error!("Failed to clear graph: {}", e);
                Error::ImportFailed(format!("could not clear existing graph: {}", e))
            })?;
            tracing::debug!("Cleared {} nodes", report.cleared_nodes);
        }

        self.write_nodes(output, &mut report);
        self.write_edges(output, &mut report);

        match self.store.create_indexes() {
            Ok(count) => report.indexes_created = count,
            Err(e) => tracing::error!("Failed to create graph indexes: {}", e),
        }

        tracing::info!(
            "Materialized graph ({}): {} nodes ({} failed), {} edges ({} unresolved, {} failed)",
            mode,
            report.nodes_written,
            report.nodes_failed,
            report.edges_written,
            report.edges_unresolved,
            report.edges_failed
        );
        Ok(report)
    }

    fn write_nodes(&self, output: &AnalysisOutput, report: &mut MaterializeReport) {
        for descriptor in &output.resources {
            let node = GraphNode::from_descriptor(descriptor);
            match self.store.upsert_node(&node) {
                Ok(()) => report.nodes_written += 1,
                Err(e) => {
                    tracing::warn!("Failed to write node {}: {}", node.id, e);
                    report.nodes_failed += 1;
                }
            }
        }
    }

    fn write_edges(&self, output: &AnalysisOutput, report: &mut MaterializeReport) {
        for relationship in &output.relationships {
            let (source, target) = match self.endpoints(relationship, report) {
                Ok(Some(pair)) => pair,
                Ok(None) => {
                    let err = Error::UnresolvedEndpoint(format!(
                        "{} -> {}",
                        relationship.source, relationship.target
                    ));
                    tracing::warn!("Skipping relationship: {}", err);
                    report.edges_unresolved += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to resolve relationship {} -> {}: {}",
                        relationship.source,
                        relationship.target,
                        e
                    );
                    report.edges_failed += 1;
                    continue;
                }
            };

            let edge = GraphEdge::from_descriptor(&source, &target, relationship);
            match self.store.upsert_edge(&edge) {
                Ok(()) => report.edges_written += 1,
                Err(e) => {
                    tracing::warn!("Failed to write edge {} -> {}: {}", source, target, e);
                    report.edges_failed += 1;
                }
            }
        }
    }

    fn endpoints(
        &self,
        relationship: &RelationshipDescriptor,
        report: &mut MaterializeReport,
    ) -> Result<Option<(String, String)>> {
        let Some(source) = self.endpoint(&relationship.source, report)? else {
            return Ok(None);
        };
        let Some(target) = self.endpoint(&relationship.target, report)? else {
            return Ok(None);
        };
        Ok(Some((source, target)))
    }

    fn endpoint(&self, reference: &str, report: &mut MaterializeReport) -> Result<Option<String>> {
        Ok(self.resolver.resolve(self.store, reference)?.map(|(node, strategy)| {
            *report.resolved_by.entry(strategy).or_default() += 1;
            node.id
        }))
    }
}
