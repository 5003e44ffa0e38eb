//! Graph edges - typed relationships between resource nodes
//!
//! Relationship types arrive as free text from the analyzer ("depends on",
//! "routes-to", ...) and are sanitized into upper-snake identifiers
//! before storage.

use crate::analyzer::RelationshipDescriptor;
use serde::{Deserialize, Serialize};

/// Type used when sanitization leaves nothing
pub const FALLBACK_RELATIONSHIP_TYPE: &str = "RELATED_TO";

/// Sanitize a relationship type: uppercase, collapse runs of
/// non-alphanumeric characters to one `_`, trim leading and trailing `_`.
pub fn sanitize_relationship_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c.to_ascii_uppercase());
        } else {
            pending_separator = true;
        }
    }

    if out.is_empty() {
        FALLBACK_RELATIONSHIP_TYPE.to_string()
    } else {
        out
    }
}

/// A relationship in the resource graph.
///
/// Confidence is clamped to `[0, 1]`; `1.0` means the analyzer was certain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id
    pub source_id: String,
    /// Target node id
    pub target_id: String,
    /// Sanitized relationship type
    pub edge_type: String,
    pub description: String,
    pub confidence: f64,
}

impl GraphEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, edge_type: &str) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type: sanitize_relationship_type(edge_type),
            description: String::new(),
            confidence: 1.0,
        }
    }

    /// Build an edge between resolved node ids from an analyzer descriptor
    pub fn from_descriptor(source_id: &str, target_id: &str, descriptor: &RelationshipDescriptor) -> Self {
        Self::new(source_id, target_id, &descriptor.relationship_type)
            .with_description(descriptor.description.clone())
            .with_confidence(descriptor.confidence)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Check if the analyzer reported full certainty
    pub fn is_certain(&self) -> bool {
        (self.confidence - 1.0).abs() < f64::EPSILON
    }
}

impl PartialEq for GraphEdge {
    fn eq(&self, other: &Self) -> bool {
        self.source_id == other.source_id
            && self.target_id == other.target_id
            && self.edge_type == other.edge_type
    }
}

impl Eq for GraphEdge {}

impl std::hash::Hash for GraphEdge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source_id.hash(state);
        self.target_id.hash(state);
        self.edge_type.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_relationship_type() {
        assert_eq!(sanitize_relationship_type("depends on"), "DEPENDS_ON");
        assert_eq!(sanitize_relationship_type("routes-to"), "ROUTES_TO");
        assert_eq!(sanitize_relationship_type("  --uses//  the::db--"), "USES_THE_DB");
        assert_eq!(sanitize_relationship_type("CONNECTS_TO"), "CONNECTS_TO");
        assert_eq!(sanitize_relationship_type("a__b"), "A_B");
        assert_eq!(sanitize_relationship_type(""), FALLBACK_RELATIONSHIP_TYPE);
        assert_eq!(sanitize_relationship_type("-> ~"), FALLBACK_RELATIONSHIP_TYPE);
    }

    #[test]
    fn test_confidence_clamped() {
        let edge = GraphEdge::new("a", "b", "uses").with_confidence(1.7);
        assert!(edge.is_certain());
        let edge = GraphEdge::new("a", "b", "uses").with_confidence(-0.2);
        assert_eq!(edge.confidence, 0.0);
    }

    #[test]
    fn test_from_descriptor() {
        let mut descriptor = RelationshipDescriptor::new("x.a", "y.b", "depends on", 0.9);
        descriptor.description = "reads from".to_string();
        let edge = GraphEdge::from_descriptor("x.a", "y.b", &descriptor);
        assert_eq!(edge.edge_type, "DEPENDS_ON");
        assert_eq!(edge.description, "reads from");
        assert!(!edge.is_certain());
        assert_eq!(edge, GraphEdge::new("x.a", "y.b", "DEPENDS_ON"));
    }
}
