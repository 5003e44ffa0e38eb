//! Graph nodes - persisted resources
//!
//! A node is derived from one analyzer resource descriptor. Its category
//! comes from a keyword table over the resource type, independent of the
//! grouping categories used in the context document.

use crate::analyzer::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Coarse category stored on every node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Database,
    LoadBalancing,
    Security,
    Network,
    Container,
    Compute,
    Storage,
    Monitoring,
    Other,
}

impl NodeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Database => "database",
            NodeCategory::LoadBalancing => "load_balancing",
            NodeCategory::Security => "security",
            NodeCategory::Network => "network",
            NodeCategory::Container => "container",
            NodeCategory::Compute => "compute",
            NodeCategory::Storage => "storage",
            NodeCategory::Monitoring => "monitoring",
            NodeCategory::Other => "other",
        }
    }

    /// Categories in match order; the first keyword hit wins
    pub fn all() -> &'static [NodeCategory] {
        &[
            NodeCategory::Database,
            NodeCategory::LoadBalancing,
            NodeCategory::Security,
            NodeCategory::Network,
            NodeCategory::Container,
            NodeCategory::Compute,
            NodeCategory::Storage,
            NodeCategory::Monitoring,
            NodeCategory::Other,
        ]
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            NodeCategory::Database => &["db_", "rds", "dynamodb", "database", "sql", "cosmosdb", "elasticache", "redis"],
            NodeCategory::LoadBalancing => &["lb", "load_balancer", "elb", "alb", "application_gateway", "forwarding_rule"],
            NodeCategory::Security => &["security_group", "iam", "kms", "firewall", "key_vault", "acl", "waf", "certificate", "secret"],
            NodeCategory::Network => &["vpc", "subnet", "gateway", "route", "network", "eip", "public_ip", "dns"],
            NodeCategory::Container => &["ecs", "eks", "ecr", "kubernetes", "container", "aks", "gke"],
            NodeCategory::Compute => &["instance", "virtual_machine", "lambda", "function", "autoscaling", "launch_template"],
            NodeCategory::Storage => &["s3", "bucket", "ebs", "efs", "storage", "disk", "volume"],
            NodeCategory::Monitoring => &["cloudwatch", "monitor", "log", "alarm", "sns", "insights"],
            NodeCategory::Other => &[],
        }
    }

    /// Category of a resource type by substring keyword
    pub fn classify(resource_type: &str) -> NodeCategory {
        let resource_type = resource_type.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|category| category.keywords().iter().any(|k| resource_type.contains(k)))
            .unwrap_or(NodeCategory::Other)
    }
}

impl FromStr for NodeCategory {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| crate::Error::MalformedDescriptor(format!("Unknown node category: {}", s)))
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resource node in the persisted graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable id, unique in the store
    pub id: String,
    /// The analyzer's own id for the resource, if it gave one
    pub resource_id: Option<String>,
    pub name: String,
    pub node_type: String,
    /// Lower-cased provider
    pub provider: String,
    pub category: NodeCategory,
    /// Property bag serialized to a single JSON string
    pub properties: String,
}

impl GraphNode {
    /// Build a node from a validated descriptor
    pub fn from_descriptor(descriptor: &ResourceDescriptor) -> Self {
        let resource_id = non_empty(&descriptor.id);
        let node_type = non_empty(&descriptor.resource_type).unwrap_or_default();
        let name = non_empty(&descriptor.name).unwrap_or_default();

        let id = stable_id(descriptor);
        let provider = normalize_provider(descriptor.provider.as_deref(), &node_type);
        let category = NodeCategory::classify(&node_type);

        Self {
            id,
            resource_id,
            name,
            category,
            provider,
            node_type,
            properties: descriptor.properties.to_string(),
        }
    }

    /// Deserialize the property bag
    pub fn properties_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.properties).unwrap_or(serde_json::Value::Null)
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Descriptor id, else `type.name`, else a content hash
pub fn stable_id(descriptor: &ResourceDescriptor) -> String {
    if let Some(id) = non_empty(&descriptor.id) {
        return id;
    }
    if let (Some(t), Some(n)) = (non_empty(&descriptor.resource_type), non_empty(&descriptor.name)) {
        return format!("{}.{}", t, n);
    }
    let serialized = serde_json::to_string(descriptor).unwrap_or_default();
    let hash = blake3::hash(serialized.as_bytes()).to_hex();
    format!("resource_{}", &hash[..16])
}

/// Lower-case the provider and keep its last path segment
/// (`registry.terraform.io/hashicorp/aws` becomes `aws`). Falls back to
/// the type prefix when no provider was given.
pub fn normalize_provider(provider: Option<&str>, resource_type: &str) -> String {
    let given = provider
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .and_then(|p| p.trim_end_matches('/').rsplit('/').next())
        .map(|p| p.trim_matches('"').to_lowercase())
        .filter(|p| !p.is_empty());

    given
        .or_else(|| crate::grouping::provider_of(resource_type))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_from_descriptor() {
        let mut descriptor = ResourceDescriptor::new("aws_db_instance", "db");
        descriptor.provider = Some("AWS".to_string());
        descriptor.properties = json!({"engine": "postgres", "tags": {"Tier": "data"}});

        let node = GraphNode::from_descriptor(&descriptor);
        assert_eq!(node.id, "aws_db_instance.db");
        assert_eq!(node.resource_id.as_deref(), Some("aws_db_instance.db"));
        assert_eq!(node.provider, "aws");
        assert_eq!(node.category, NodeCategory::Database);
        assert_eq!(node.properties_json()["tags"]["Tier"], "data");
    }

    #[test]
    fn test_stable_id_fallbacks() {
        let mut descriptor = ResourceDescriptor::new("aws_vpc", "main");
        descriptor.id = None;
        assert_eq!(stable_id(&descriptor), "aws_vpc.main");

        descriptor.resource_type = None;
        let synthetic = stable_id(&descriptor);
        assert!(synthetic.starts_with("resource_"));
        assert_eq!(synthetic.len(), "resource_".len() + 16);
        assert_eq!(synthetic, stable_id(&descriptor));
    }

    #[test]
    fn test_category_match_order() {
        assert_eq!(NodeCategory::classify("aws_db_subnet_group"), NodeCategory::Database);
        assert_eq!(NodeCategory::classify("aws_lb_listener"), NodeCategory::LoadBalancing);
        assert_eq!(NodeCategory::classify("aws_security_group"), NodeCategory::Security);
        assert_eq!(NodeCategory::classify("aws_subnet"), NodeCategory::Network);
        assert_eq!(NodeCategory::classify("aws_instance"), NodeCategory::Compute);
        assert_eq!(NodeCategory::classify("aws_s3_bucket"), NodeCategory::Storage);
        assert_eq!(NodeCategory::classify("random_pet"), NodeCategory::Other);
        assert_eq!("load_balancing".parse::<NodeCategory>().unwrap(), NodeCategory::LoadBalancing);
    }

    #[test]
    fn test_normalize_provider() {
        assert_eq!(normalize_provider(Some("registry.terraform.io/hashicorp/AWS"), "x"), "aws");
        assert_eq!(normalize_provider(None, "azurerm_subnet"), "azurerm");
        assert_eq!(normalize_provider(Some("  "), "standalone"), "unknown");
    }
}
