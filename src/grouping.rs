//! Logical Grouper - partitions resources by provider, then functional category
//!
//! Ordering is fixed and deterministic:
//! - providers: `aws`, then `azurerm`, then alphabetical
//! - categories: Network, Security, Compute, Container, Database, Storage,
//!   Load_Balancing, Monitoring, Other
//! - a trailing "Miscellaneous" group for resources without a provider prefix
//!
//! A final stable pass moves groups whose name mentions "network" to the
//! front, followed by groups mentioning "security". This is a naming
//! heuristic, not a dependency order.

use crate::declaration::DeclarationRegistry;
use serde::Serialize;
use std::collections::BTreeMap;

const PRIORITY_PROVIDERS: [&str; 2] = ["aws", "azurerm"];

pub const MISCELLANEOUS_GROUP: &str = "Miscellaneous";

/// Functional category of a resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ResourceCategory {
    Network,
    Security,
    Compute,
    Container,
    Database,
    Storage,
    LoadBalancing,
    Monitoring,
    Other,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Network => "Network",
            ResourceCategory::Security => "Security",
            ResourceCategory::Compute => "Compute",
            ResourceCategory::Container => "Container",
            ResourceCategory::Database => "Database",
            ResourceCategory::Storage => "Storage",
            ResourceCategory::LoadBalancing => "Load_Balancing",
            ResourceCategory::Monitoring => "Monitoring",
            ResourceCategory::Other => "Other",
        }
    }

    /// Categories in display order
    pub fn all() -> &'static [ResourceCategory] {
        &[
            ResourceCategory::Network,
            ResourceCategory::Security,
            ResourceCategory::Compute,
            ResourceCategory::Container,
            ResourceCategory::Database,
            ResourceCategory::Storage,
            ResourceCategory::LoadBalancing,
            ResourceCategory::Monitoring,
            ResourceCategory::Other,
        ]
    }

    /// Type patterns for this category. A type matches a pattern when it is
    /// equal to it or starts with `<pattern>_`.
    fn patterns(&self) -> &'static [&'static str] {
        match self {
            ResourceCategory::Network => &[
                "aws_vpc", "aws_subnet", "aws_internet_gateway", "aws_nat_gateway", "aws_route",
                "aws_route_table", "aws_route53", "aws_eip", "aws_vpc_endpoint", "aws_network_interface",
                "azurerm_virtual_network", "azurerm_subnet", "azurerm_public_ip", "azurerm_route_table",
                "google_compute_network", "google_compute_subnetwork", "google_compute_router",
            ],
            ResourceCategory::Security => &[
                "aws_security_group", "aws_iam", "aws_kms", "aws_network_acl", "aws_key_pair",
                "aws_acm_certificate", "aws_secretsmanager", "aws_wafv2",
                "azurerm_network_security_group", "azurerm_key_vault", "azurerm_role_assignment",
                "google_compute_firewall", "google_service_account", "google_project_iam",
            ],
            ResourceCategory::Compute => &[
                "aws_instance", "aws_launch_template", "aws_autoscaling_group", "aws_lambda",
                "azurerm_virtual_machine", "azurerm_linux_virtual_machine", "azurerm_windows_virtual_machine",
                "azurerm_function_app", "google_compute_instance", "google_cloudfunctions",
            ],
            ResourceCategory::Container => &[
                "aws_ecs", "aws_eks", "aws_ecr", "azurerm_kubernetes_cluster", "azurerm_container",
                "google_container", "kubernetes",
            ],
            ResourceCategory::Database => &[
                "aws_db_instance", "aws_rds", "aws_dynamodb", "aws_elasticache", "aws_db_subnet_group",
                "azurerm_mssql", "azurerm_postgresql", "azurerm_mysql", "azurerm_cosmosdb",
                "google_sql", "google_bigtable",
            ],
            ResourceCategory::Storage => &[
                "aws_s3_bucket", "aws_ebs_volume", "aws_efs", "azurerm_storage_account",
                "azurerm_storage_container", "azurerm_managed_disk", "google_storage_bucket",
            ],
            ResourceCategory::LoadBalancing => &[
                "aws_lb", "aws_alb", "aws_elb", "azurerm_lb", "azurerm_application_gateway",
                "google_compute_forwarding_rule", "google_compute_backend_service",
            ],
            ResourceCategory::Monitoring => &[
                "aws_cloudwatch", "aws_sns", "azurerm_monitor", "azurerm_log_analytics",
                "azurerm_application_insights", "google_monitoring", "google_logging",
            ],
            ResourceCategory::Other => &[],
        }
    }

    /// Category of a resource type; unmatched types fall into `Other`
    pub fn classify(resource_type: &str) -> ResourceCategory {
        let resource_type = resource_type.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|category| {
                category.patterns().iter().any(|pattern| {
                    resource_type == *pattern
                        || resource_type
                            .strip_prefix(pattern)
                            .is_some_and(|rest| rest.starts_with('_'))
                })
            })
            .unwrap_or(ResourceCategory::Other)
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider prefix of a resource type: everything before the first underscore
pub fn provider_of(resource_type: &str) -> Option<String> {
    let (prefix, _) = resource_type.split_once('_')?;
    (!prefix.is_empty()).then(|| prefix.to_lowercase())
}

/// Human-facing provider name
pub fn provider_display_name(provider: &str) -> String {
    match provider {
        "aws" => "AWS".to_string(),
        "azurerm" | "azuread" => "Azure".to_string(),
        "google" => "GCP".to_string(),
        "kubernetes" => "Kubernetes".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// A named bucket of resources sharing provider and category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalGroup {
    pub name: String,
    pub description: String,
    pub resources: Vec<String>,
}

impl LogicalGroup {
    fn new(name: String, resources: Vec<String>) -> Self {
        let description = match resources.len() {
            1 => "Contains 1 resource".to_string(),
            n => format!("Contains {} resources", n),
        };
        Self { name, description, resources }
    }
}

/// Groups resources for the context overview
#[derive(Debug, Default, Clone, Copy)]
pub struct LogicalGrouper;

impl LogicalGrouper {
    pub fn new() -> Self {
        Self
    }

    /// Partition every resource of the registry into exactly one group
    pub fn group(&self, registry: &DeclarationRegistry) -> Vec<LogicalGroup> {
        let mut by_provider: BTreeMap<String, BTreeMap<ResourceCategory, Vec<String>>> = BTreeMap::new();
        let mut miscellaneous = Vec::new();

        for declaration in registry.resources() {
            let id = declaration.composite_id();
            match provider_of(&declaration.decl_type) {
                Some(provider) => {
                    let category = ResourceCategory::classify(&declaration.decl_type);
                    by_provider
                        .entry(provider)
                        .or_default()
                        .entry(category)
                        .or_default()
                        .push(id);
                }
                None => miscellaneous.push(id),
            }
        }

        let mut providers: Vec<String> = by_provider.keys().cloned().collect();
        providers.sort_by_key(|p| {
            let rank = PRIORITY_PROVIDERS
                .iter()
                .position(|fixed| fixed == p)
                .unwrap_or(PRIORITY_PROVIDERS.len());
            (rank, p.clone())
        });

        let mut groups = Vec::new();
        for provider in providers {
            let Some(categories) = by_provider.remove(&provider) else {
                continue;
            };
            let display = provider_display_name(&provider);
            for (category, resources) in categories {
                groups.push(LogicalGroup::new(format!("{} - {}", display, category), resources));
            }
        }

        if !miscellaneous.is_empty() {
            groups.push(LogicalGroup::new(MISCELLANEOUS_GROUP.to_string(), miscellaneous));
        }

        prioritize_foundational(&mut groups);

        tracing::debug!("Formed {} logical groups", groups.len());
        groups
    }
}

/// Stable reorder: "network" groups first, then "security", then the rest
fn prioritize_foundational(groups: &mut [LogicalGroup]) {
    groups.sort_by_key(|g| {
        let name = g.name.to_lowercase();
        if name.contains("network") {
            0
        } else if name.contains("security") {
            1
        } else {
            2
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Declaration;
    use std::collections::BTreeSet;

    fn registry(ids: &[(&str, &str)]) -> DeclarationRegistry {
        let mut registry = DeclarationRegistry::new();
        for (t, n) in ids {
            registry.insert(Declaration::resource(t, *n, "main.tf"));
        }
        registry
    }

    #[test]
    fn test_classify() {
        assert_eq!(ResourceCategory::classify("aws_vpc"), ResourceCategory::Network);
        assert_eq!(ResourceCategory::classify("aws_route_table_association"), ResourceCategory::Network);
        assert_eq!(ResourceCategory::classify("aws_iam_role"), ResourceCategory::Security);
        assert_eq!(ResourceCategory::classify("aws_instance"), ResourceCategory::Compute);
        assert_eq!(ResourceCategory::classify("aws_db_instance"), ResourceCategory::Database);
        assert_eq!(ResourceCategory::classify("aws_lb_target_group"), ResourceCategory::LoadBalancing);
        assert_eq!(ResourceCategory::classify("aws_lbx"), ResourceCategory::Other);
        assert_eq!(ResourceCategory::classify("random_password"), ResourceCategory::Other);
    }

    #[test]
    fn test_compute_and_database_groups() {
        let groups = LogicalGrouper::new().group(&registry(&[("aws_instance", "web"), ("aws_db_instance", "db")]));
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["AWS - Compute", "AWS - Database"]);
        assert_eq!(groups[0].resources, vec!["aws_instance.web"]);
        assert_eq!(groups[1].description, "Contains 1 resource");
    }

    #[test]
    fn test_provider_order_and_priority_pass() {
        let groups = LogicalGrouper::new().group(&registry(&[
            ("google_compute_instance", "g"),
            ("azurerm_linux_virtual_machine", "vm"),
            ("aws_s3_bucket", "logs"),
            ("aws_security_group", "sg"),
            ("aws_vpc", "main"),
            ("random_id", "suffix"),
            ("standalone", "x"),
        ]));
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "AWS - Network",
                "AWS - Security",
                "AWS - Storage",
                "Azure - Compute",
                "GCP - Compute",
                "Random - Other",
                "Miscellaneous",
            ]
        );
    }

    #[test]
    fn test_groups_partition_resources() {
        let reg = registry(&[
            ("aws_instance", "a"),
            ("aws_instance", "b"),
            ("aws_subnet", "s"),
            ("kubernetes_deployment", "app"),
            ("null_resource", "n"),
            ("local", "file"),
        ]);
        let groups = LogicalGrouper::new().group(&reg);

        let mut seen = BTreeSet::new();
        for group in &groups {
            for id in &group.resources {
                assert!(seen.insert(id.clone()), "{} in more than one group", id);
            }
        }
        let all: BTreeSet<String> = reg.resource_ids().iter().cloned().collect();
        assert_eq!(seen, all);
    }
}
