//! Reference Resolver
//!
//! Two passes over one import:
//! 1. Build a symbol table from the declaration registry (resources, data
//!    sources, modules, variables, locals, outputs).
//! 2. Segment every file into resource blocks and scan each block for
//!    reference patterns. A match is recorded only if its target is in the
//!    symbol table; anything else is incidental text and is dropped.
//!
//! Reference patterns, tried within each block:
//! - `type.name.attribute` (resource)
//! - `data.type.name` (data source)
//! - `module.name.output` (module)
//! - `var.name` / `local.name` (variable)
//! - `output.name` (output)
//!
//! Implicit dependencies: a block whose text contains a keyword from
//! [`IMPLICIT_KEYWORDS`] is linked to every other resource of the listed
//! types. This over-links on purpose; a block mentioning "subnet" depends on
//! all subnets.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use regex::Regex;
use crate::{Error, Result};
use crate::declaration::{DeclarationKind, DeclarationRegistry};
use crate::parser::ParsedFile;
use crate::scanner::{HeaderPatterns, SourceFile};
use super::blocks::resource_blocks;
use super::{DependencyCategory, DependencyMap};

/// Keyword found in a block → resource types it implies a dependency on
pub const IMPLICIT_KEYWORDS: &[(&str, &[&str])] = &[
    ("security_group", &["aws_security_group", "azurerm_network_security_group"]),
    ("subnet", &["aws_subnet", "azurerm_subnet", "google_compute_subnetwork"]),
    ("vpc", &["aws_vpc"]),
    ("key_pair", &["aws_key_pair"]),
    ("iam_role", &["aws_iam_role"]),
];

const RESOURCE_REF: &str = r"\b([A-Za-z][A-Za-z0-9]*_[A-Za-z0-9_]+)\.([A-Za-z_][A-Za-z0-9_-]*)(?:\.|\[)";
const DATA_REF: &str = r"\bdata\.([A-Za-z0-9_-]+)\.([A-Za-z0-9_-]+)";
const MODULE_REF: &str = r"\bmodule\.([A-Za-z0-9_-]+)\.[A-Za-z0-9_-]+";
const VARIABLE_REF: &str = r"\b(var|local)\.([A-Za-z0-9_-]+)";
const OUTPUT_REF: &str = r"\boutput\.([A-Za-z0-9_-]+)";

static REFERENCE_PATTERNS: OnceLock<std::result::Result<ReferencePatterns, regex::Error>> = OnceLock::new();

struct ReferencePatterns {
    resource: Regex,
    data: Regex,
    module: Regex,
    variable: Regex,
    output: Regex,
}

impl ReferencePatterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            resource: Regex::new(RESOURCE_REF)?,
            data: Regex::new(DATA_REF)?,
            module: Regex::new(MODULE_REF)?,
            variable: Regex::new(VARIABLE_REF)?,
            output: Regex::new(OUTPUT_REF)?,
        })
    }

    fn get() -> Result<&'static Self> {
        REFERENCE_PATTERNS
            .get_or_init(Self::compile)
            .as_ref()
            .map_err(|e| Error::Regex(e.clone()))
    }
}

/// Resolver behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Keep an implicit link only when the target's id also appears in the block
    pub strict_implicit: bool,
}

/// Pass-1 symbol table, owned by the resolver for one import
#[derive(Debug, Default)]
struct SymbolTable {
    resources: BTreeSet<String>,
    /// resource type → resource ids of that type
    resources_by_type: BTreeMap<String, Vec<String>>,
    others: BTreeSet<String>,
}

impl SymbolTable {
    fn build(registry: &DeclarationRegistry) -> Self {
        let mut table = SymbolTable::default();

        for declaration in registry.resources() {
            let id = declaration.composite_id();
            table
                .resources_by_type
                .entry(declaration.decl_type.clone())
                .or_default()
                .push(id.clone());
            table.resources.insert(id);
        }

        for kind in [
            DeclarationKind::Data,
            DeclarationKind::Module,
            DeclarationKind::Variable,
            DeclarationKind::Local,
            DeclarationKind::Output,
        ] {
            table
                .others
                .extend(registry.of_kind(kind).map(|d| d.composite_id()));
        }

        table
    }

    fn contains(&self, id: &str) -> bool {
        self.resources.contains(id) || self.others.contains(id)
    }
}

/// Builds the dependency map for one import
pub struct ReferenceResolver {
    registry: DeclarationRegistry,
    symbols: SymbolTable,
    options: ResolverOptions,
    header: &'static Regex,
    references: &'static ReferencePatterns,
}

impl ReferenceResolver {
    /// Take ownership of the registry and build the pass-1 symbol table
    pub fn new(registry: DeclarationRegistry) -> Result<Self> {
        Self::with_options(registry, ResolverOptions::default())
    }

    pub fn with_options(registry: DeclarationRegistry, options: ResolverOptions) -> Result<Self> {
        let symbols = SymbolTable::build(&registry);
        tracing::debug!(
            "Symbol table: {} resources, {} other declarations",
            symbols.resources.len(),
            symbols.others.len()
        );
        Ok(Self {
            registry,
            symbols,
            options,
            header: &HeaderPatterns::get()?.resource,
            references: ReferencePatterns::get()?,
        })
    }

    /// Hand the registry back once resolution is done
    pub fn into_registry(self) -> DeclarationRegistry {
        self.registry
    }

    /// Pass 2: scan resource blocks of every file
    pub fn resolve(&self, files: &[SourceFile]) -> DependencyMap {
        let mut map = DependencyMap::new();
        let mut dropped = 0usize;

        for file in files {
            for block in resource_blocks(&file.content, self.header) {
                if !self.symbols.resources.contains(&block.resource_id) {
                    continue;
                }
                map.touch(&block.resource_id);
                dropped += self.scan_block(&block.resource_id, block.text, &mut map);
                self.link_implicit(&block.resource_id, block.text, &mut map);
            }
        }

        tracing::info!(
            "Resolved {} dependencies across {} resources ({} unregistered references dropped)",
            map.total_count(),
            map.len(),
            dropped
        );
        map
    }

    /// Record references carried by parsed argument values
    pub fn resolve_parsed(&self, parsed: &[ParsedFile], map: &mut DependencyMap) {
        for file in parsed {
            for block in file.blocks.iter().filter(|b| b.kind == DeclarationKind::Resource) {
                let from = format!("{}.{}", block.block_type, block.name);
                if !self.symbols.resources.contains(&from) {
                    continue;
                }
                map.touch(&from);
                for reference in block.references() {
                    match self.classify_reference(reference) {
                        Some((target, category)) if target != from => {
                            map.record(&from, target, category);
                        }
                        Some(_) => {}
                        None => tracing::debug!("Dropping unregistered reference {} in {}", reference, from),
                    }
                }
            }
        }
    }

    /// Map a reference traversal onto a registered target and its category
    pub fn classify_reference(&self, reference: &str) -> Option<(String, DependencyCategory)> {
        let parts: Vec<&str> = reference.split('.').collect();
        let (target, category) = match parts.as_slice() {
            ["data", data_type, name, ..] => (format!("data.{}.{}", data_type, name), DependencyCategory::Resource),
            ["module", name, ..] => (format!("module.{}", name), DependencyCategory::Module),
            ["var", name, ..] => (format!("var.{}", name), DependencyCategory::Variable),
            ["local", name, ..] => (format!("local.{}", name), DependencyCategory::Variable),
            ["output", name, ..] => (format!("output.{}", name), DependencyCategory::Output),
            [resource_type, name, ..] => {
                let name = name.split('[').next().unwrap_or(name);
                (format!("{}.{}", resource_type, name), DependencyCategory::Resource)
            }
            _ => return None,
        };
        self.symbols.contains(&target).then_some((target, category))
    }

    /// Returns the number of candidate references dropped as unregistered
    fn scan_block(&self, from: &str, text: &str, map: &mut DependencyMap) -> usize {
        let mut dropped = 0;
        let mut record = |target: String, category: DependencyCategory| {
            if target == from {
                return;
            }
            if self.symbols.contains(&target) {
                map.record(from, target, category);
            } else {
                dropped += 1;
            }
        };

        for caps in self.references.resource.captures_iter(text) {
            record(format!("{}.{}", &caps[1], &caps[2]), DependencyCategory::Resource);
        }
        for caps in self.references.data.captures_iter(text) {
            record(format!("data.{}.{}", &caps[1], &caps[2]), DependencyCategory::Resource);
        }
        for caps in self.references.module.captures_iter(text) {
            record(format!("module.{}", &caps[1]), DependencyCategory::Module);
        }
        for caps in self.references.variable.captures_iter(text) {
            record(format!("{}.{}", &caps[1], &caps[2]), DependencyCategory::Variable);
        }
        for caps in self.references.output.captures_iter(text) {
            record(format!("output.{}", &caps[1]), DependencyCategory::Output);
        }

        dropped
    }

    fn link_implicit(&self, from: &str, text: &str, map: &mut DependencyMap) {
        for (keyword, types) in IMPLICIT_KEYWORDS {
            if !text.contains(keyword) {
                continue;
            }
            for resource_type in *types {
                let Some(candidates) = self.symbols.resources_by_type.get(*resource_type) else {
                    continue;
                };
                for target in candidates {
                    if target == from {
                        continue;
                    }
                    if self.options.strict_implicit && !text.contains(target.as_str()) {
                        continue;
                    }
                    map.record(from, target.clone(), DependencyCategory::Implicit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Value;
    use crate::parser::ParsedBlock;
    use crate::scanner::DeclarationScanner;

    fn resolve(files: &[SourceFile], options: ResolverOptions) -> (DependencyMap, DeclarationRegistry) {
        let scan = DeclarationScanner::new().unwrap().scan(files);
        let resolver = ReferenceResolver::with_options(scan.registry, options).unwrap();
        let map = resolver.resolve(files);
        (map, resolver.into_registry())
    }

    #[test]
    fn test_explicit_reference_between_blocks() {
        let text = r#"
resource "aws_instance" "web" {
  ami = "ami-123"
  db_host = aws_db_instance.db.address
}

resource "aws_db_instance" "db" {
  engine = "postgres"
}
"#;
        let (map, _) = resolve(&[SourceFile::new("main.tf", text)], ResolverOptions::default());
        let deps = map.get("aws_instance.web").unwrap();
        assert!(deps.resources.contains("aws_db_instance.db"));
        assert!(map.combined("aws_db_instance.db").is_empty());
    }

    #[test]
    fn test_categories_and_registry_validation() {
        let text = r#"
variable "region" {}
locals {
  tags = {}
}
module "network" {
  source = "./network"
}
data "aws_ami" "ubuntu" {}

resource "aws_instance" "app" {
  ami       = data.aws_ami.ubuntu.id
  region    = var.region
  tags      = local.tags
  subnet    = module.network.private_subnet
  missing   = var.not_declared
  ghost     = aws_lambda_function.nowhere.arn
  note      = "see output.summary"
}
"#;
        let (map, registry) = resolve(&[SourceFile::new("main.tf", text)], ResolverOptions::default());
        let deps = map.get("aws_instance.app").unwrap();

        assert!(deps.resources.contains("data.aws_ami.ubuntu"));
        assert!(deps.variables.contains("var.region"));
        assert!(deps.variables.contains("local.tags"));
        assert!(deps.modules.contains("module.network"));
        assert!(!deps.variables.contains("var.not_declared"));
        assert!(deps.outputs.is_empty());
        assert!(!deps.resources.contains("aws_lambda_function.nowhere"));

        for edge in map.edges() {
            assert!(registry.contains(&edge.to), "dangling target {}", edge.to);
        }
    }

    #[test]
    fn test_implicit_keyword_overlinks() {
        let text = r#"
resource "aws_subnet" "a" {}
resource "aws_subnet" "b" {}
resource "aws_instance" "web" {
  subnet_id = "subnet-hardcoded"
}
"#;
        let (map, _) = resolve(&[SourceFile::new("main.tf", text)], ResolverOptions::default());

        let web = map.get("aws_instance.web").unwrap();
        assert!(web.implicit.contains("aws_subnet.a"));
        assert!(web.implicit.contains("aws_subnet.b"));

        // A subnet's own header mentions "subnet", so it links to its siblings but not itself
        let a = map.get("aws_subnet.a").unwrap();
        assert!(a.implicit.contains("aws_subnet.b"));
        assert!(!a.implicit.contains("aws_subnet.a"));
    }

    #[test]
    fn test_strict_implicit_requires_id() {
        let text = r#"
resource "aws_subnet" "a" {}
resource "aws_subnet" "b" {}
resource "aws_instance" "web" {
  subnet_id = aws_subnet.a.id
}
"#;
        let options = ResolverOptions { strict_implicit: true };
        let (map, _) = resolve(&[SourceFile::new("main.tf", text)], options);
        let web = map.get("aws_instance.web").unwrap();
        assert!(web.implicit.contains("aws_subnet.a"));
        assert!(!web.implicit.contains("aws_subnet.b"));
    }

    #[test]
    fn test_cross_file_references() {
        let files = [
            SourceFile::new("network.tf", "resource \"aws_vpc\" \"main\" {\n  cidr_block = \"10.0.0.0/16\"\n}\n"),
            SourceFile::new(
                "compute.tf",
                "resource \"aws_security_group\" \"web\" {\n  vpc_id = aws_vpc.main.id\n}\n",
            ),
        ];
        let (map, _) = resolve(&files, ResolverOptions::default());
        let deps = map.get("aws_security_group.web").unwrap();
        assert!(deps.resources.contains("aws_vpc.main"));
        // "vpc" keyword also produces the implicit link
        assert!(deps.implicit.contains("aws_vpc.main"));
    }

    #[test]
    fn test_parsed_references() {
        let text = "resource \"aws_vpc\" \"main\" {}\nresource \"aws_subnet\" \"a\" {}\nvariable \"cidr\" {}\n";
        let files = [SourceFile::new("main.tf", text)];
        let scan = DeclarationScanner::new().unwrap().scan(&files);
        let resolver = ReferenceResolver::new(scan.registry).unwrap();

        let parsed = ParsedFile {
            path: "main.tf".to_string(),
            blocks: vec![
                ParsedBlock::new(DeclarationKind::Resource, "aws_subnet", "a")
                    .with_argument("vpc_id", Value::Reference("aws_vpc.main.id".to_string()))
                    .with_argument("cidr_block", Value::Reference("var.cidr".to_string()))
                    .with_argument("other", Value::Reference("aws_vpc.unknown.id".to_string())),
            ],
        };
        let mut map = DependencyMap::new();
        resolver.resolve_parsed(&[parsed], &mut map);

        let deps = map.get("aws_subnet.a").unwrap();
        assert!(deps.resources.contains("aws_vpc.main"));
        assert!(deps.variables.contains("var.cidr"));
        assert_eq!(deps.resources.len(), 1);
    }

    #[test]
    fn test_patterns_compiled_once() {
        let first = ReferenceResolver::new(DeclarationRegistry::new()).unwrap();
        let second = ReferenceResolver::new(DeclarationRegistry::new()).unwrap();

        assert!(std::ptr::eq(first.references, second.references));
        assert!(std::ptr::eq(first.header, second.header));
        // Blocks are segmented with the scanner's own header matcher
        assert!(std::ptr::eq(first.header, &HeaderPatterns::get().unwrap().resource));
    }
}
