//! Declarations - named entities declared in configuration source
//!
//! Every declaration is addressed by a composite id `<type>.<name>`, which is
//! also the address other blocks use to reference it:
//! - `Resource`: `aws_instance.web`
//! - `Data`: `data.aws_ami.ubuntu`
//! - `Module`: `module.vpc`
//! - `Variable`: `var.region`
//! - `Local`: `local.tags`
//! - `Output`: `output.vpc_id`
//! - `Provider`: `provider.aws`

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Kinds of declarations recognized in configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Resource,
    Data,
    Module,
    Variable,
    Local,
    Output,
    Provider,
}

impl DeclarationKind {
    /// Get the string representation of the declaration kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Resource => "resource",
            DeclarationKind::Data => "data",
            DeclarationKind::Module => "module",
            DeclarationKind::Variable => "variable",
            DeclarationKind::Local => "local",
            DeclarationKind::Output => "output",
            DeclarationKind::Provider => "provider",
        }
    }

    /// Address prefix used when the declaration is referenced.
    ///
    /// Resources are referenced by their own type, so they have no fixed prefix.
    pub fn address_prefix(&self) -> Option<&'static str> {
        match self {
            DeclarationKind::Resource => None,
            DeclarationKind::Data => Some("data"),
            DeclarationKind::Module => Some("module"),
            DeclarationKind::Variable => Some("var"),
            DeclarationKind::Local => Some("local"),
            DeclarationKind::Output => Some("output"),
            DeclarationKind::Provider => Some("provider"),
        }
    }

    /// Get all declaration kinds
    pub fn all() -> &'static [DeclarationKind] {
        &[
            DeclarationKind::Resource,
            DeclarationKind::Data,
            DeclarationKind::Module,
            DeclarationKind::Variable,
            DeclarationKind::Local,
            DeclarationKind::Output,
            DeclarationKind::Provider,
        ]
    }
}

impl FromStr for DeclarationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resource" => Ok(DeclarationKind::Resource),
            "data" => Ok(DeclarationKind::Data),
            "module" => Ok(DeclarationKind::Module),
            "variable" | "var" => Ok(DeclarationKind::Variable),
            "local" | "locals" => Ok(DeclarationKind::Local),
            "output" => Ok(DeclarationKind::Output),
            "provider" => Ok(DeclarationKind::Provider),
            _ => Err(Error::Config(format!("Unknown declaration kind: {}", s))),
        }
    }
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named entity declared in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// Declared type. For prefixed kinds this includes the prefix
    /// (`data.aws_ami`, `var`, `module`).
    pub decl_type: String,
    pub name: String,
    /// File the declaration was last seen in
    pub file: String,
}

impl Declaration {
    pub fn new(kind: DeclarationKind, raw_type: &str, name: impl Into<String>, file: impl Into<String>) -> Self {
        let decl_type = match (kind, kind.address_prefix()) {
            (DeclarationKind::Resource, _) => raw_type.to_string(),
            (DeclarationKind::Data, Some(prefix)) => format!("{}.{}", prefix, raw_type),
            (_, Some(prefix)) => prefix.to_string(),
            (_, None) => raw_type.to_string(),
        };
        Self {
            kind,
            decl_type,
            name: name.into(),
            file: file.into(),
        }
    }

    pub fn resource(resource_type: &str, name: impl Into<String>, file: impl Into<String>) -> Self {
        Self::new(DeclarationKind::Resource, resource_type, name, file)
    }

    /// `<type>.<name>`, the address other blocks use to reference this declaration
    pub fn composite_id(&self) -> String {
        format!("{}.{}", self.decl_type, self.name)
    }
}

/// Registry of every declaration seen across one import.
///
/// Keyed by composite id; a duplicate id overwrites the earlier entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeclarationRegistry {
    declarations: BTreeMap<String, Declaration>,
    /// Resource ids in first-seen order
    resource_order: Vec<String>,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration, replacing any earlier one with the same composite id
    pub fn insert(&mut self, declaration: Declaration) {
        let id = declaration.composite_id();
        if declaration.kind == DeclarationKind::Resource && !self.declarations.contains_key(&id) {
            self.resource_order.push(id.clone());
        }
        if let Some(previous) = self.declarations.insert(id.clone(), declaration) {
            tracing::debug!("Declaration {} redeclared (previously in {})", id, previous.file);
        }
    }

    pub fn contains(&self, composite_id: &str) -> bool {
        self.declarations.contains_key(composite_id)
    }

    pub fn get(&self, composite_id: &str) -> Option<&Declaration> {
        self.declarations.get(composite_id)
    }

    /// Composite ids of all resources in first-seen order
    pub fn resource_ids(&self) -> &[String] {
        &self.resource_order
    }

    /// Resources in first-seen order
    pub fn resources(&self) -> impl Iterator<Item = &Declaration> {
        self.resource_order.iter().filter_map(|id| self.declarations.get(id))
    }

    pub fn of_kind(&self, kind: DeclarationKind) -> impl Iterator<Item = &Declaration> {
        self.declarations.values().filter(move |d| d.kind == kind)
    }

    /// Provider names declared explicitly or through `required_providers`
    pub fn providers(&self) -> BTreeSet<String> {
        self.of_kind(DeclarationKind::Provider)
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn count(&self, kind: DeclarationKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Merge another registry into this one; later entries win
    pub fn extend(&mut self, other: DeclarationRegistry) {
        let DeclarationRegistry { mut declarations, resource_order } = other;
        for id in resource_order {
            if let Some(declaration) = declarations.remove(&id) {
                self.insert(declaration);
            }
        }
        for (_, declaration) in declarations {
            self.insert(declaration);
        }
    }
}

/// Typed argument value emitted by a syntax parser.
///
/// References are kept distinct from strings so that no textual
/// re-parsing is needed to find them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A traversal such as `aws_vpc.main.id` or `var.region`
    Reference(String),
}

impl Value {
    /// All reference traversals contained in this value, depth first
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Value::Reference(r) => out.push(r),
            Value::List(items) => items.iter().for_each(|v| v.collect_references(out)),
            Value::Map(entries) => entries.values().for_each(|v| v.collect_references(out)),
            _ => {}
        }
    }

    /// Plain JSON rendering; references become `${...}` strings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => serde_json::Value::Object(
                entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Reference(r) => serde_json::Value::String(format!("${{{}}}", r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_kind_roundtrip() {
        for kind in DeclarationKind::all() {
            let parsed: DeclarationKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_composite_ids() {
        assert_eq!(Declaration::resource("aws_instance", "web", "main.tf").composite_id(), "aws_instance.web");
        assert_eq!(
            Declaration::new(DeclarationKind::Data, "aws_ami", "ubuntu", "main.tf").composite_id(),
            "data.aws_ami.ubuntu"
        );
        assert_eq!(
            Declaration::new(DeclarationKind::Variable, "variable", "region", "vars.tf").composite_id(),
            "var.region"
        );
        assert_eq!(
            Declaration::new(DeclarationKind::Module, "module", "vpc", "main.tf").composite_id(),
            "module.vpc"
        );
    }

    #[test]
    fn test_registry_latest_wins() {
        let mut registry = DeclarationRegistry::new();
        registry.insert(Declaration::resource("aws_instance", "web", "a.tf"));
        registry.insert(Declaration::resource("aws_instance", "web", "b.tf"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resource_ids(), &["aws_instance.web".to_string()]);
        assert_eq!(registry.get("aws_instance.web").unwrap().file, "b.tf");
    }

    #[test]
    fn test_value_references() {
        let mut map = BTreeMap::new();
        map.insert("vpc_id".to_string(), Value::Reference("aws_vpc.main.id".to_string()));
        map.insert(
            "subnets".to_string(),
            Value::List(vec![
                Value::Reference("aws_subnet.a.id".to_string()),
                Value::String("literal".to_string()),
            ]),
        );
        let value = Value::Map(map);

        let refs = value.references();
        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&"aws_vpc.main.id"));

        let json = value.to_json();
        assert_eq!(json["vpc_id"], "${aws_vpc.main.id}");
    }
}
