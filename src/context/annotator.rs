//! Context Annotator - overview text and per-file annotations

use std::collections::BTreeMap;
use std::path::Path;
use chrono::Utc;
use crate::declaration::{DeclarationKind, DeclarationRegistry};
use crate::dependency::{DependencyCategory, DependencyMap};
use crate::grouping::LogicalGroup;
use crate::scanner::SourceFile;
use super::{AnnotatedFile, ContextualizedDocument, DocumentMetadata};

/// Default cap on dependency edges listed in the overview
pub const DEFAULT_DEPENDENCY_LIMIT: usize = 50;

const BANNER_RULE: &str = "# ============================================================";

const ANALYSIS_GUIDELINES: &str = "\
## Analysis Guidelines

1. Identify every resource, module and data source and its provider.
2. Use the dependency summary as ground truth for explicit references.
3. Treat relationship hints as suggestions; confirm them against the file content.
4. Infer network placement, security boundaries, data flows and IAM relationships.
5. Prefer composite ids (`type.name`) when naming relationship endpoints.
";

/// Builds the contextualized document from one import's analysis results
#[derive(Debug, Clone)]
pub struct ContextAnnotator {
    dependency_limit: usize,
}

impl Default for ContextAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextAnnotator {
    pub fn new() -> Self {
        Self {
            dependency_limit: DEFAULT_DEPENDENCY_LIMIT,
        }
    }

    pub fn with_dependency_limit(mut self, limit: usize) -> Self {
        self.dependency_limit = limit;
        self
    }

    pub fn annotate(
        &self,
        files: &[SourceFile],
        registry: &DeclarationRegistry,
        dependencies: &DependencyMap,
        groups: &[LogicalGroup],
    ) -> ContextualizedDocument {
        let (cross_references, hints) = self.annotations(dependencies);

        let annotated = files
            .iter()
            .map(|file| {
                let (file_refs, file_hints) = attribute_to_file(&file.name, &cross_references, &hints);
                let content = wrap_in_banner(&file.name, &file_refs, &file_hints, &file.content);
                AnnotatedFile {
                    filename: file.name.clone(),
                    cross_references: file_refs,
                    relationship_hints: file_hints,
                    content,
                }
            })
            .collect();

        ContextualizedDocument {
            overview: self.overview(files.len(), registry, dependencies, groups),
            group_summary: group_summary(groups),
            dependency_summary: dependency_summary(dependencies),
            files: annotated,
            metadata: DocumentMetadata {
                file_count: files.len(),
                resource_count: registry.resource_ids().len(),
                dependency_count: dependencies.total_count(),
                group_count: groups.len(),
                generated_at: Utc::now(),
            },
        }
    }

    fn overview(
        &self,
        file_count: usize,
        registry: &DeclarationRegistry,
        dependencies: &DependencyMap,
        groups: &[LogicalGroup],
    ) -> String {
        let mut out = String::new();
        out.push_str("# Infrastructure Overview\n\n");
        out.push_str(&format!("- Files: {}\n", file_count));
        out.push_str(&format!("- Resources: {}\n", registry.resource_ids().len()));
        out.push_str(&format!("- Data sources: {}\n", registry.count(DeclarationKind::Data)));
        out.push_str(&format!("- Modules: {}\n", registry.count(DeclarationKind::Module)));
        out.push_str(&format!("- Variables: {}\n", registry.count(DeclarationKind::Variable)));
        out.push_str(&format!("- Outputs: {}\n", registry.count(DeclarationKind::Output)));
        let providers: Vec<String> = registry.providers().into_iter().collect();
        if providers.is_empty() {
            out.push_str("- Providers: none declared\n");
        } else {
            out.push_str(&format!("- Providers: {}\n", providers.join(", ")));
        }
        out.push_str(&format!("- Dependencies: {}\n\n", dependencies.total_count()));

        out.push_str("## Logical Groups\n\n");
        if groups.is_empty() {
            out.push_str("_No resources declared._\n");
        }
        for group in groups {
            out.push_str(&format!("- {}: {}\n", group.name, group.description));
        }
        out.push('\n');

        out.push_str("## Key Dependencies\n\n");
        let edges = dependencies.edges();
        if edges.is_empty() {
            out.push_str("_No dependencies detected._\n");
        }
        for edge in edges.iter().take(self.dependency_limit) {
            out.push_str(&format!("- {} -> {} ({})\n", edge.from, edge.to, edge.category));
        }
        if edges.len() > self.dependency_limit {
            out.push_str(&format!("- ... and {} more\n", edges.len() - self.dependency_limit));
        }
        out.push('\n');

        out.push_str(ANALYSIS_GUIDELINES);
        out
    }

    /// Cross-reference comments and relationship hints keyed by resource id
    fn annotations(&self, dependencies: &DependencyMap) -> (BTreeMap<String, Vec<String>>, BTreeMap<String, Vec<String>>) {
        let mut cross_references: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut hints: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (id, deps) in dependencies.iter() {
            for category in DependencyCategory::all() {
                let targets = deps.get(*category);
                if targets.is_empty() {
                    continue;
                }
                let list = targets.iter().cloned().collect::<Vec<_>>().join(", ");
                if *category == DependencyCategory::Implicit {
                    hints
                        .entry(id.clone())
                        .or_default()
                        .push(format!("# Relationship hint: {} may relate to {}", id, list));
                } else {
                    cross_references
                        .entry(id.clone())
                        .or_default()
                        .push(format!("# Cross-reference: {} uses {} {}", id, category, list));
                }
            }
        }

        (cross_references, hints)
    }
}

/// Whether a resource's local name and a file name overlap.
///
/// Substring containment in either direction, case-insensitive; a single
/// resource can match several files.
pub fn name_matches_file(resource_id: &str, filename: &str) -> bool {
    let name = resource_id
        .rsplit_once('.')
        .map(|(_, name)| name)
        .unwrap_or(resource_id)
        .to_lowercase();
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.is_empty() || stem.is_empty() {
        return false;
    }
    stem.contains(&name) || name.contains(&stem)
}

fn attribute_to_file(
    filename: &str,
    cross_references: &BTreeMap<String, Vec<String>>,
    hints: &BTreeMap<String, Vec<String>>,
) -> (Vec<String>, Vec<String>) {
    let pick = |source: &BTreeMap<String, Vec<String>>| {
        source
            .iter()
            .filter(|(id, _)| name_matches_file(id, filename))
            .flat_map(|(_, lines)| lines.iter().cloned())
            .collect::<Vec<_>>()
    };
    (pick(cross_references), pick(hints))
}

fn wrap_in_banner(filename: &str, cross_references: &[String], hints: &[String], content: &str) -> String {
    let mut out = String::new();
    out.push_str(BANNER_RULE);
    out.push_str(&format!("\n# File: {}\n", filename));
    out.push_str(BANNER_RULE);
    out.push('\n');
    for line in cross_references.iter().chain(hints) {
        out.push_str(line);
        out.push('\n');
    }
    if !cross_references.is_empty() || !hints.is_empty() {
        out.push('\n');
    }
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(BANNER_RULE);
    out.push_str(&format!("\n# End of file: {}\n", filename));
    out.push_str(BANNER_RULE);
    out.push('\n');
    out
}

fn group_summary(groups: &[LogicalGroup]) -> String {
    let mut out = String::from("## Resource Groups\n\n");
    if groups.is_empty() {
        out.push_str("_No resources declared._\n");
    }
    for group in groups {
        out.push_str(&format!("### {}\n{}\n", group.name, group.description));
        for id in &group.resources {
            out.push_str(&format!("- {}\n", id));
        }
        out.push('\n');
    }
    out
}

fn dependency_summary(dependencies: &DependencyMap) -> String {
    let mut out = String::from("## Dependency Summary\n\n");
    let mut any = false;
    for (id, deps) in dependencies.iter() {
        let combined = deps.combined();
        if combined.is_empty() {
            continue;
        }
        any = true;
        let list: Vec<String> = combined.into_iter().collect();
        out.push_str(&format!("- {} depends on: {}\n", id, list.join(", ")));
    }
    if !any {
        out.push_str("_No dependencies detected._\n");
    }
    out
}
