//! Import pipeline
//!
//! Runs the stages of one import in order:
//! scan → resolve → group → annotate → format → analyze → materialize.
//!
//! Every intermediate value is built fresh for the import and dropped when
//! it returns; only the graph store outlives it.

use crate::analyzer::{AnalysisOutput, SemanticAnalyzer, ValidationReport};
use crate::config::InfragraphConfig;
use crate::context::annotator::DEFAULT_DEPENDENCY_LIMIT;
use crate::context::formatter::{DEFAULT_MAX_CHARS, DEFAULT_PRIMARY_FILE};
use crate::context::{ContextAnnotator, ContextualizedDocument, DocumentFormatter, FormattedDocument};
use crate::declaration::DeclarationKind;
use crate::dependency::{DependencyMap, ReferenceResolver, ResolverOptions};
use crate::grouping::{LogicalGroup, LogicalGrouper};
use crate::materializer::{GraphMaterializer, MaterializeMode, MaterializeReport};
use crate::parser::{ParsedFile, ParserRegistry};
use crate::scanner::{DeclarationScanner, SourceFile};
use crate::storage::GraphStore;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeSet;

/// Stage settings for one import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_document_chars: usize,
    pub primary_file: String,
    pub dependency_limit: usize,
    pub strict_implicit: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_document_chars: DEFAULT_MAX_CHARS,
            primary_file: DEFAULT_PRIMARY_FILE.to_string(),
            dependency_limit: DEFAULT_DEPENDENCY_LIMIT,
            strict_implicit: false,
        }
    }
}

impl From<&InfragraphConfig> for PipelineOptions {
    fn from(config: &InfragraphConfig) -> Self {
        Self {
            max_document_chars: config.max_document_chars(),
            primary_file: config.primary_file().to_string(),
            dependency_limit: config.overview_dependency_limit(),
            strict_implicit: config.strict_implicit(),
        }
    }
}

/// Counts describing the context stages of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub files: usize,
    pub resources: usize,
    pub dependencies: usize,
    pub groups: usize,
    pub syntax_errors: usize,
    pub document_chars: usize,
    pub truncated: bool,
}

/// Everything produced before the analyzer is called
#[derive(Debug, Clone)]
pub struct ContextOutput {
    pub document: FormattedDocument,
    pub context: ContextualizedDocument,
    pub groups: Vec<LogicalGroup>,
    pub dependencies: DependencyMap,
    pub summary: ContextSummary,
}

/// Outcome of a full import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub context: ContextSummary,
    pub validation: ValidationReport,
    pub materialize: MaterializeReport,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = &self.context;
        let v = &self.validation;
        let m = &self.materialize;
        writeln!(f, "Import Report ({}):", m.mode)?;
        writeln!(f, "  Files: {} ({} syntax errors)", c.files, c.syntax_errors)?;
        writeln!(f, "  Declared resources: {}", c.resources)?;
        writeln!(f, "  Dependencies: {}", c.dependencies)?;
        writeln!(f, "  Groups: {}", c.groups)?;
        writeln!(
            f,
            "  Document: {} chars{}",
            c.document_chars,
            if c.truncated { " (truncated)" } else { "" }
        )?;
        writeln!(
            f,
            "  Resources: {} accepted, {} malformed",
            v.resources_accepted, v.resources_malformed
        )?;
        writeln!(
            f,
            "  Relationships: {} accepted, {} malformed",
            v.relationships_accepted, v.relationships_malformed
        )?;
        if m.cleared_nodes > 0 {
            writeln!(f, "  Cleared nodes: {}", m.cleared_nodes)?;
        }
        writeln!(f, "  Nodes: {} written, {} failed", m.nodes_written, m.nodes_failed)?;
        write!(
            f,
            "  Edges: {} written, {} unresolved, {} failed",
            m.edges_written, m.edges_unresolved, m.edges_failed
        )
    }
}

#[derive(Default)]
pub struct ImportPipeline {
    options: PipelineOptions,
    parsers: Option<ParserRegistry>,
}

impl ImportPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options, parsers: None }
    }

    /// Also run the given syntax parsers over every file
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Some(parsers);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the stages up to and including the formatted document
    pub fn build_context(&self, files: &[SourceFile]) -> Result<ContextOutput> {
        let scan = DeclarationScanner::new()?.scan(files);
        let mut failed_files: BTreeSet<String> = scan.failures.iter().map(|f| f.file.clone()).collect();
        let mut registry = scan.registry;

        let parsed = self.parse_files(files, &mut failed_files);
        for file in &parsed {
            for block in &file.blocks {
                if matches!(
                    block.kind,
                    DeclarationKind::Resource | DeclarationKind::Data | DeclarationKind::Module
                ) {
                    registry.insert(block.to_declaration(&file.path));
                }
            }
        }

        let resolver = ReferenceResolver::with_options(
            registry,
            ResolverOptions {
                strict_implicit: self.options.strict_implicit,
            },
        )?;
        let mut dependencies = resolver.resolve(files);
        resolver.resolve_parsed(&parsed, &mut dependencies);
        let registry = resolver.into_registry();

        let groups = LogicalGrouper::new().group(&registry);

        let context = ContextAnnotator::new()
            .with_dependency_limit(self.options.dependency_limit)
            .annotate(files, &registry, &dependencies, &groups);

        let document = DocumentFormatter::new()
            .with_max_chars(self.options.max_document_chars)
            .with_primary_file(self.options.primary_file.clone())
            .format(&context);

        let summary = ContextSummary {
            files: files.len(),
            resources: registry.resource_ids().len(),
            dependencies: dependencies.total_count(),
            groups: groups.len(),
            syntax_errors: failed_files.len(),
            document_chars: document.len(),
            truncated: document.is_truncated(),
        };

        tracing::info!(
            "Built context: {} files, {} resources, {} dependencies, {} groups, {} chars",
            summary.files,
            summary.resources,
            summary.dependencies,
            summary.groups,
            summary.document_chars
        );

        Ok(ContextOutput {
            document,
            context,
            groups,
            dependencies,
            summary,
        })
    }

    fn parse_files(&self, files: &[SourceFile], failed_files: &mut BTreeSet<String>) -> Vec<ParsedFile> {
        let Some(parsers) = &self.parsers else {
            return Vec::new();
        };

        let mut parsed = Vec::new();
        for file in files {
            match parsers.parse_file(&file.name, &file.content) {
                Ok(Some(result)) => parsed.push(result),
                Ok(None) => tracing::debug!("No parser for {}", file.name),
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", file.name, e);
                    failed_files.insert(file.name.clone());
                }
            }
        }
        parsed
    }

    /// Run a full import: build the document, analyze it, and write the graph
    pub fn run_import(
        &self,
        files: &[SourceFile],
        analyzer: &dyn SemanticAnalyzer,
        store: &dyn GraphStore,
        mode: MaterializeMode,
    ) -> Result<ImportReport> {
        let context = self.build_context(files)?;

        tracing::info!("Sending {} chars to analyzer {}", context.document.len(), analyzer.name());
        let raw = analyzer.analyze(&context.document.text)?;
        let (output, validation) = AnalysisOutput::from_response(&raw)?;

        let materialize = GraphMaterializer::new(store).run(&output, mode)?;

        Ok(ImportReport {
            context: context.summary,
            validation,
            materialize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Value;
    use crate::parser::{ParsedBlock, SyntaxParser};
    use crate::storage::SqliteStore;
    use crate::Error;
    use std::cell::RefCell;

    const WEB_AND_DB: &str = r#"
resource "aws_instance" "web" {
  ami           = "ami-123"
  instance_type = "t3.micro"
  user_data     = "DB_HOST=${aws_db_instance.db.address}"
}

resource "aws_db_instance" "db" {
  engine = "postgres"
}
"#;

    const ANALYSIS: &str = r#"```json
{
  "resources": [
    {"id": "aws_instance.web", "type": "aws_instance", "name": "web", "provider": "aws", "properties": {"instance_type": "t3.micro"}},
    {"id": "aws_db_instance.db", "type": "aws_db_instance", "name": "db", "provider": "aws", "properties": {"engine": "postgres"}},
    {"properties": {}}
  ],
  "relationships": [
    {"source": "aws_instance.web", "target": "aws_db_instance.db", "type": "connects to", "description": "app reads db", "confidence": 0.8},
    {"source": "aws_instance.web", "target": "aws_lb.front", "type": "behind"}
  ]
}
```"#;

    struct CannedAnalyzer {
        response: String,
        seen: RefCell<Option<String>>,
    }

    impl CannedAnalyzer {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                seen: RefCell::new(None),
            }
        }
    }

    impl SemanticAnalyzer for CannedAnalyzer {
        fn name(&self) -> &str {
            "canned"
        }

        fn analyze(&self, document: &str) -> Result<String> {
            *self.seen.borrow_mut() = Some(document.to_string());
            Ok(self.response.clone())
        }
    }

    struct FailingAnalyzer;

    impl SemanticAnalyzer for FailingAnalyzer {
        fn name(&self) -> &str {
            "failing"
        }

        fn analyze(&self, _document: &str) -> Result<String> {
            Err(Error::Analyzer("model unavailable".to_string()))
        }
    }

    #[test]
    fn test_build_context_scenario() {
        let files = [SourceFile::new("main.tf", WEB_AND_DB)];
        let output = ImportPipeline::default().build_context(&files).unwrap();

        assert_eq!(output.summary.resources, 2);
        assert_eq!(output.summary.dependencies, 1);
        assert_eq!(output.summary.groups, 2);
        assert_eq!(output.summary.syntax_errors, 0);
        assert!(!output.summary.truncated);
        assert!(output.dependencies.combined("aws_instance.web").contains("aws_db_instance.db"));

        let names: Vec<&str> = output.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["AWS - Compute", "AWS - Database"]);
        assert!(output.document.text.contains("aws_instance.web depends on: aws_db_instance.db"));
    }

    #[test]
    fn test_run_import() {
        let files = [SourceFile::new("main.tf", WEB_AND_DB)];
        let analyzer = CannedAnalyzer::new(ANALYSIS);
        let store = SqliteStore::open_in_memory().unwrap();

        let report = ImportPipeline::default()
            .run_import(&files, &analyzer, &store, MaterializeMode::Replace)
            .unwrap();

        assert!(analyzer.seen.borrow().as_deref().unwrap().contains("## Output Format"));
        assert_eq!(report.validation.resources_accepted, 2);
        assert_eq!(report.validation.resources_malformed, 1);
        assert_eq!(report.materialize.nodes_written, 2);
        assert_eq!(report.materialize.edges_written, 1);
        assert_eq!(report.materialize.edges_unresolved, 1);

        let edges = store.edges_from("aws_instance.web").unwrap();
        assert_eq!(edges[0].edge_type, "CONNECTS_TO");

        let text = report.to_string();
        assert!(text.contains("Edges: 1 written, 1 unresolved, 0 failed"));
        assert!(text.contains("Resources: 2 accepted, 1 malformed"));
    }

    #[test]
    fn test_analyzer_failure_leaves_store_untouched() {
        let files = [SourceFile::new("main.tf", WEB_AND_DB)];
        let store = SqliteStore::open_in_memory().unwrap();
        let pipeline = ImportPipeline::default();
        pipeline
            .run_import(&files, &CannedAnalyzer::new(ANALYSIS), &store, MaterializeMode::Replace)
            .unwrap();

        let result = pipeline.run_import(&files, &FailingAnalyzer, &store, MaterializeMode::Replace);
        assert!(matches!(result, Err(Error::Analyzer(_))));
        assert_eq!(store.count_nodes().unwrap(), 2);
    }

    struct BlockParser;

    impl SyntaxParser for BlockParser {
        fn name(&self) -> &str {
            "blocks"
        }

        fn file_extensions(&self) -> &[&str] {
            &["tf"]
        }

        fn parse(&self, path: &str, _content: &str) -> Result<Vec<ParsedBlock>> {
            if path.starts_with("broken") {
                return Err(Error::Syntax {
                    file: path.to_string(),
                    message: "unexpected token".to_string(),
                });
            }
            Ok(vec![
                ParsedBlock::new(DeclarationKind::Resource, "aws_instance", "web")
                    .with_argument("vpc", Value::Reference("module.network.vpc_id".to_string())),
                ParsedBlock::new(DeclarationKind::Module, "module", "network"),
            ])
        }
    }

    #[test]
    fn test_parser_integration() {
        let files = [
            SourceFile::new("main.tf", WEB_AND_DB),
            SourceFile::new("broken.tf", "resource \"aws_vpc\" \"main\" {}\n"),
        ];
        let mut parsers = ParserRegistry::new();
        parsers.register(BlockParser);

        let output = ImportPipeline::default()
            .with_parsers(parsers)
            .build_context(&files)
            .unwrap();

        assert_eq!(output.summary.syntax_errors, 1);
        let deps = output.dependencies.get("aws_instance.web").unwrap();
        assert!(deps.modules.contains("module.network"));
        assert!(deps.resources.contains("aws_db_instance.db"));
        // the lexical scan of broken.tf still contributes its resource
        assert_eq!(output.summary.resources, 3);
    }

    #[test]
    fn test_options_from_config() {
        let config = InfragraphConfig {
            max_document_chars: Some(5_000),
            strict_implicit: Some(true),
            ..Default::default()
        };
        let options = PipelineOptions::from(&config);
        assert_eq!(options.max_document_chars, 5_000);
        assert_eq!(options.primary_file, "main.tf");
        assert!(options.strict_implicit);
    }
}
