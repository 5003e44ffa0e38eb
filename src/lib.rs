//! # Infragraph - Infrastructure Configuration Graph
//!
//! Turns infrastructure-as-code configuration text into a typed graph of
//! resources and relationships.
//!
//! Infragraph provides:
//! - A lexical declaration scanner and a two-pass reference resolver
//! - Deterministic provider/category grouping of resources
//! - A size-bounded context document for an external semantic analyzer
//! - Graph materialization into SQLite with cascading endpoint resolution

pub mod declaration;
pub mod parser;
pub mod scanner;
pub mod dependency;
pub mod grouping;
pub mod context;
pub mod analyzer;
pub mod node;
pub mod edge;
pub mod storage;
pub mod materializer;
pub mod pipeline;
pub mod config;
pub mod ignore;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use declaration::{Declaration, DeclarationKind, DeclarationRegistry, Value};
pub use scanner::{DeclarationScanner, ScanResult, SourceFile};
pub use dependency::{DependencyCategory, DependencyMap, ReferenceResolver};
pub use grouping::{LogicalGroup, LogicalGrouper};
pub use context::{ContextAnnotator, ContextualizedDocument, DocumentFormatter, FormattedDocument};
pub use analyzer::{AnalysisOutput, RelationshipDescriptor, ResourceDescriptor, SemanticAnalyzer, ValidationReport};
pub use node::GraphNode;
pub use edge::{GraphEdge, sanitize_relationship_type};
pub use storage::{GraphStats, GraphStore, SqliteStore};
pub use materializer::{GraphMaterializer, MaterializeMode, MaterializeReport};
pub use pipeline::{ContextOutput, ContextSummary, ImportPipeline, ImportReport, PipelineOptions};

/// Result type alias for Infragraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Infragraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Syntax error in {file}: {message}")]
    Syntax { file: String, message: String },

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Unresolved endpoint: {0}")]
    UnresolvedEndpoint(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
