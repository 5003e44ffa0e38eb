//! Context document for the semantic analyzer
//!
//! The annotator turns scan, dependency and grouping results into an
//! overview plus per-file annotated text; the formatter assembles the
//! size-bounded document that is handed to the analyzer.

pub mod annotator;
pub mod formatter;

pub use annotator::ContextAnnotator;
pub use formatter::{DocumentFormatter, FormattedDocument, Truncation};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counts and timestamps describing one context document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub file_count: usize,
    pub resource_count: usize,
    pub dependency_count: usize,
    pub group_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// One input file wrapped in banners, with the annotations attributed to it.
///
/// Attribution matches resource names against the file name, so comments
/// may land on more than one file or on none. They are hints only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedFile {
    pub filename: String,
    pub cross_references: Vec<String>,
    pub relationship_hints: Vec<String>,
    /// Banner-wrapped text with annotations, original content untouched
    pub content: String,
}

/// Everything the formatter needs to assemble the analyzer document
#[derive(Debug, Clone, Serialize)]
pub struct ContextualizedDocument {
    pub overview: String,
    pub group_summary: String,
    pub dependency_summary: String,
    pub files: Vec<AnnotatedFile>,
    pub metadata: DocumentMetadata,
}
