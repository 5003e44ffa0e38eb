//! Syntax parser seam
//!
//! Full-grammar parsing lives outside this crate. A parser converts raw file
//! text into typed blocks; the core only consumes block kind, type, name and
//! argument values. A parse failure affects only the file being parsed.

use crate::Result;
use crate::declaration::{Declaration, DeclarationKind, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A top-level block produced by a syntax parser
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub kind: DeclarationKind,
    /// Resource or data source type; ignored for other kinds
    pub block_type: String,
    pub name: String,
    pub arguments: BTreeMap<String, Value>,
}

impl ParsedBlock {
    pub fn new(kind: DeclarationKind, block_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            block_type: block_type.into(),
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    pub fn to_declaration(&self, file: &str) -> Declaration {
        Declaration::new(self.kind, &self.block_type, self.name.clone(), file)
    }

    /// Every reference traversal found in the block's arguments
    pub fn references(&self) -> Vec<&str> {
        self.arguments.values().flat_map(|v| v.references()).collect()
    }
}

/// Blocks parsed from one file
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub path: String,
    pub blocks: Vec<ParsedBlock>,
}

/// Trait for configuration syntax parsers
pub trait SyntaxParser: Send + Sync {
    /// Parser name (for display)
    fn name(&self) -> &str;

    /// File extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Check if this parser can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.file_extensions().contains(&ext))
            .unwrap_or(false)
    }

    /// Parse a file into typed blocks
    fn parse(&self, path: &str, content: &str) -> Result<Vec<ParsedBlock>>;
}

/// Registry of syntax parsers
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn SyntaxParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: impl SyntaxParser + 'static) {
        self.parsers.push(Box::new(parser));
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn find_parser(&self, path: &Path) -> Option<&dyn SyntaxParser> {
        self.parsers
            .iter()
            .find(|p| p.can_handle(path))
            .map(|p| p.as_ref())
    }

    /// Parse a file with the matching parser, `Ok(None)` when no parser handles it
    pub fn parse_file(&self, path: &str, content: &str) -> Result<Option<ParsedFile>> {
        match self.find_parser(Path::new(path)) {
            Some(parser) => {
                let blocks = parser.parse(path, content)?;
                Ok(Some(ParsedFile {
                    path: path.to_string(),
                    blocks,
                }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestParser;

    impl SyntaxParser for TestParser {
        fn name(&self) -> &str { "test" }
        fn file_extensions(&self) -> &[&str] { &["tf"] }
        fn parse(&self, _path: &str, _content: &str) -> Result<Vec<ParsedBlock>> {
            Ok(vec![
                ParsedBlock::new(DeclarationKind::Resource, "aws_vpc", "main")
                    .with_argument("cidr_block", Value::String("10.0.0.0/16".to_string())),
            ])
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = ParserRegistry::new();
        registry.register(TestParser);

        assert!(registry.find_parser(Path::new("main.tf")).is_some());
        assert!(registry.find_parser(Path::new("README.md")).is_none());
        assert!(registry.parse_file("README.md", "").unwrap().is_none());
    }
}
