//! Document Formatter - assembles the size-bounded analyzer document
//!
//! Section order is fixed: overview, group summary, dependency summary,
//! file contents (primary file first, then by name), output instructions.
//! When the assembled text is longer than the limit, whole trailing
//! sections are dropped and a truncation notice is appended.

use serde::Serialize;
use super::ContextualizedDocument;

/// Default maximum document length, in bytes
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Smallest accepted limit; the truncation notice always fits within it
pub const MIN_MAX_CHARS: usize = 256;

pub const DEFAULT_PRIMARY_FILE: &str = "main.tf";

const SECTION_SEPARATOR: &str = "\n";

const OUTPUT_INSTRUCTIONS: &str = r#"## Output Format

Respond with a single JSON object and nothing else:

```json
{
  "resources": [
    {"id": "aws_instance.web", "type": "aws_instance", "name": "web", "provider": "aws", "properties": {}}
  ],
  "relationships": [
    {"source": "aws_instance.web", "target": "aws_security_group.web_sg", "type": "DEPENDS_ON", "description": "Instance uses the security group", "confidence": 0.9}
  ]
}
```

- `id` should be the composite id `type.name`.
- `source` and `target` must name resource ids from the `resources` list.
- `confidence` is a number between 0 and 1.
"#;

/// Lengths recorded when a document had to be cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Truncation {
    pub original_len: usize,
    pub truncated_len: usize,
}

/// The final analyzer document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedDocument {
    pub text: String,
    pub truncation: Option<Truncation>,
}

impl FormattedDocument {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentFormatter {
    max_chars: usize,
    primary_file: String,
}

impl Default for DocumentFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentFormatter {
    pub fn new() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            primary_file: DEFAULT_PRIMARY_FILE.to_string(),
        }
    }

    /// Limits below [`MIN_MAX_CHARS`] are raised to it
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        if max_chars < MIN_MAX_CHARS {
            tracing::warn!("max_document_chars {} is below the minimum, using {}", max_chars, MIN_MAX_CHARS);
        }
        self.max_chars = max_chars.max(MIN_MAX_CHARS);
        self
    }

    pub fn with_primary_file(mut self, primary_file: impl Into<String>) -> Self {
        self.primary_file = primary_file.into();
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn format(&self, document: &ContextualizedDocument) -> FormattedDocument {
        let sections = self.sections(document);
        let original_len = joined_len(&sections);

        if original_len <= self.max_chars {
            return FormattedDocument {
                text: sections.join(SECTION_SEPARATOR),
                truncation: None,
            };
        }

        // Keep whole sections while they fit alongside the notice
        let mut kept: Vec<&str> = Vec::new();
        for section in &sections {
            let mut candidate = kept.clone();
            candidate.push(section);
            let text_len = joined_len(&candidate);
            if text_len + truncation_notice(original_len, text_len).len() > self.max_chars {
                break;
            }
            kept = candidate;
        }

        let mut text = kept.join(SECTION_SEPARATOR);
        let truncated_len = text.len();
        text.push_str(&truncation_notice(original_len, truncated_len));

        tracing::warn!(
            "Context document truncated from {} to {} bytes (limit {})",
            original_len,
            truncated_len,
            self.max_chars
        );

        FormattedDocument {
            text,
            truncation: Some(Truncation {
                original_len,
                truncated_len,
            }),
        }
    }

    fn sections(&self, document: &ContextualizedDocument) -> Vec<String> {
        let mut sections = vec![
            document.overview.clone(),
            document.group_summary.clone(),
            document.dependency_summary.clone(),
        ];

        let mut files: Vec<_> = document.files.iter().collect();
        files.sort_by(|a, b| {
            let a_primary = a.filename != self.primary_file;
            let b_primary = b.filename != self.primary_file;
            a_primary.cmp(&b_primary).then_with(|| a.filename.cmp(&b.filename))
        });
        for file in files {
            sections.push(clean_embedded(&file.content));
        }

        sections.push(OUTPUT_INSTRUCTIONS.to_string());
        sections
    }
}

fn joined_len<S: AsRef<str>>(sections: &[S]) -> usize {
    let content: usize = sections.iter().map(|s| s.as_ref().len()).sum();
    content + SECTION_SEPARATOR.len() * sections.len().saturating_sub(1)
}

fn truncation_notice(original_len: usize, truncated_len: usize) -> String {
    format!(
        "\n\n[Document truncated: original length {} bytes, truncated to {} bytes]\n",
        original_len, truncated_len
    )
}

/// Normalize an embedded file copy: LF line endings, no trailing
/// whitespace, runs of 3+ blank lines collapsed to one.
pub fn clean_embedded(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(normalized.len());
    let mut blank_run = 0usize;

    for line in normalized.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        push_blank_lines(&mut out, blank_run);
        blank_run = 0;
        out.push_str(line);
        out.push('\n');
    }
    push_blank_lines(&mut out, blank_run);
    out
}

fn push_blank_lines(out: &mut String, run: usize) {
    let keep = if run >= 3 { 1 } else { run };
    for _ in 0..keep {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AnnotatedFile, DocumentMetadata};
    use chrono::Utc;

    fn document(files: &[(&str, &str)]) -> ContextualizedDocument {
        ContextualizedDocument {
            overview: "# Infrastructure Overview\n".to_string(),
            group_summary: "## Resource Groups\n".to_string(),
            dependency_summary: "## Dependency Summary\n".to_string(),
            files: files
                .iter()
                .map(|(name, content)| AnnotatedFile {
                    filename: name.to_string(),
                    cross_references: vec![],
                    relationship_hints: vec![],
                    content: content.to_string(),
                })
                .collect(),
            metadata: DocumentMetadata {
                file_count: files.len(),
                resource_count: 0,
                dependency_count: 0,
                group_count: 0,
                generated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_section_order_primary_first() {
        let doc = document(&[("zeta.tf", "zeta\n"), ("main.tf", "main\n"), ("alpha.tf", "alpha\n")]);
        let out = DocumentFormatter::new().format(&doc);
        assert!(!out.is_truncated());

        let overview = out.text.find("# Infrastructure Overview").unwrap();
        let deps = out.text.find("## Dependency Summary").unwrap();
        let main = out.text.find("main\n").unwrap();
        let alpha = out.text.find("alpha\n").unwrap();
        let zeta = out.text.find("zeta\n").unwrap();
        let instructions = out.text.find("## Output Format").unwrap();
        assert!(overview < deps && deps < main && main < alpha && alpha < zeta && zeta < instructions);
    }

    #[test]
    fn test_truncates_at_section_boundary() {
        let big = "x".repeat(5_000);
        let doc = document(&[("main.tf", &big), ("other.tf", &big)]);
        let formatter = DocumentFormatter::new().with_max_chars(6_000);
        let out = formatter.format(&doc);

        assert!(out.len() <= 6_000);
        let truncation = out.truncation.unwrap();
        assert!(truncation.original_len > 10_000);
        assert!(out.text.contains(&format!("original length {}", truncation.original_len)));
        assert!(out.text.contains(&format!("truncated to {}", truncation.truncated_len)));
        // main.tf fits whole, other.tf is dropped entirely
        assert_eq!(out.text.matches(&big).count(), 1);
        assert!(!out.text.contains("## Output Format"));
    }

    #[test]
    fn test_tiny_limit_keeps_whole_notice() {
        let doc = document(&[("main.tf", "resource {}\n")]);
        for limit in [0, 10, 40, 120, MIN_MAX_CHARS] {
            let formatter = DocumentFormatter::new().with_max_chars(limit);
            assert_eq!(formatter.max_chars(), MIN_MAX_CHARS);

            let out = formatter.format(&doc);
            assert!(out.len() <= MIN_MAX_CHARS, "limit {} produced {}", limit, out.len());
            let truncation = out.truncation.unwrap();
            assert!(out.text.ends_with(&format!(
                "original length {} bytes, truncated to {} bytes]\n",
                truncation.original_len, truncation.truncated_len
            )));
        }
    }

    #[test]
    fn test_clean_embedded() {
        let raw = "a  \r\nb\r\n\r\n\r\n\r\n\r\nc\t\n\nd\n";
        assert_eq!(clean_embedded(raw), "a\nb\n\nc\n\nd\n");
    }
}
