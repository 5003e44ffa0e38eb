//! Semantic analyzer seam
//!
//! The analyzer receives the context document and answers with JSON:
//!
//! ```json
//! {"resources": [{"id", "type", "name", "provider", "properties"}],
//!  "relationships": [{"source", "target", "type", "description", "confidence"}]}
//! ```
//!
//! Entries are validated one by one. A malformed entry is dropped and
//! counted; it never fails the batch.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

/// A resource inferred by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "empty_properties")]
    pub properties: serde_json::Value,
}

impl ResourceDescriptor {
    pub fn new(resource_type: &str, name: &str) -> Self {
        Self {
            id: Some(format!("{}.{}", resource_type, name)),
            resource_type: Some(resource_type.to_string()),
            name: Some(name.to_string()),
            provider: None,
            properties: empty_properties(),
        }
    }

    /// Structural checks beyond what deserialization enforces
    fn validate(&self) -> std::result::Result<(), String> {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !present(&self.id) && !present(&self.resource_type) && !present(&self.name) {
            return Err("resource has none of id, type, name".to_string());
        }
        Ok(())
    }
}

/// A relationship inferred by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub relationship_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl RelationshipDescriptor {
    pub fn new(source: &str, target: &str, relationship_type: &str, confidence: f64) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: relationship_type.to_string(),
            description: String::new(),
            confidence,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.source.trim().is_empty() || self.target.trim().is_empty() {
            return Err("relationship requires non-empty source and target".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} outside [0, 1]", self.confidence));
        }
        Ok(())
    }
}

fn empty_properties() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_confidence() -> f64 {
    1.0
}

/// Counts of accepted and discarded analyzer entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub resources_accepted: usize,
    pub resources_malformed: usize,
    pub relationships_accepted: usize,
    pub relationships_malformed: usize,
}

/// Validated analyzer output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisOutput {
    pub resources: Vec<ResourceDescriptor>,
    pub relationships: Vec<RelationshipDescriptor>,
}

impl AnalysisOutput {
    /// Parse and validate an analyzer response.
    ///
    /// The response may wrap the JSON object in prose or a code fence; the
    /// outermost `{...}` is used. Only a response without any JSON object is
    /// an error.
    pub fn from_response(raw: &str) -> Result<(Self, ValidationReport)> {
        let json = extract_json_object(raw)
            .ok_or_else(|| Error::MalformedDescriptor("response contains no JSON object".to_string()))?;
        let value: serde_json::Value = serde_json::from_str(json)?;

        let mut output = AnalysisOutput::default();
        let mut report = ValidationReport::default();

        for entry in array_field(&value, "resources") {
            match serde_json::from_value::<ResourceDescriptor>(entry.clone())
                .map_err(|e| e.to_string())
                .and_then(|r| r.validate().map(|_| r))
            {
                Ok(resource) => {
                    output.resources.push(resource);
                    report.resources_accepted += 1;
                }
                Err(e) => {
                    tracing::warn!("Discarding malformed resource descriptor: {}", e);
                    report.resources_malformed += 1;
                }
            }
        }

        for entry in array_field(&value, "relationships") {
            match serde_json::from_value::<RelationshipDescriptor>(entry.clone())
                .map_err(|e| e.to_string())
                .and_then(|r| r.validate().map(|_| r))
            {
                Ok(relationship) => {
                    output.relationships.push(relationship);
                    report.relationships_accepted += 1;
                }
                Err(e) => {
                    tracing::warn!("Discarding malformed relationship descriptor: {}", e);
                    report.relationships_malformed += 1;
                }
            }
        }

        tracing::info!(
            "Analyzer output: {} resources ({} malformed), {} relationships ({} malformed)",
            report.resources_accepted,
            report.resources_malformed,
            report.relationships_accepted,
            report.relationships_malformed
        );
        Ok((output, report))
    }
}

fn array_field<'a>(value: &'a serde_json::Value, field: &str) -> &'a [serde_json::Value] {
    value
        .get(field)
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Trait for semantic analyzers. Calls are synchronous and blocking; any
/// timeout belongs to the implementation.
pub trait SemanticAnalyzer {
    /// Analyzer name (for display)
    fn name(&self) -> &str;

    /// Analyze a context document, returning the raw response text
    fn analyze(&self, document: &str) -> Result<String>;
}

/// Replays a response saved to disk
pub struct JsonFileAnalyzer {
    path: PathBuf,
}

impl JsonFileAnalyzer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SemanticAnalyzer for JsonFileAnalyzer {
    fn name(&self) -> &str {
        "json-file"
    }

    fn analyze(&self, _document: &str) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Runs an external command: the document goes to stdin, JSON is read from stdout
pub struct CommandAnalyzer {
    label: String,
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        Self {
            label: program.clone(),
            program,
            args,
        }
    }

    /// Run a command line through the platform shell (`sh -c`, or `cmd /C`
    /// on Windows), so quoting and pipes behave as typed
    pub fn from_command_line(command: &str) -> Result<Self> {
        let command = command.trim();
        if command.is_empty() {
            return Err(Error::Analyzer("empty analyzer command".to_string()));
        }

        #[cfg(windows)]
        let (shell, flag) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, flag) = ("sh", "-c");

        Ok(Self {
            label: command.to_string(),
            program: shell.to_string(),
            args: vec![flag.to_string(), command.to_string()],
        })
    }
}

impl SemanticAnalyzer for CommandAnalyzer {
    fn name(&self) -> &str {
        &self.label
    }

    fn analyze(&self, document: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        // stdin is fed from its own thread so a child that writes while it
        // reads cannot fill both pipes
        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            let writer = stdin.map(|mut stdin| scope.spawn(move || stdin.write_all(document.as_bytes())));
            let output = child.wait_with_output();
            let written = match writer.map(|handle| handle.join()) {
                None | Some(Ok(Ok(()))) => Ok(()),
                // A child may exit without reading all of its input
                Some(Ok(Err(e))) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!("{} closed stdin before the document was written", self.label);
                    Ok(())
                }
                Some(Ok(Err(e))) => Err(Error::Io(e)),
                Some(Err(_)) => Err(Error::Analyzer("stdin writer thread panicked".to_string())),
            };
            (output, written)
        });
        let output = output?;

        if !output.status.success() {
            return Err(Error::Analyzer(format!(
                "{} exited with {}",
                self.label, output.status
            )));
        }
        written?;
        String::from_utf8(output.stdout)
            .map_err(|e| Error::Analyzer(format!("{} produced non-UTF-8 output: {}", self.label, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let raw = r#"{
            "resources": [
                {"id": "aws_instance.web", "type": "aws_instance", "name": "web", "provider": "aws",
                 "properties": {"instance_type": "t3.micro", "tags": {"Name": "web"}}}
            ],
            "relationships": [
                {"source": "aws_instance.web", "target": "aws_security_group.web_sg",
                 "type": "depends on", "description": "uses sg", "confidence": 0.9}
            ]
        }"#;
        let (output, report) = AnalysisOutput::from_response(raw).unwrap();
        assert_eq!(report.resources_accepted, 1);
        assert_eq!(report.relationships_accepted, 1);
        assert_eq!(output.resources[0].properties["tags"]["Name"], "web");
        assert_eq!(output.relationships[0].relationship_type, "depends on");
    }

    #[test]
    fn test_malformed_entries_are_discarded() {
        let raw = r#"Here is the analysis:
```json
{
  "resources": [
    {"type": "aws_vpc", "name": "main"},
    {"properties": {}},
    "not an object"
  ],
  "relationships": [
    {"source": "a.b", "target": "c.d", "confidence": 1.5},
    {"source": "a.b"},
    {"source": "", "target": "c.d"},
    {"source": "a.b", "target": "c.d"}
  ]
}
```"#;
        let (output, report) = AnalysisOutput::from_response(raw).unwrap();
        assert_eq!(report.resources_accepted, 1);
        assert_eq!(report.resources_malformed, 2);
        assert_eq!(report.relationships_accepted, 1);
        assert_eq!(report.relationships_malformed, 3);
        assert_eq!(output.relationships[0].confidence, 1.0);
    }

    #[test]
    fn test_response_without_json_is_error() {
        assert!(matches!(
            AnalysisOutput::from_response("I could not analyze this."),
            Err(Error::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn test_json_file_analyzer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response.json");
        std::fs::write(&path, r#"{"resources": [], "relationships": []}"#).unwrap();

        let analyzer = JsonFileAnalyzer::new(&path);
        let raw = analyzer.analyze("ignored").unwrap();
        let (output, _) = AnalysisOutput::from_response(&raw).unwrap();
        assert!(output.resources.is_empty());
    }

    #[test]
    fn test_command_line_runs_through_shell() {
        let analyzer = CommandAnalyzer::from_command_line(r#" python3 "my analyzer.py" --model large "#).unwrap();
        assert_eq!(analyzer.name(), r#"python3 "my analyzer.py" --model large"#);
        assert_eq!(analyzer.args.last().unwrap(), r#"python3 "my analyzer.py" --model large"#);
        assert!(CommandAnalyzer::from_command_line("   ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_preserves_quoted_arguments() {
        let analyzer = CommandAnalyzer::from_command_line(r#"printf '%s|' "two words" three"#).unwrap();
        assert_eq!(analyzer.analyze("ignored").unwrap(), "two words|three|");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_ignores_unread_input() {
        // Exits without reading stdin; the document is larger than a pipe buffer
        let analyzer = CommandAnalyzer::new(
            "sh",
            vec!["-c".to_string(), r#"echo '{"resources": [], "relationships": []}'"#.to_string()],
        );
        let raw = analyzer.analyze(&"x".repeat(200_000)).unwrap();
        let (output, _) = AnalysisOutput::from_response(&raw).unwrap();
        assert!(output.resources.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_streams_large_documents() {
        // `cat` writes while it reads, so both pipes fill at once
        let document = "resource \"aws_vpc\" \"main\" {}\n".repeat(40_000);
        let analyzer = CommandAnalyzer::new("cat", Vec::new());
        let echoed = analyzer.analyze(&document).unwrap();
        assert_eq!(echoed.len(), document.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_failed_exit() {
        let analyzer = CommandAnalyzer::from_command_line("exit 3").unwrap();
        let err = analyzer.analyze("doc").unwrap_err();
        assert!(matches!(err, Error::Analyzer(_)));
    }
}
