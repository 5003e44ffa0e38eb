//! Declaration Scanner - lightweight lexical pass over configuration files
//!
//! Each declaration kind has its own line-anchored pattern. Detection does not
//! balance braces; only `locals` and `required_providers` bodies are
//! extracted, using the same brace-depth segmentation as the resolver.
//!
//! Providers come from explicit `provider "x" {}` blocks and from the first
//! `required_providers` block of a file. Later `required_providers` blocks in
//! the same file are not scanned.

use crate::{Error, Result};
use crate::declaration::{Declaration, DeclarationKind, DeclarationRegistry};
use crate::dependency::blocks::{extract_block, top_level_keys};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// `resource "<type>" "<name>" {`
pub const RESOURCE_HEADER: &str = r#"(?m)^[ \t]*resource[ \t]+"([^"]+)"[ \t]+"([^"]+)"[ \t]*\{"#;
const DATA_HEADER: &str = r#"(?m)^[ \t]*data[ \t]+"([^"]+)"[ \t]+"([^"]+)"[ \t]*\{"#;
const MODULE_HEADER: &str = r#"(?m)^[ \t]*module[ \t]+"([^"]+)"[ \t]*\{"#;
const VARIABLE_HEADER: &str = r#"(?m)^[ \t]*variable[ \t]+"([^"]+)"[ \t]*\{"#;
const OUTPUT_HEADER: &str = r#"(?m)^[ \t]*output[ \t]+"([^"]+)"[ \t]*\{"#;
const PROVIDER_HEADER: &str = r#"(?m)^[ \t]*provider[ \t]+"([^"]+)"[ \t]*\{"#;
const LOCALS_HEADER: &str = r#"(?m)^[ \t]*locals[ \t]*\{"#;
const REQUIRED_PROVIDERS: &str = r#"required_providers[ \t]*\{"#;

static HEADER_PATTERNS: OnceLock<std::result::Result<HeaderPatterns, regex::Error>> = OnceLock::new();

/// Declaration header matchers, compiled once per process
pub(crate) struct HeaderPatterns {
    pub(crate) resource: Regex,
    data: Regex,
    module: Regex,
    variable: Regex,
    output: Regex,
    provider: Regex,
    locals: Regex,
    required_providers: Regex,
}

impl HeaderPatterns {
    fn compile() -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            resource: Regex::new(RESOURCE_HEADER)?,
            data: Regex::new(DATA_HEADER)?,
            module: Regex::new(MODULE_HEADER)?,
            variable: Regex::new(VARIABLE_HEADER)?,
            output: Regex::new(OUTPUT_HEADER)?,
            provider: Regex::new(PROVIDER_HEADER)?,
            locals: Regex::new(LOCALS_HEADER)?,
            required_providers: Regex::new(REQUIRED_PROVIDERS)?,
        })
    }

    pub(crate) fn get() -> Result<&'static Self> {
        HEADER_PATTERNS
            .get_or_init(Self::compile)
            .as_ref()
            .map_err(|e| Error::Regex(e.clone()))
    }
}

/// A configuration file handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Structural counts for one scanned file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file: String,
    pub resources: usize,
    pub data_sources: usize,
    pub modules: usize,
    pub variables: usize,
    pub locals: usize,
    pub outputs: usize,
    pub providers: usize,
}

/// A file that could not be scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub file: String,
    pub message: String,
}

/// Output of scanning a batch of files
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub registry: DeclarationRegistry,
    pub files: Vec<FileSummary>,
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    pub fn resource_count(&self) -> usize {
        self.registry.resource_ids().len()
    }
}

/// Extracts declarations from configuration text with independent matchers
pub struct DeclarationScanner {
    patterns: &'static HeaderPatterns,
}

impl DeclarationScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: HeaderPatterns::get()?,
        })
    }

    /// Scan every file; a file that fails is logged and skipped
    pub fn scan(&self, files: &[SourceFile]) -> ScanResult {
        let mut result = ScanResult::default();

        for file in files {
            match self.scan_file(file) {
                Ok((declarations, summary)) => {
                    tracing::debug!(
                        "Scanned {}: {} resources, {} variables, {} outputs, {} providers",
                        file.name,
                        summary.resources,
                        summary.variables,
                        summary.outputs,
                        summary.providers
                    );
                    for declaration in declarations {
                        result.registry.insert(declaration);
                    }
                    result.files.push(summary);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.name, e);
                    result.failures.push(ScanFailure {
                        file: file.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Scanned {} files: {} declarations, {} resources, {} failed",
            files.len(),
            result.registry.len(),
            result.resource_count(),
            result.failures.len()
        );
        result
    }

    /// Scan one file, returning its declarations in source order
    pub fn scan_file(&self, file: &SourceFile) -> Result<(Vec<Declaration>, FileSummary)> {
        if file.content.contains('\0') {
            return Err(Error::Syntax {
                file: file.name.clone(),
                message: "file contains NUL bytes; not configuration text".to_string(),
            });
        }

        let text = file.content.as_str();
        let mut declarations = Vec::new();
        let mut summary = FileSummary {
            file: file.name.clone(),
            ..FileSummary::default()
        };

        for caps in self.patterns.resource.captures_iter(text) {
            declarations.push(Declaration::resource(&caps[1], &caps[2], &file.name));
            summary.resources += 1;
        }

        for caps in self.patterns.data.captures_iter(text) {
            declarations.push(Declaration::new(DeclarationKind::Data, &caps[1], &caps[2], &file.name));
            summary.data_sources += 1;
        }

        for (pattern, kind) in [
            (&self.patterns.module, DeclarationKind::Module),
            (&self.patterns.variable, DeclarationKind::Variable),
            (&self.patterns.output, DeclarationKind::Output),
        ] {
            for caps in pattern.captures_iter(text) {
                declarations.push(Declaration::new(kind, kind.as_str(), &caps[1], &file.name));
                match kind {
                    DeclarationKind::Module => summary.modules += 1,
                    DeclarationKind::Variable => summary.variables += 1,
                    _ => summary.outputs += 1,
                }
            }
        }

        for m in self.patterns.locals.find_iter(text) {
            if let Some(span) = extract_block(text, m.end().saturating_sub(1)) {
                for key in top_level_keys(span.body(text)) {
                    declarations.push(Declaration::new(DeclarationKind::Local, "local", key, &file.name));
                    summary.locals += 1;
                }
            }
        }

        let providers = self.providers_in(text);
        summary.providers = providers.len();
        declarations.extend(
            providers
                .into_iter()
                .map(|name| Declaration::new(DeclarationKind::Provider, "provider", name, &file.name)),
        );

        Ok((declarations, summary))
    }

    /// Explicit provider blocks plus the first `required_providers` block
    fn providers_in(&self, text: &str) -> Vec<String> {
        let mut providers: Vec<String> = self
            .patterns
            .provider
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();

        if let Some(m) = self.patterns.required_providers.find(text) {
            if let Some(span) = extract_block(text, m.end().saturating_sub(1)) {
                for key in top_level_keys(span.body(text)) {
                    if !providers.contains(&key) {
                        providers.push(key);
                    }
                }
            }
        }

        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN_TF: &str = r#"
terraform {
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
    random = {
      source = "hashicorp/random"
    }
  }
}

provider "aws" {
  region = var.region
}

variable "region" {
  default = "us-east-1"
}

locals {
  common_tags = {
    Team = "platform"
  }
  env = "prod"
}

data "aws_ami" "ubuntu" {
  most_recent = true
}

resource "aws_instance" "web" {
  ami           = data.aws_ami.ubuntu.id
  instance_type = "t3.micro"
  tags          = local.common_tags
}

module "vpc" {
  source = "./modules/vpc"
}

output "web_ip" {
  value = aws_instance.web.public_ip
}
"#;

    #[test]
    fn test_scan_all_kinds() {
        let scanner = DeclarationScanner::new().unwrap();
        let result = scanner.scan(&[SourceFile::new("main.tf", MAIN_TF)]);

        let registry = &result.registry;
        assert!(registry.contains("aws_instance.web"));
        assert!(registry.contains("data.aws_ami.ubuntu"));
        assert!(registry.contains("module.vpc"));
        assert!(registry.contains("var.region"));
        assert!(registry.contains("local.common_tags"));
        assert!(registry.contains("local.env"));
        assert!(!registry.contains("local.Team"));
        assert!(registry.contains("output.web_ip"));
        assert_eq!(registry.providers().into_iter().collect::<Vec<_>>(), vec!["aws", "random"]);

        let summary = &result.files[0];
        assert_eq!(summary.resources, 1);
        assert_eq!(summary.variables, 1);
        assert_eq!(summary.outputs, 1);
        assert_eq!(summary.providers, 2);
        assert_eq!(summary.locals, 2);
    }

    #[test]
    fn test_only_first_required_providers_block() {
        let text = r#"
terraform {
  required_providers {
    aws = { source = "hashicorp/aws" }
  }
}
terraform {
  required_providers {
    google = { source = "hashicorp/google" }
  }
}
"#;
        let scanner = DeclarationScanner::new().unwrap();
        let result = scanner.scan(&[SourceFile::new("versions.tf", text)]);
        let providers = result.registry.providers();
        assert!(providers.contains("aws"));
        assert!(!providers.contains("google"));
    }

    #[test]
    fn test_every_resource_has_composite_id() {
        let scanner = DeclarationScanner::new().unwrap();
        let result = scanner.scan(&[
            SourceFile::new("a.tf", "resource \"aws_s3_bucket\" \"logs\" {}\n"),
            SourceFile::new("b.tf", "  resource \"aws_vpc\" \"main\" {\n}\n"),
        ]);
        assert_eq!(result.resource_count(), 2);
        for declaration in result.registry.resources() {
            let id = declaration.composite_id();
            let (t, n) = id.split_once('.').unwrap();
            assert!(!t.is_empty() && !n.is_empty());
        }
    }

    #[test]
    fn test_malformed_file_does_not_stop_batch() {
        let scanner = DeclarationScanner::new().unwrap();
        let result = scanner.scan(&[
            SourceFile::new("binary.tf", "resource \"aws_vpc\" \"x\" {\0}"),
            SourceFile::new("ok.tf", "resource \"aws_vpc\" \"main\" {}\n"),
        ]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].file, "binary.tf");
        assert!(result.registry.contains("aws_vpc.main"));
        assert!(!result.registry.contains("aws_vpc.x"));
    }
}
