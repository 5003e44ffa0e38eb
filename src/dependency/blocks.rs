//! Brace-depth block segmentation
//!
//! A block runs from its opening `{` to the first point where the brace
//! balance returns to zero. Braces inside strings are counted like any
//! other; interpolations (`${...}`) are balanced so they do not disturb
//! the count in practice.

use regex::Regex;

/// Byte span of a brace-delimited block within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// Offset of the opening brace
    pub open: usize,
    /// Offset one past the closing brace (or end of text when unterminated)
    pub end: usize,
    pub terminated: bool,
}

impl BlockSpan {
    /// Text between the braces
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        let inner_end = if self.terminated { self.end - 1 } else { self.end };
        &text[self.open + 1..inner_end.max(self.open + 1)]
    }
}

/// Find the block whose opening brace is the first `{` at or after `from`.
pub fn extract_block(text: &str, from: usize) -> Option<BlockSpan> {
    let open = from + text.get(from..)?.find('{')?;
    let mut depth: usize = 0;

    for (offset, byte) in text.as_bytes()[open..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(BlockSpan {
                        open,
                        end: open + offset + 1,
                        terminated: true,
                    });
                }
            }
            _ => {}
        }
    }

    Some(BlockSpan {
        open,
        end: text.len(),
        terminated: false,
    })
}

/// A resource declaration together with the text of its block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock<'a> {
    pub resource_id: String,
    /// Header plus body, e.g. `resource "aws_instance" "web" { ... }`
    pub text: &'a str,
    pub terminated: bool,
}

/// Segment a file into resource blocks using the resource header pattern.
///
/// The pattern must capture the resource type and name in groups 1 and 2
/// and end at the opening brace.
pub fn resource_blocks<'a>(text: &'a str, header: &Regex) -> Vec<ResourceBlock<'a>> {
    let mut blocks = Vec::new();

    for caps in header.captures_iter(text) {
        let (Some(whole), Some(resource_type), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(span) = extract_block(text, whole.end().saturating_sub(1)) else {
            continue;
        };
        if !span.terminated {
            tracing::debug!(
                "Block for {}.{} is not terminated; taking text to end of file",
                resource_type.as_str(),
                name.as_str()
            );
        }
        blocks.push(ResourceBlock {
            resource_id: format!("{}.{}", resource_type.as_str(), name.as_str()),
            text: &text[whole.start()..span.end],
            terminated: span.terminated,
        });
    }

    blocks
}

/// Keys assigned directly inside a block body (nested blocks are skipped).
pub fn top_level_keys(body: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut depth: i64 = 0;

    for line in body.lines() {
        if depth == 0 {
            if let Some(key) = assignment_key(line) {
                keys.push(key.to_string());
            }
        }
        for byte in line.bytes() {
            match byte {
                b'{' | b'[' | b'(' => depth += 1,
                b'}' | b']' | b')' => depth -= 1,
                _ => {}
            }
        }
    }

    keys
}

fn assignment_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return None;
    }
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(trimmed.len());
    let (key, rest) = trimmed.split_at(end);
    let first = key.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let rest = rest.trim_start();
    if rest.starts_with('=') && !rest.starts_with("==") {
        Some(key)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::RESOURCE_HEADER;

    #[test]
    fn test_extract_nested_block() {
        let text = "resource \"a\" \"b\" {\n  tags = { Name = \"x\" }\n}\nafter";
        let span = extract_block(text, 0).unwrap();
        assert!(span.terminated);
        assert_eq!(&text[span.end..], "\nafter");
        assert!(span.body(text).contains("tags"));
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        let text = "resource \"a\" \"b\" {\n  x = 1\n";
        let span = extract_block(text, 0).unwrap();
        assert!(!span.terminated);
        assert_eq!(span.end, text.len());
    }

    #[test]
    fn test_resource_blocks_are_separate() {
        let text = r#"
resource "aws_instance" "web" {
  ami = "ami-1"
  subnet_id = aws_subnet.a.id
}

resource "aws_subnet" "a" {
  cidr_block = "10.0.1.0/24"
}
"#;
        let header = Regex::new(RESOURCE_HEADER).unwrap();
        let blocks = resource_blocks(text, &header);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].resource_id, "aws_instance.web");
        assert!(blocks[0].text.contains("aws_subnet.a.id"));
        assert!(!blocks[0].text.contains("10.0.1.0/24"));
        assert_eq!(blocks[1].resource_id, "aws_subnet.a");
    }

    #[test]
    fn test_top_level_keys_skip_nested() {
        let body = "\n  region = \"us-east-1\"\n  tags = {\n    Owner = \"ops\"\n  }\n  enabled = a == b\n";
        let keys = top_level_keys(body);
        assert_eq!(keys, vec!["region", "tags", "enabled"]);
    }
}
