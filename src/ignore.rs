//! Source collection for the CLI

use ignore::WalkBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

use crate::Result;
use crate::config::InfragraphConfig;
use crate::scanner::SourceFile;

pub struct IgnoreFilter {
    inner: Gitignore,
}

impl IgnoreFilter {
    pub fn new(root: &Path, extra_excludes: Option<&[String]>) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        builder.add(root.join(".gitignore"));
        builder.add(root.join(".ignore"));

        let defaults = [
            // Tool state
            ".terraform/", ".terragrunt-cache/", ".infragraph/", ".git/",
            "node_modules/", "vendor/", "target/",

            // State and plans
            "*.tfstate", "*.tfstate.*", "*.tfplan", "crash.log", "*.lock.hcl",

            // Database files
            "*.db", "*.sqlite", "*.sqlite3", "*.wal", "*.shm",
        ];

        for pattern in defaults {
            builder.add_line(None, pattern).ok();
        }

        if let Some(excludes) = extra_excludes {
            for pattern in excludes {
                if let Err(e) = builder.add_line(None, pattern) {
                    tracing::warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e);
                }
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}

/// Collect configuration files under `root`, ordered by relative path.
///
/// Files are named by their path relative to `root` with `/` separators.
/// Unreadable files are logged and skipped; invalid UTF-8 is replaced so
/// the scanner can report the file itself.
pub fn collect_sources(root: &Path, config: &InfragraphConfig) -> Result<Vec<SourceFile>> {
    if !root.is_dir() {
        return Err(crate::Error::Config(format!("{} is not a directory", root.display())));
    }

    let filter = IgnoreFilter::new(root, Some(config.exclude()));
    let extensions = config.extensions();

    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .require_git(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut sources = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if is_dir || filter.is_ignored(path, false) || has_ignored_ancestor(&filter, root, path) {
            continue;
        }

        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)));
        if !matches_extension {
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                continue;
            }
        };
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        sources.push(SourceFile::new(name, String::from_utf8_lossy(&bytes).into_owned()));
    }

    sources.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!("Collected {} source files from {}", sources.len(), root.display());
    Ok(sources)
}

fn has_ignored_ancestor(filter: &IgnoreFilter, root: &Path, path: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .take_while(|dir| *dir != root && dir.starts_with(root))
        .any(|dir| filter.is_ignored(dir, true))
}
