use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::annotator::DEFAULT_DEPENDENCY_LIMIT;
use crate::context::formatter::{DEFAULT_MAX_CHARS, DEFAULT_PRIMARY_FILE};

pub const DEFAULT_EXTENSIONS: &[&str] = &["tf"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InfragraphConfig {
    pub database: Option<String>,
    pub path: Option<String>,
    pub max_document_chars: Option<usize>,
    pub primary_file: Option<String>,
    pub overview_dependency_limit: Option<usize>,
    pub strict_implicit: Option<bool>,
    pub extensions: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

impl InfragraphConfig {
    pub fn max_document_chars(&self) -> usize {
        self.max_document_chars.unwrap_or(DEFAULT_MAX_CHARS)
    }

    pub fn primary_file(&self) -> &str {
        self.primary_file.as_deref().unwrap_or(DEFAULT_PRIMARY_FILE)
    }

    pub fn overview_dependency_limit(&self) -> usize {
        self.overview_dependency_limit.unwrap_or(DEFAULT_DEPENDENCY_LIMIT)
    }

    pub fn strict_implicit(&self) -> bool {
        self.strict_implicit.unwrap_or(false)
    }

    pub fn extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(exts) if !exts.is_empty() => exts
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            _ => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn exclude(&self) -> &[String] {
        self.exclude.as_deref().unwrap_or(&[])
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("infragraph.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".infragraph").join("graph.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<InfragraphConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: InfragraphConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &InfragraphConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".infragraph/";

    let mut content = String::new();
    if gitignore_path.exists() {
        content = std::fs::read_to_string(&gitignore_path)?;
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InfragraphConfig::default();
        assert_eq!(config.max_document_chars(), 100_000);
        assert_eq!(config.primary_file(), "main.tf");
        assert_eq!(config.overview_dependency_limit(), 50);
        assert!(!config.strict_implicit());
        assert_eq!(config.extensions(), vec!["tf"]);
        assert!(config.exclude().is_empty());
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infragraph.toml");
        let config = InfragraphConfig {
            database: Some("graph.db".to_string()),
            strict_implicit: Some(true),
            extensions: Some(vec![".TF".to_string(), "hcl".to_string()]),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("graph.db"));
        assert!(loaded.strict_implicit());
        assert_eq!(loaded.extensions(), vec!["tf", "hcl"]);

        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_ensure_gitignore_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/").unwrap();

        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n.infragraph/\n");
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = default_database_path_in(dir.path());
        ensure_db_dir(&db).unwrap();
        assert!(dir.path().join(".infragraph").is_dir());
    }
}
