use crate::{emit_success, OutputMode};
use infragraph::analyzer::{CommandAnalyzer, JsonFileAnalyzer, SemanticAnalyzer};
use infragraph::config::{self, InfragraphConfig};
use infragraph::ignore::collect_sources;
use infragraph::storage::{GraphStore, SqliteStore};
use infragraph::ui::{self, Icons, Spinner};
use infragraph::{ImportPipeline, MaterializeMode, PipelineOptions, SourceFile};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Where the analyzer response comes from
pub enum AnalyzerChoice {
    File(PathBuf),
    Command(String),
}

impl AnalyzerChoice {
    pub fn from_args(analysis: Option<PathBuf>, command: Option<String>) -> anyhow::Result<Self> {
        match (analysis, command) {
            (Some(path), None) => Ok(Self::File(path)),
            (None, Some(command)) => Ok(Self::Command(command)),
            _ => anyhow::bail!("pass exactly one of --analysis or --command"),
        }
    }

    fn build(&self) -> anyhow::Result<Box<dyn SemanticAnalyzer>> {
        let analyzer: Box<dyn SemanticAnalyzer> = match self {
            Self::File(path) => Box::new(JsonFileAnalyzer::new(path)),
            Self::Command(command) => Box::new(CommandAnalyzer::from_command_line(command)?),
        };
        Ok(analyzer)
    }
}

fn source_root(config: &InfragraphConfig, path: Option<PathBuf>) -> PathBuf {
    path.or_else(|| config.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn database_path(config: &InfragraphConfig, database: Option<PathBuf>) -> PathBuf {
    database
        .or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
}

fn load_sources(announce: bool, config: &InfragraphConfig, root: &Path) -> anyhow::Result<Vec<SourceFile>> {
    let files = collect_sources(root, config)?;
    if files.is_empty() {
        anyhow::bail!(
            "no files with extensions [{}] under {}",
            config.extensions().join(", "),
            root.display()
        );
    }
    if announce {
        ui::status(Icons::FILE, "Files", &files.len().to_string());
    }
    Ok(files)
}

pub fn run_init(output_mode: OutputMode, config_path: Option<&Path>, path: &Path, force: bool) -> anyhow::Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path);
    let db_path = config::default_database_path_in(Path::new("."));

    let config = InfragraphConfig {
        database: Some(db_path.to_string_lossy().into_owned()),
        path: Some(path.to_string_lossy().into_owned()),
        ..Default::default()
    };
    config::write_config(&config_path, &config, force)?;
    config::ensure_db_dir(&db_path)?;
    config::ensure_gitignore(Path::new("."))?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", config_path.display()));
        ui::status(Icons::DATABASE, "Database", &db_path.display().to_string());
    } else {
        emit_success(
            output_mode,
            "init",
            serde_json::json!({
                "config": config_path,
                "database": db_path,
            }),
        )?;
    }
    Ok(())
}

pub fn run_context(
    output_mode: OutputMode,
    config: &InfragraphConfig,
    path: Option<PathBuf>,
    output: Option<PathBuf>,
    max_chars: Option<usize>,
) -> anyhow::Result<()> {
    let root = source_root(config, path);
    let mut options = PipelineOptions::from(config);
    if let Some(max_chars) = max_chars {
        options.max_document_chars = max_chars;
    }

    // Without --output the document itself is the human output
    let chatty = output_mode.is_human() && output.is_some();
    if chatty {
        ui::header(&format!("Building context for {}", root.display()));
    }
    let files = load_sources(chatty, config, &root)?;
    let built = ImportPipeline::new(options).build_context(&files)?;

    match (&output, output_mode) {
        (Some(out), _) => std::fs::write(out, &built.document.text)?,
        (None, OutputMode::Human) => print!("{}", built.document.text),
        (None, OutputMode::Json) => {}
    }

    if chatty {
        let s = &built.summary;
        ui::summary_row("Resources", &s.resources.to_string());
        ui::summary_row("Dependencies", &s.dependencies.to_string());
        ui::summary_row("Groups", &s.groups.to_string());
        ui::summary_row("Syntax errors", &s.syntax_errors.to_string());
        ui::summary_row("Document", &format!("{} chars", s.document_chars));
        if s.truncated {
            ui::warn("Document was truncated; raise max_document_chars to keep every file");
        }
        if let Some(out) = &output {
            ui::success(&format!("Wrote {}", out.display()));
        }
    } else if output_mode == OutputMode::Json {
        let mut data = serde_json::json!({ "summary": built.summary });
        if output.is_none() {
            data["document"] = serde_json::Value::String(built.document.text.clone());
        }
        emit_success(output_mode, "context", data)?;
    }
    Ok(())
}

pub fn run_import(
    output_mode: OutputMode,
    config: &InfragraphConfig,
    path: Option<PathBuf>,
    database: Option<PathBuf>,
    analyzer: AnalyzerChoice,
    merge: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let root = source_root(config, path);
    let db_path = database_path(config, database);
    let mode = if merge { MaterializeMode::Merge } else { MaterializeMode::Replace };

    if output_mode.is_human() {
        ui::header(&format!("Importing {} ({})", root.display(), mode));
        ui::status(Icons::DATABASE, "Database", &db_path.display().to_string());
    }

    let files = load_sources(output_mode.is_human(), config, &root)?;
    config::ensure_db_dir(&db_path)?;
    let store = SqliteStore::open(&db_path)?;
    let analyzer = analyzer.build()?;

    if output_mode.is_human() {
        ui::phase("Analyze");
    }
    let spinner = Spinner::new(&format!("{} Waiting for analyzer {}", Icons::BRAIN, analyzer.name()));
    let result = ImportPipeline::new(PipelineOptions::from(config)).run_import(
        &files,
        analyzer.as_ref(),
        &store,
        mode,
    );
    spinner.finish_and_clear();
    let report = result?;

    if output_mode.is_human() {
        ui::section("Import");
        println!("{}", report);
        let skipped = report.validation.resources_malformed
            + report.validation.relationships_malformed
            + report.materialize.edges_unresolved;
        let failed = report.materialize.nodes_failed + report.materialize.edges_failed;
        if skipped + failed > 0 {
            ui::warn(&format!("{} entries skipped, {} writes failed (run with --verbose for details)", skipped, failed));
        }
        ui::timing(&format!("{:.2?}", start.elapsed()));
        ui::success("Import complete");
    } else {
        emit_success(output_mode, "import", serde_json::to_value(&report)?)?;
    }
    Ok(())
}

pub fn run_stats(
    output_mode: OutputMode,
    config: &InfragraphConfig,
    database: Option<PathBuf>,
    node: Option<String>,
) -> anyhow::Result<()> {
    let db_path = database_path(config, database);
    if !db_path.exists() {
        anyhow::bail!("no graph database at {} (run `infragraph import` first)", db_path.display());
    }
    let store = SqliteStore::open(&db_path)?;
    let stats = store.stats()?;

    let node_view = match &node {
        Some(id) => {
            let Some(found) = store.find_node_by_id(id)? else {
                anyhow::bail!("no node with id {}", id);
            };
            Some((found, store.edges_from(id)?, store.edges_to(id)?))
        }
        None => None,
    };

    if output_mode.is_human() {
        ui::header(&format!("{} Graph statistics ({})", Icons::STATS, db_path.display()));
        println!("{}", ui::stats_table(&stats));
        if let Some((found, outgoing, incoming)) = &node_view {
            ui::section(&format!("{} ({})", found.id, found.node_type));
            ui::summary_row("Provider", &found.provider);
            ui::summary_row("Category", found.category.as_str());
            for edge in outgoing {
                ui::relationship(&edge.source_id, &edge.edge_type, &edge.target_id, edge.confidence);
            }
            for edge in incoming {
                ui::relationship(&edge.source_id, &edge.edge_type, &edge.target_id, edge.confidence);
            }
            if outgoing.is_empty() && incoming.is_empty() {
                ui::status(Icons::LINK, "Edges", "none");
            }
        }
    } else {
        let mut data = serde_json::json!({ "stats": stats });
        if let Some((found, outgoing, incoming)) = node_view {
            data["node"] = serde_json::json!({
                "node": found,
                "outgoing": outgoing,
                "incoming": incoming,
            });
        }
        emit_success(output_mode, "stats", data)?;
    }
    Ok(())
}
