//! Infragraph CLI - Infrastructure configuration graph builder

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "infragraph")]
#[command(version)]
#[command(about = "Build a typed resource graph from infrastructure-as-code configuration")]
#[command(long_about = r#"
Infragraph scans configuration files, resolves cross-resource references,
and builds a context document for a semantic analyzer. The analyzer's
resources and relationships are written to a SQLite graph.

Example usage:
  infragraph init --path ./infra
  infragraph context --path ./infra --output context.md
  infragraph import --path ./infra --analysis analysis.json
  infragraph import --path ./infra --command "python3 analyze.py" --merge
  infragraph stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and prepare the database directory
    Init {
        /// Directory containing the configuration files
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Build the analyzer context document
    Context {
        /// Directory containing the configuration files
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum document length
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Build the context, run the analyzer, and write the graph
    Import {
        /// Directory containing the configuration files
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Use a saved analyzer response
        #[arg(short, long, conflicts_with = "command")]
        analysis: Option<PathBuf>,

        /// Analyzer command, run through the shell; receives the document on stdin, prints JSON
        #[arg(long, required_unless_present = "analysis")]
        command: Option<String>,

        /// Upsert into the existing graph instead of replacing it
        #[arg(short, long)]
        merge: bool,
    },

    /// Show statistics about the stored graph
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Also list the edges of this node id
        #[arg(short, long)]
        node: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human && !infragraph::output::is_quiet()
    }
}

/// Print the JSON success envelope for a command
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config = infragraph::config::load_config(cli.config.as_deref())?.unwrap_or_default();

    let result = match cli.command {
        Commands::Init { path, force } => {
            commands::run_init(output_mode, cli.config.as_deref(), &path, force)
        }
        Commands::Context { path, output, max_chars } => {
            commands::run_context(output_mode, &config, path, output, max_chars)
        }
        Commands::Import {
            path,
            database,
            analysis,
            command,
            merge,
        } => {
            let analyzer = commands::AnalyzerChoice::from_args(analysis, command)?;
            commands::run_import(output_mode, &config, path, database, analyzer, merge)
        }
        Commands::Stats { database, node } => commands::run_stats(output_mode, &config, database, node),
    };

    if let Err(e) = &result {
        if output_mode.is_human() {
            infragraph::ui::error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
    result
}
