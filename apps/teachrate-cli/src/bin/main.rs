use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use teachrate_core::config::{Config, Settings};
use teachrate_core::types::EntityLabel;
use teachrate_index::IndexSearcher;
use teachrate_pipeline::Pipeline;
use teachrate_shard::schema::SEARCH_INDEX_FILE;

#[derive(Debug, Parser)]
#[command(name = "teachrate")]
#[command(about = "Build static teacher-evaluation data from CSV exports")]
struct Cli {
    /// TOML file merged above teachrate.toml and below TEACHRATE_* variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full build and publish the output directory
    Build {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Disable the shard progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Query a published search index
    Search {
        query: String,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print hits as JSON labels
        #[arg(long)]
        json: bool,
    },
    /// Print the effective settings as JSON
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

fn build(mut settings: Settings, input: Option<PathBuf>, output: Option<PathBuf>, no_progress: bool) -> ExitCode {
    if let Some(input) = input {
        settings.input.dir = path_string(input);
    }
    if let Some(output) = output {
        settings.output.dir = path_string(output);
    }
    if no_progress {
        settings.output.progress = false;
    }
    debug!(input = %settings.input.dir, output = %settings.output.dir, "starting build");

    let mut pipeline = Pipeline::from_settings(settings);
    match pipeline.run() {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.summary);
            eprintln!("error [{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

fn search(settings: &Settings, query: &str, output: Option<PathBuf>, limit: usize, json: bool) -> Result<ExitCode> {
    let dir = output.unwrap_or_else(|| settings.output.dir_path());
    let mut searcher = IndexSearcher::open(&dir.join(SEARCH_INDEX_FILE))?;
    let hits = searcher.search(query, limit);

    if json {
        let labels: Vec<&EntityLabel> = hits.iter().map(|h| &h.label).collect();
        println!("{}", serde_json::to_string_pretty(&labels)?);
        return Ok(ExitCode::SUCCESS);
    }
    if hits.is_empty() {
        println!("no matches for \"{query}\"");
        return Ok(ExitCode::SUCCESS);
    }
    for (i, hit) in hits.iter().enumerate() {
        let college = hit.label.college.as_deref().map(|c| format!("  ({c})")).unwrap_or_default();
        let marker = if hit.exact { "*" } else { " " };
        println!("{:>3}.{marker} {:<7} {}{college}  id={}", i + 1, hit.entity.kind, hit.label.name, hit.entity.id);
    }
    Ok(ExitCode::SUCCESS)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load_with(cli.config.as_deref())?;
    let settings = config.settings()?;

    match cli.command {
        Commands::Build { input, output, no_progress } => Ok(build(settings, input, output, no_progress)),
        Commands::Search { query, output, limit, json } => search(&settings, &query, output, limit, json),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
