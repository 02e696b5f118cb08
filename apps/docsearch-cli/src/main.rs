//! docsearch: index and search heading-structured text documents.
//!
//! ```bash
//! docsearch index docs/ --out .docsearch --mode hybrid --mode grep
//! docsearch search .docsearch "borrow checker" --mode hybrid -n 5
//! docsearch grep "TODO\(\w+\)" src/ -E -B 1 -A 1
//! ```

mod output;
mod progress;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use docsearch_core::config::{expand_path, Config, GrepConfig};
use docsearch_core::document::DocumentSource;
use docsearch_core::SearchMode;
use docsearch_service::SearchService;

use crate::progress::BarProgress;

const EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

#[derive(Parser)]
#[command(name = "docsearch", version, about)]
struct Cli {
    /// Directory holding docsearch.toml (default: current directory)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build indexes over files and directories and save them
    Index(IndexArgs),
    /// Query a saved index directory
    Search(SearchArgs),
    /// Pattern search over files without saving anything
    Grep(GrepArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Files or directories (walked for .md, .markdown and .txt)
    #[arg(required = true)]
    paths: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    out: String,

    /// Modes to build; repeatable. Defaults to the configured default mode
    #[arg(short, long)]
    mode: Vec<String>,
}

#[derive(Args)]
struct SearchArgs {
    /// Directory written by `docsearch index`
    dir: String,

    query: String,

    #[arg(short, long)]
    mode: Option<String>,

    #[arg(short = 'n', long)]
    top_k: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GrepArgs {
    pattern: String,

    #[arg(required = true)]
    paths: Vec<String>,

    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Treat the pattern as a regular expression
    #[arg(short = 'E', long)]
    regex: bool,

    #[arg(short = 'B', long, default_value_t = 0)]
    before: usize,

    #[arg(short = 'A', long, default_value_t = 0)]
    after: usize,

    /// Maximum displayed line width (0 = unlimited)
    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    no_line_numbers: bool,

    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_dir = cli.config_dir.as_deref().map_or_else(|| PathBuf::from("."), expand_path);
    let config = Config::load_from(&config_dir)
        .and_then(|c| c.search_config())
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;

    match cli.command {
        Command::Index(args) => {
            let sources = collect_sources(&args.paths)?;
            if sources.is_empty() {
                bail!("no .md, .markdown or .txt files found");
            }
            let modes = if args.mode.is_empty() {
                vec![config.default_mode]
            } else {
                args.mode
                    .iter()
                    .map(|m| m.parse::<SearchMode>())
                    .collect::<docsearch_core::Result<Vec<_>>>()?
            };
            let out = expand_path(&args.out);

            let mut service = SearchService::new(config);
            let bar = BarProgress::new(sources.len());
            service.build_with_progress(&sources, &modes, &bar).context("building indexes")?;
            bar.finish();
            service
                .save(&out)
                .with_context(|| format!("saving to {}", out.display()))?;
            println!(
                "Indexed {} documents into {} chunks at {}",
                sources.len(),
                service.chunks().len(),
                out.display()
            );
        }
        Command::Search(args) => {
            let dir = expand_path(&args.dir);
            let service = SearchService::load(&dir)
                .with_context(|| format!("loading index from {}", dir.display()))?;
            let mode = service.resolve_mode(args.mode.as_deref())?;
            let results = service.search(&args.query, Some(mode.as_str()), args.top_k)?;
            let rendered = if args.json {
                output::format_json(&args.query, mode.as_str(), &results)
            } else {
                output::format_human(&args.query, &results)
            };
            println!("{rendered}");
        }
        Command::Grep(args) => {
            let sources = collect_sources(&args.paths)?;
            let options = GrepConfig {
                regex: args.regex || config.grep.regex,
                case_insensitive: args.ignore_case || config.grep.case_insensitive,
                before: args.before,
                after: args.after,
                line_numbers: !args.no_line_numbers && config.grep.line_numbers,
                max_line_width: args.width.unwrap_or(config.grep.max_line_width),
                context_margin: config.grep.context_margin,
            };
            let mut service = SearchService::new(config);
            service.build(&sources, &[SearchMode::Grep])?;
            let results = service.grep(&args.pattern, &options)?;
            let rendered = if args.json {
                output::format_json(&args.pattern, SearchMode::Grep.as_str(), &results)
            } else {
                output::format_human(&args.pattern, &results)
            };
            println!("{rendered}");
        }
    }
    Ok(())
}

fn collect_sources(paths: &[String]) -> Result<Vec<DocumentSource>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for raw in paths {
        let path = expand_path(raw);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("walking {}", path.display()))?;
                if entry.file_type().is_file() && has_indexed_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    tracing::info!(files = files.len(), "collected sources");
    // ids must be unique per build; file stems are not
    Ok(files
        .into_iter()
        .map(|p| DocumentSource {
            id: Some(p.display().to_string()),
            ..DocumentSource::from_path(p)
        })
        .collect())
}

fn has_indexed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}
