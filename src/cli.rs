//! Command line interface.
//!
//! Without a subcommand the binary runs the MCP server on stdio. The other
//! subcommands work on one index file and print to stdout.

use crate::config::Config;
use crate::index::{Dialect, locate_index_file};
use crate::server::IndexServer;
use crate::state::{IndexState, LoadedIndex};
use crate::tools::{
    HTML_SUFFIX, LookupTermRequest, SearchRequest, handle_lookup_term, handle_search,
    load_index::format_response,
};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit status for an index that loads but fails validation.
const EXIT_INVALID: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "searchindex-mcp", version)]
#[command(about = "Query and check documentation search indexes", long_about = None)]
pub struct Cli {
    /// Config file (default: $SEARCHINDEX_MCP_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Validate an index and print a summary
    Check { path: PathBuf },
    /// Rewrite an index in canonical form
    Fmt {
        path: PathBuf,
        /// Report whether the file is already canonical instead of rewriting it
        #[arg(long)]
        check: bool,
        /// Output dialect (default: the dialect the file was written in)
        #[arg(long)]
        dialect: Option<Dialect>,
    },
    /// Ranked search
    Search {
        path: PathBuf,
        query: String,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show the postings of one term
    Lookup {
        path: PathBuf,
        term: String,
        /// Title matches only
        #[arg(long)]
        titles: bool,
    },
    /// List documented objects
    Objects {
        path: PathBuf,
        /// Only objects of this type, e.g. `rst:directive` or `cylc:setting`
        #[arg(long)]
        kind: Option<String>,
    },
}

impl Cli {
    pub const fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Check { path } => Ok(if check(&path)? {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(EXIT_INVALID)
        }),
        Commands::Fmt {
            path,
            check,
            dialect,
        } => Ok(if fmt(&path, check, dialect)? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
        Commands::Search { path, query, limit } => {
            let state = IndexState::default();
            let output = handle_search(
                &state,
                &config,
                SearchRequest {
                    query,
                    limit,
                    path: Some(path.display().to_string()),
                },
            )
            .await
            .map_err(anyhow::Error::msg)?;
            print!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lookup { path, term, titles } => {
            let state = IndexState::default();
            let output = handle_lookup_term(
                &state,
                &config,
                LookupTermRequest {
                    term,
                    titles_only: Some(titles),
                    path: Some(path.display().to_string()),
                },
            )
            .await
            .map_err(anyhow::Error::msg)?;
            print!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Objects { path, kind } => objects(&path, kind.as_deref()),
    }
}

async fn serve(config: Config) -> Result<ExitCode> {
    tracing::info!("Starting searchindex-mcp MCP server");

    let server = IndexServer::new(config);
    server.preload().await;

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;
    service.waiting().await?;

    Ok(ExitCode::SUCCESS)
}

fn read(path: &Path) -> Result<LoadedIndex> {
    let file = locate_index_file(path)?;
    LoadedIndex::read(&file).with_context(|| format!("Failed to load {}", file.display()))
}

/// Prints the load summary; `false` when validation found errors.
fn check(path: &Path) -> Result<bool> {
    let loaded = read(path)?;
    print!("{}", format_response(&loaded, None));
    Ok(loaded.report.is_valid())
}

/// Canonicalizes an index file; `false` when `check_only` found differences.
fn fmt(path: &Path, check_only: bool, dialect: Option<Dialect>) -> Result<bool> {
    let file = locate_index_file(path)?;
    let source = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let (index, detected) = crate::index::parse_index(&source)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    let dialect = dialect.unwrap_or(detected);
    let formatted = index.to_text(dialect);

    if formatted == source {
        tracing::debug!("{} is already canonical", file.display());
        return Ok(true);
    }
    if check_only {
        println!("{} would be rewritten ({} dialect)", file.display(), dialect);
        return Ok(false);
    }

    std::fs::write(&file, formatted)
        .with_context(|| format!("Failed to write {}", file.display()))?;
    println!("Rewrote {} ({} dialect)", file.display(), dialect);
    Ok(true)
}

fn objects(path: &Path, kind: Option<&str>) -> Result<ExitCode> {
    let loaded = read(path)?;
    let mut count = 0;
    for object in loaded.index.objects() {
        let objtype = object.objtype.unwrap_or("unknown");
        if kind.is_some_and(|k| k != objtype) {
            continue;
        }
        count += 1;
        println!(
            "{}\t{}\t{}",
            object.fullname,
            objtype,
            object.link(HTML_SUFFIX).unwrap_or_default()
        );
    }
    if count == 0 {
        eprintln!(
            "No objects{} in {}",
            kind.map(|k| format!(" of type {}", k)).unwrap_or_default(),
            loaded.path.display()
        );
    }
    Ok(ExitCode::SUCCESS)
}
