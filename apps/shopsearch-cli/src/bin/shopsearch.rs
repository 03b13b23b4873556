use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use shopsearch_cli::render;
use shopsearch_core::config::Config;
use shopsearch_core::Strategy;
use shopsearch_elastic::ElasticBackend;
use shopsearch_embed::get_default_embedder;
use shopsearch_hybrid::{ComparisonHarness, SearchService};

/// Product search over an Elasticsearch catalogue index.
#[derive(Debug, Parser)]
#[command(name = "shopsearch", version)]
struct Cli {
    /// Config environment (`config.<env>.toml`); defaults to RUST_ENV or dev
    #[arg(long, global = true, value_name = "ENV")]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one strategy
    Search(SearchArgs),

    /// Run every strategy side by side
    Compare(CompareArgs),
}

#[derive(Debug, Args)]
struct SearchArgs {
    #[arg(value_name = "QUERY")]
    query: String,

    /// Number of results (defaults to search.default_k)
    #[arg(short, long)]
    k: Option<usize>,

    /// lexical | vector | hybrid | full
    #[arg(short, long, default_value = "full")]
    strategy: Strategy,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CompareArgs {
    #[arg(value_name = "QUERY")]
    query: String,

    #[arg(short, long)]
    k: Option<usize>,

    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn build_service(env: Option<&str>) -> Result<SearchService> {
    let config = match env {
        Some(name) => Config::load_for_env(name),
        None => Config::load(),
    }
    .context("loading configuration")?;
    let settings = config.settings()?;
    let embedder = get_default_embedder(&settings.embedding).context("loading embedding model")?;
    let backend = ElasticBackend::new(&settings.backend)?;
    info!(backend = backend.base_url(), index = %settings.search.index, model = embedder.model_id(), "search service ready");
    Ok(SearchService::new(settings, embedder, Arc::new(backend))?)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let service = build_service(cli.env.as_deref())?;
    match cli.command {
        Command::Search(args) => {
            let query = service.query(&args.query, args.k, args.strategy)?;
            let set = service.execute(&query).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else {
                print!("{}", render::result_set(query.text(), &set));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Compare(args) => {
            let k = args.k.unwrap_or(service.settings().search.default_k);
            let report = ComparisonHarness::new(service).compare_all(&args.query, k).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::report(&report));
            }
            Ok(if report.is_complete() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    run(Cli::parse()).await
}
