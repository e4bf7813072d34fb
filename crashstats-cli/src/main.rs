mod args;
mod commands;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use crashstats::client::mask_token;
use crashstats::{Config, CrashStatsClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{FacetArgs, FetchDataArgs, ReprocessArgs, SupersearchArgs};

#[derive(Parser, Debug)]
#[command(name = "crashstats")]
#[command(about = "Crash Stats tools - Super Search queries, facets, crash data and reprocessing")]
#[command(version)]
struct Cli {
    /// Crash Stats host; overrides the config file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Log requests and other debugging output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch crash reports using Super Search
    Supersearch(SupersearchArgs),

    /// Fetch facet counts using Super Search
    Supersearchfacet(FacetArgs),

    /// Fetch raw crashes, dumps and processed crashes
    FetchData(FetchDataArgs),

    /// Send crash reports to be reprocessed
    Reprocess(ReprocessArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let (argv, search_args) = args::split_search_args(&Cli::command(), std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_logging(cli.verbose);

    let config = Config::load()
        .context("Failed to load configuration")?
        .with_host(cli.host);
    match &config.api_token {
        Some(token) => tracing::debug!("Using api token: {}", mask_token(token)),
        None => tracing::debug!("No api token provided. Set CRASHSTATS_API_TOKEN in the environment."),
    }
    let client = CrashStatsClient::new(&config).context("Failed to create HTTP client")?;
    tracing::debug!(host = %client.host(), "crash stats host");

    match cli.command {
        Commands::Supersearch(args) => {
            commands::run_supersearch(&client, args, &search_args).await?;
        }
        Commands::Supersearchfacet(args) => {
            commands::run_facet(&client, args, &search_args).await?;
        }
        Commands::FetchData(args) => {
            commands::run_fetch_data(&client, args).await?;
        }
        Commands::Reprocess(args) => {
            commands::run_reprocess(&client, args).await?;
        }
    }

    Ok(())
}
