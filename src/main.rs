//! Sitewave CLI
//!
//! Ramps synthetic visitor traffic against a multi-page site: each iteration
//! launches a wave of isolated browser sessions against the remote automation
//! endpoint, staggered inside the iteration's start window, each following
//! the site's page chain with randomized dwell times.

use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use sitewave::browser::{RemoteSessionFactory, SessionFactory};
use sitewave::scheduler::GrowthStrategy;
use sitewave::stats::RunStats;
use sitewave::visitor::PageMarkers;
use sitewave::{init_logging, traffic, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "sitewave")]
#[command(about = "Ramped synthetic visitor traffic against a multi-page site", long_about = None)]
struct Args {
    /// Remote browser automation endpoint (DevTools websocket URL)
    #[arg(long, env = "SITEWAVE_ENDPOINT")]
    endpoint: String,

    /// URL every visitor session should visit
    #[arg(long, env = "SITEWAVE_VISIT")]
    visit: String,

    /// Number of sessions to create in the initial iteration
    #[arg(long, default_value = "1")]
    initial: u64,

    /// Number of ramp iterations
    #[arg(long, default_value = "1")]
    iterations: u32,

    /// Spacing (in seconds) between successive iterations' start windows
    #[arg(long, default_value = "0")]
    spacing: u64,

    /// Maximum amount of time (in seconds) a session can wait to start
    #[arg(long, default_value = "0")]
    max_wait: u64,

    /// Strategy for traffic increase: additive, exponential or slow
    #[arg(long, default_value = "additive")]
    strategy: String,

    /// Minimum amount of time (in seconds) to stay on a loaded page
    #[arg(long, default_value = "0")]
    min_linger: u64,

    /// Maximum amount of time (in seconds) to stay on a loaded page
    #[arg(long, default_value = "0")]
    max_linger: u64,

    /// Element id marking a page as fully loaded
    #[arg(long, default_value = "page-complete")]
    ready_marker: String,

    /// Element id of the link to the following page
    #[arg(long, default_value = "next")]
    next_link: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_logging();
    let args = Args::parse();

    // Unknown strategies and malformed values are fatal here, before any
    // session is launched.
    let strategy = GrowthStrategy::from_str(&args.strategy)?;

    let config = RunConfig {
        endpoint: args.endpoint,
        visit_url: args.visit,
        initial_sessions: args.initial,
        iterations: args.iterations,
        spacing_secs: args.spacing,
        max_wait_secs: args.max_wait,
        strategy,
        min_linger_secs: args.min_linger,
        max_linger_secs: args.max_linger,
        markers: PageMarkers {
            ready_marker: args.ready_marker,
            next_link: args.next_link,
        },
    };
    config.validate()?;

    info!("Starting sitewave");
    info!("Effective config: {}", serde_json::to_string(&config)?);

    let factory: Arc<dyn SessionFactory> =
        Arc::new(RemoteSessionFactory::new(config.endpoint.clone()));
    let stats = Arc::new(RunStats::new());

    traffic::generate(&config, factory, stats).await?;

    Ok(())
}
