//! CLI command handlers
//!
//! Each group of subcommands has its own module with handler functions.

pub mod config;
pub mod crawl;
pub mod parse;
pub mod search;
pub mod serve;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Elongated-coin machine locator
#[derive(Parser)]
#[command(name = "coin-atlas")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl the forum and update both databases
    Crawl(crawl::CrawlArgs),

    /// Fill in missing coordinates without crawling
    Backfill(crawl::BackfillArgs),

    /// Regenerate the clean database from the raw one
    Rebuild(crawl::RebuildArgs),

    /// Find the nearest machines
    Nearest(search::NearestArgs),

    /// Find all machines within a radius
    Radius(search::RadiusArgs),

    /// List every machine with coordinates
    All(search::AllArgs),

    /// Show every field of one machine
    Details(search::DetailsArgs),

    /// Run the coordinate parser on some text
    Parse(parse::ParseArgs),

    /// Set or clear a manual coordinate correction
    Correct(parse::CorrectArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Crawl(args) => crawl::crawl(args),
        Commands::Backfill(args) => crawl::backfill(args),
        Commands::Rebuild(args) => crawl::rebuild(args),
        Commands::Nearest(args) => search::nearest(args),
        Commands::Radius(args) => search::radius(args),
        Commands::All(args) => search::all(args),
        Commands::Details(args) => search::details(args),
        Commands::Parse(args) => parse::parse(args),
        Commands::Correct(args) => parse::correct(args),
        Commands::Serve(args) => serve::run(args),
        Commands::Config(args) => config::run(args),
    }
}
