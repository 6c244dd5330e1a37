//! Job Fetcher CLI application
//!
//! Command-line interface for refreshing and browsing the cached BestJobs and
//! eJobs listings.

use std::process;

use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use job_fetcher::cli::{
    handle_export, handle_force, handle_refresh, handle_run, handle_show, handle_status, Cli,
    Commands,
};
use job_fetcher::config::AppConfig;
use job_fetcher::errors::{ConfigError, Result};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::resolve(cli.global.config.as_deref(), &cli.overrides()).await?;

    init_logging(&cli, &config)?;

    info!("Job Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let quiet = cli.global.quiet;
    match cli.command {
        Commands::Run(args) => handle_run(&config, args, quiet).await,
        Commands::Refresh(args) => handle_refresh(&config, args, quiet).await,
        Commands::Status => handle_status(&config).await,
        Commands::Show(args) => handle_show(&config, args).await,
        Commands::Export(args) => handle_export(&config, args).await,
        Commands::Force => handle_force(&config).await,
    }
}

/// Initialize logging from CLI verbosity, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) -> Result<()> {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());

    let directive: Directive = format!("job_fetcher={}", level)
        .parse()
        .map_err(|e: tracing_subscriber::filter::ParseError| ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            value: level.clone(),
            reason: e.to_string(),
        })?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
