use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greprepos::report::write_csv_file;
use greprepos::{AuditSettings, Collector, Config, GitHubClient};

/// Iterate over a namespace of GitHub repos and generate a CSV file of
/// information about each one.
#[derive(Parser)]
#[command(name = "greprepos")]
#[command(version)]
struct Cli {
    /// GitHub personal access token: https://github.com/settings/tokens
    apikey: String,

    /// Name of the GitHub organisation to be audited: https://docs.github.com/en/organizations
    org: String,

    /// Optional username of a bot that creates automated PRs for standards compliance within the organization
    #[arg(short, long)]
    bot_user: Option<String>,

    /// Name of the CSV file to be written out [default: github_repo_data.csv]
    #[arg(short, long)]
    csvfile: Option<String>,

    /// Logging level [default: INFO]
    #[arg(short, long, value_enum, ignore_case = true)]
    loglevel: Option<LogLevel>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Critical,
    Fatal,
    Error,
    Warn,
    Warning,
    Info,
    Debug,
    Notset,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Fatal | LogLevel::Error => "error",
            LogLevel::Warn | LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Notset => "trace",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    // Command line wins over the configuration file
    if let Some(bot_user) = cli.bot_user {
        config.audit.bot_user = Some(bot_user);
    }
    if let Some(csvfile) = cli.csvfile {
        config.output.csvfile = csvfile;
        config.expand_paths()?;
    }
    if let Some(level) = cli.loglevel {
        config.logging.level = level.directive().to_string();
    }

    init_logging(&config.logging.level)?;
    info!("Starting greprepos v{}", env!("CARGO_PKG_VERSION"));

    let client = GitHubClient::new(cli.apikey, &config)?;
    let collector = Collector::new(&client, AuditSettings::from_config(cli.org, &config));
    let summary = collector.collect().await?;

    write_csv_file(&summary.rows, &PathBuf::from(&config.output.csvfile))?;

    Ok(())
}

/// Initialize logging; `RUST_LOG` takes precedence over the configured level
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}
