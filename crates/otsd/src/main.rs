//! otsd: one-time secret daemon
//!
//! Usage:
//!   otsd [--config /etc/ots/config.toml] [serve]
//!   otsd gen-key
//!
//! Commands:
//!   serve    - HTTP API + metrics endpoint [default]
//!   gen-key  - print a fresh default key for `crypto.default_key`

mod daemon;
mod http;
mod metrics;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use ots_core::config::OtsConfig;

#[derive(Parser, Debug)]
#[command(name = "otsd", version, about = "One-time secret daemon")]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "OTS_CONFIG",
        default_value = "/etc/ots/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "OTS_LOG", default_value = "info")]
    log: String,

    /// Log format (json, text)
    #[arg(long, env = "OTS_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Generate a random default key and print it
    GenKey,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.command == Some(Command::GenKey) {
        println!("{}", ots_crypto::CipherKey::generate().to_base64());
        return Ok(());
    }

    init_logging(&cli.log, &cli.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "otsd starting"
    );

    let mut config = load_config(&cli.config).await?;
    config.apply_env_overrides();

    daemon::run(config).await
}

async fn load_config(path: &PathBuf) -> Result<OtsConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))
    } else {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            path.display()
        );
        Ok(OtsConfig::default())
    }
}

/// OpenDAL's logging layer writes object paths, and with them secret keys.
/// Muted unless the filter names opendal explicitly.
const OPENDAL_LOG_DIRECTIVE: &str = "opendal::services=off";

fn log_filter(directives: &str) -> tracing_subscriber::EnvFilter {
    let filter = tracing_subscriber::EnvFilter::new(directives);
    if directives.contains("opendal") {
        return filter;
    }
    match OPENDAL_LOG_DIRECTIVE.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| level.to_string());
    let filter = log_filter(&directives);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
