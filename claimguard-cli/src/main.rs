use anyhow::{bail, Context, Result};
use clap::Parser;
use claimguard_core::config::Config;
use claimguard_core::core_region::{ProtectionContext, RegionManager, RegionSqlStore, RegionStore};
use claimguard_core::logging::{init_logging_with_config, LogLevel};
use claimguard_core::messages::MessageCatalog;
use claimguard_core::metrics::init_metrics;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod commands;
mod console;

use commands::{Command, Output};

#[derive(Parser, Debug)]
#[command(name = "claimguard")]
#[command(author, version, about = "Manage land claims stored in a claimguard database", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides storage.database_path
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    /// Raise the log level one step per occurrence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;

    if let Some(database) = &args.database {
        config.storage.database_path = PathBuf::from(shellexpand::tilde(database).into_owned());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

fn open_context(config: &Config) -> Result<ProtectionContext> {
    let path = &config.storage.database_path;
    let store: Arc<dyn RegionStore> = Arc::new(
        RegionSqlStore::open(path, config.storage.pool_size)
            .with_context(|| format!("opening database {}", path.display()))?,
    );

    let manager = RegionManager::load(store, config.protection.manager_settings())
        .context("loading regions")?;

    Ok(ProtectionContext::new(
        Arc::new(manager),
        config.protection.limits.clone(),
        config.invitations.ttl,
    ))
}

fn load_catalog(config: &Config) -> Result<MessageCatalog> {
    match &config.messages.file {
        Some(path) => MessageCatalog::from_file(path)
            .with_context(|| format!("loading messages from {}", path.display())),
        None => Ok(MessageCatalog::english()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let mut log_config = config.logging.log_config()?.stderr(true);
    // Quiet unless asked: stdout carries command results.
    if args.log_level.is_none() && std::env::var("CLAIMGUARD_LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Warn;
    }
    log_config.level = log_config.level.raised_by(args.verbose);
    init_logging_with_config(log_config)?;
    init_metrics();

    let catalog = load_catalog(&config)?;
    let context = open_context(&config)?;
    info!(database = %config.storage.database_path.display(), "Database opened");

    if let Command::Console = args.command {
        console::run(Arc::new(context), catalog, &config).await?;
        // A pending stdin read would otherwise keep the runtime alive.
        std::process::exit(0);
    }

    let output = commands::execute(&context, &catalog, &config, args.command)?;

    let report = context.manager().flush_dirty()?;
    if !report.failed.is_empty() {
        bail!("{} region(s) could not be saved", report.failed.len());
    }
    debug!(saved = report.saved, "Flushed changes");

    output.print();
    if let Output::Refused(_) = output {
        std::process::exit(1);
    }
    Ok(())
}
