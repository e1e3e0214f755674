//! Line-oriented console: one subcommand per stdin line, autosave in the
//! background, a final flush on EOF or a termination signal.

use crate::commands::{self, Command};
use anyhow::{Context, Result};
use clap::Parser;
use claimguard_core::config::Config;
use claimguard_core::core_region::{AutoSave, ProtectionContext, Timestamp};
use claimguard_core::messages::MessageCatalog;
use claimguard_core::shutdown::{install_signal_handlers, ShutdownCoordinator};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "claimguard", no_binary_name = true, disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: Command,
}

fn handle_line(ctx: &ProtectionContext, catalog: &MessageCatalog, config: &Config, line: &str) {
    let parsed = match ConsoleLine::try_parse_from(line.split_whitespace()) {
        Ok(parsed) => parsed,
        Err(e) => {
            // Covers --help as well as usage errors.
            let _ = e.print();
            return;
        }
    };

    if matches!(parsed.command, Command::Console | Command::Init { .. }) {
        eprintln!("That command is not available in the console.");
        return;
    }

    if let Err(e) = ctx.expire_invitations(Timestamp::now()) {
        warn!("Failed to expire invitations: {}", e);
    }

    match commands::execute(ctx, catalog, config, parsed.command) {
        Ok(output) => output.print(),
        Err(e) => error!("Command failed: {:#}", e),
    }
}

pub async fn run(ctx: Arc<ProtectionContext>, catalog: MessageCatalog, config: &Config) -> Result<()> {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    install_signal_handlers(coordinator.clone());

    let autosave = config.autosave.enabled.then(|| {
        AutoSave::spawn(
            ctx.manager().clone(),
            config.autosave.interval,
            coordinator.subscribe(),
        )
    });
    let mut shutdown = coordinator.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!(
        autosave = config.autosave.enabled,
        interval = ?config.autosave.interval,
        "Console ready"
    );

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                let line = line.trim();
                match line {
                    "" => continue,
                    "quit" | "exit" => break,
                    _ => handle_line(&ctx, &catalog, config, line),
                }
            }
            _ = shutdown.recv() => {
                info!("Console interrupted");
                break;
            }
        }
    }

    coordinator.shutdown().await;

    match autosave {
        Some(handle) => {
            let stats = handle.await.context("autosave task panicked")?;
            if stats.failures > 0 {
                warn!(failures = stats.failures, "Autosave reported failed saves");
            }
        }
        None => {
            let report = ctx.manager().flush_dirty()?;
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "Regions left unsaved");
            }
        }
    }

    if ctx.manager().dirty_count() > 0 {
        warn!(dirty = ctx.manager().dirty_count(), "Exiting with unsaved changes");
    }

    coordinator.complete().await;
    Ok(())
}
