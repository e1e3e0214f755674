//! Walk through a claim's lifecycle against an in-memory SQLite store
//!
//! Run with:
//! ```bash
//! cargo run --example claim_demo
//! ```

use claimguard_core::core_region::{
    BlockAction, ClaimLimits, ClaimOutcome, ManagerSettings, PlayerId, ProtectionContext,
    RegionManager, RegionSqlStore, WorldCoordinate, WorldId,
};
use claimguard_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use claimguard_core::messages::{MessageCatalog, MessageKey};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_with_config(LogConfig::new(LogLevel::Debug).with_target(true))?;

    let store = Arc::new(RegionSqlStore::memory()?);
    let manager = RegionManager::load(store, ManagerSettings::default())?;
    let ctx = ProtectionContext::new(Arc::new(manager), ClaimLimits::default(), None);
    let catalog = MessageCatalog::english();

    let alice = PlayerId::new("alice");
    let bob = PlayerId::new("bob");
    let anchor = WorldCoordinate::new(WorldId::new("overworld"), 100, 64, 100);

    let region = match ctx.claim(&alice, anchor.clone(), &["vip"])? {
        ClaimOutcome::Created(region) => region,
        ClaimOutcome::Refused(response) => {
            println!("{}", catalog.respond(&response, MessageKey::ClaimCreated, &[]));
            return Ok(());
        }
    };
    let id = region.read().map_err(|_| "poisoned")?.id;

    let response = ctx.rename(&alice, &id, "homestead")?;
    println!("{}", catalog.respond(&response, MessageKey::Renamed, &[("name", "homestead")]));

    let target = anchor.offset(3, 0, -2);
    info!(decision = ?ctx.check_block_action(&bob, &target, BlockAction::Place, false), "Before invite");

    ctx.invite(&alice, &id, &bob)?;
    ctx.accept(&bob, None)?;
    info!(decision = ?ctx.check_block_action(&bob, &target, BlockAction::Place, false), "After invite");

    // Only the owner may touch the claim block.
    info!(decision = ?ctx.check_block_action(&bob, &anchor, BlockAction::Break, false), "Anchor block");

    let report = ctx.manager().flush_dirty()?;
    info!(saved = report.saved, "Flushed");

    if let Some(info) = ctx.info(&id) {
        println!("{}", catalog.render(MessageKey::InfoHeader, &[("name", &info.name), ("id", &id.to_string())]));
        println!("{}", catalog.render(MessageKey::InfoOwner, &[("owner", info.owner.as_str())]));
    }

    Ok(())
}
