//! claimguard-core: land-claim protection for block worlds
//!
//! A host (game server plugin, proxy, admin tool) builds a
//! [`ProtectionContext`] over a [`RegionManager`] and calls into it from its
//! block events and chat commands. Claims persist through a [`RegionStore`],
//! SQLite by default.

pub mod config;
pub mod core_region;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod shutdown;

pub use config::{Config, ConfigError};
pub use core_region::{
    AccessDecision, ActionResponse, AutoSave, BlockAction, ClaimOutcome, FailureReason, PlayerId,
    ProtectionContext, Region, RegionError, RegionId, RegionManager, RegionSqlStore, RegionStore,
    Volume, WorldCoordinate, WorldId,
};
pub use logging::{init_logging, LogLevel};
pub use messages::{MessageCatalog, MessageKey};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
