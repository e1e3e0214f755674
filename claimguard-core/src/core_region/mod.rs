//! Claim protection core
//!
//! Players claim a cube of blocks around an anchor block. Each claim has an
//! owner, officers, members and pending invitations; block events inside a
//! claim are allowed only for its staff.
//!
//! Layout:
//! - `types`, `coords`: identities, world coordinates and claim volumes
//! - `staff`, `region`: one claim and its role registry
//! - `manager`: the registry of all claims and its lookup indices
//! - `invitation`: invitation tracking with expiry
//! - `context`: the entry point a host integration calls into
//! - `storage`: persistence contract, SQLite and in-memory stores
//! - `autosave`: background flushing of changed claims

pub mod autosave;
pub mod context;
pub mod coords;
pub mod invitation;
pub mod manager;
pub mod region;
pub mod response;
pub mod staff;
pub mod storage;
pub mod types;

pub use autosave::{AutoSave, AutoSaveStats};
pub use context::{AccessDecision, BlockAction, ProtectionContext};
pub use coords::{Volume, WorldCoordinate};
pub use invitation::{Invitation, InvitationManager};
pub use manager::{
    ClaimLimits, ClaimOutcome, FlushReport, ManagerSettings, OverlapPolicy, RegionError,
    RegionManager, RegionResult, SharedRegion,
};
pub use region::{validate_name, Region, RegionInfo, MAX_NAME_LEN};
pub use response::{ActionResponse, FailureReason};
pub use staff::{StaffRegistry, StaffRole};
pub use storage::{MemoryRegionStore, RegionSqlStore, RegionStore, StorageError, StorageResult};
pub use types::{PlayerId, RegionId, Timestamp, WorldId};
