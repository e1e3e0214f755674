//! Region data structures and operations

use super::coords::{Volume, WorldCoordinate};
use super::response::{ActionResponse, FailureReason};
use super::staff::StaffRegistry;
use super::types::{PlayerId, RegionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Longest accepted region name, in characters
pub const MAX_NAME_LEN: usize = 36;

/// A named, owned claim over one cubic volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Unique identifier
    pub id: RegionId,

    /// Unique human-readable name
    pub name: String,

    /// Claimed blocks, centred on the anchor
    pub volume: Volume,

    /// Role assignment and pending invitations
    pub staff: StaffRegistry,

    /// When the claim was placed
    pub created_at: Timestamp,
}

impl Region {
    /// Create a new Region owned by `owner`; the name defaults to the id
    pub fn new(id: RegionId, owner: PlayerId, volume: Volume, created_at: Timestamp) -> Self {
        Region {
            id,
            name: id.to_string(),
            volume,
            staff: StaffRegistry::new(owner),
            created_at,
        }
    }

    pub fn owner(&self) -> &PlayerId {
        self.staff.owner()
    }

    /// The claim block itself
    pub fn anchor(&self) -> &WorldCoordinate {
        &self.volume.center
    }

    pub fn is_anchor(&self, coordinate: &WorldCoordinate) -> bool {
        &self.volume.center == coordinate
    }

    pub fn contains(&self, coordinate: &WorldCoordinate) -> bool {
        self.volume.contains(coordinate)
    }

    pub fn info(&self) -> RegionInfo {
        let mut officers: Vec<PlayerId> = self.staff.officers().iter().cloned().collect();
        let mut members: Vec<PlayerId> = self.staff.members().iter().cloned().collect();
        let mut pending: Vec<PlayerId> = self.staff.pending().cloned().collect();
        officers.sort();
        members.sort();
        pending.sort();

        RegionInfo {
            id: self.id,
            name: self.name.clone(),
            owner: self.owner().clone(),
            officers,
            members,
            pending,
            volume: self.volume.clone(),
            created_at: self.created_at,
        }
    }
}

/// Check a candidate name against the length rule
pub fn validate_name(name: &str) -> ActionResponse {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return ActionResponse::failed(FailureReason::Length);
    }
    ActionResponse::Successful
}

/// Read-only summary for the host's info command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: RegionId,
    pub name: String,
    pub owner: PlayerId,
    pub officers: Vec<PlayerId>,
    pub members: Vec<PlayerId>,
    pub pending: Vec<PlayerId>,
    pub volume: Volume,
    pub created_at: Timestamp,
}
