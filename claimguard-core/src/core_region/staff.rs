//! Per-claim role assignment and invitation state

use super::response::{ActionResponse, FailureReason};
use super::types::{PlayerId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Claim-level roles, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    /// Created the claim; may promote, demote, rename and delete
    Owner,
    /// May invite and kick members
    Officer,
    /// May build inside the claim
    Member,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Owner => "Owner",
            StaffRole::Officer => "Officer",
            StaffRole::Member => "Member",
        }
    }
}

/// Who may do what inside one claim.
///
/// A player holds at most one of owner/officer/member, and a pending
/// invitation never coexists with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRegistry {
    owner: PlayerId,
    officers: HashSet<PlayerId>,
    members: HashSet<PlayerId>,
    /// Invitees and when they were invited
    pending: HashMap<PlayerId, Timestamp>,
}

impl StaffRegistry {
    pub fn new(owner: PlayerId) -> Self {
        StaffRegistry {
            owner,
            officers: HashSet::new(),
            members: HashSet::new(),
            pending: HashMap::new(),
        }
    }

    /// Rebuild from persisted sets, dropping entries that would break the
    /// role invariants (the owner and officers win over lower roles).
    pub fn from_parts(
        owner: PlayerId,
        officers: impl IntoIterator<Item = PlayerId>,
        members: impl IntoIterator<Item = PlayerId>,
        pending: impl IntoIterator<Item = (PlayerId, Timestamp)>,
    ) -> Self {
        let mut officers: HashSet<PlayerId> = officers.into_iter().collect();
        officers.remove(&owner);

        let mut members: HashSet<PlayerId> = members.into_iter().collect();
        members.remove(&owner);
        members.retain(|p| !officers.contains(p));

        let mut pending: HashMap<PlayerId, Timestamp> = pending.into_iter().collect();
        pending.retain(|p, _| p != &owner && !officers.contains(p) && !members.contains(p));

        StaffRegistry {
            owner,
            officers,
            members,
            pending,
        }
    }

    pub fn owner(&self) -> &PlayerId {
        &self.owner
    }

    pub fn officers(&self) -> &HashSet<PlayerId> {
        &self.officers
    }

    pub fn members(&self) -> &HashSet<PlayerId> {
        &self.members
    }

    pub fn pending(&self) -> impl Iterator<Item = &PlayerId> {
        self.pending.keys()
    }

    /// Pending invitees with the time each was invited
    pub fn pending_since(&self) -> impl Iterator<Item = (&PlayerId, Timestamp)> {
        self.pending.iter().map(|(player, issued)| (player, *issued))
    }

    pub fn invited_at(&self, player: &PlayerId) -> Option<Timestamp> {
        self.pending.get(player).copied()
    }

    pub fn role_of(&self, player: &PlayerId) -> Option<StaffRole> {
        if player == &self.owner {
            Some(StaffRole::Owner)
        } else if self.officers.contains(player) {
            Some(StaffRole::Officer)
        } else if self.members.contains(player) {
            Some(StaffRole::Member)
        } else {
            None
        }
    }

    /// Owner, officer or member: may interact, place and break
    pub fn has_member_access(&self, player: &PlayerId) -> bool {
        self.role_of(player).is_some()
    }

    pub fn has_officer_access(&self, player: &PlayerId) -> bool {
        matches!(self.role_of(player), Some(StaffRole::Owner | StaffRole::Officer))
    }

    /// Only the owner may touch the claim anchor
    pub fn has_owner_access(&self, player: &PlayerId) -> bool {
        player == &self.owner
    }

    pub fn is_invited(&self, player: &PlayerId) -> bool {
        self.pending.contains_key(player)
    }

    pub fn invite(&mut self, acting: &PlayerId, target: &PlayerId) -> ActionResponse {
        self.invite_at(acting, target, Timestamp::now())
    }

    /// `invite` with an explicit issue time
    pub fn invite_at(
        &mut self,
        acting: &PlayerId,
        target: &PlayerId,
        issued: Timestamp,
    ) -> ActionResponse {
        if !self.has_officer_access(acting) {
            return ActionResponse::failed(FailureReason::Access);
        }
        if acting == target {
            return ActionResponse::failed(FailureReason::SelfTarget);
        }
        if self.role_of(target).is_some() || self.pending.contains_key(target) {
            return ActionResponse::failed(FailureReason::Exists);
        }

        self.pending.insert(target.clone(), issued);
        self.debug_check();
        ActionResponse::Successful
    }

    pub fn accept(&mut self, target: &PlayerId) -> ActionResponse {
        if self.pending.remove(target).is_none() {
            return ActionResponse::failed(FailureReason::NotFound);
        }

        self.members.insert(target.clone());
        self.debug_check();
        ActionResponse::Successful
    }

    /// Remove `target` from the claim. A non-owner kicking themselves leaves.
    pub fn kick(&mut self, acting: &PlayerId, target: &PlayerId) -> ActionResponse {
        if target == &self.owner {
            return ActionResponse::failed(FailureReason::Access);
        }

        if acting == target {
            return if self.remove_everywhere(target) {
                ActionResponse::Successful
            } else {
                ActionResponse::failed(FailureReason::NotFound)
            };
        }

        match self.role_of(acting) {
            Some(StaffRole::Owner) => {}
            Some(StaffRole::Officer) => {
                // Officers cannot remove their peers.
                if self.officers.contains(target) {
                    return ActionResponse::failed(FailureReason::Access);
                }
            }
            Some(StaffRole::Member) | None => {
                return ActionResponse::failed(FailureReason::Access);
            }
        }

        if !self.remove_everywhere(target) {
            return ActionResponse::failed(FailureReason::NotFound);
        }
        self.debug_check();
        ActionResponse::Successful
    }

    pub fn promote(&mut self, acting: &PlayerId, target: &PlayerId) -> ActionResponse {
        if !self.has_owner_access(acting) || target == &self.owner {
            return ActionResponse::failed(FailureReason::Access);
        }
        if !self.members.remove(target) {
            return ActionResponse::failed(FailureReason::NotFound);
        }

        self.officers.insert(target.clone());
        self.debug_check();
        ActionResponse::Successful
    }

    pub fn demote(&mut self, acting: &PlayerId, target: &PlayerId) -> ActionResponse {
        if !self.has_owner_access(acting) || target == &self.owner {
            return ActionResponse::failed(FailureReason::Access);
        }
        if !self.officers.remove(target) {
            return ActionResponse::failed(FailureReason::NotFound);
        }

        self.members.insert(target.clone());
        self.debug_check();
        ActionResponse::Successful
    }

    /// Drop a pending invitation without the acting-player checks
    pub fn revoke_invite(&mut self, target: &PlayerId) -> bool {
        self.pending.remove(target).is_some()
    }

    /// Whether the role sets are pairwise disjoint and exclude the owner
    pub fn invariants_hold(&self) -> bool {
        !self.officers.contains(&self.owner)
            && !self.members.contains(&self.owner)
            && !self.pending.contains_key(&self.owner)
            && self.officers.is_disjoint(&self.members)
            && self
                .pending
                .keys()
                .all(|p| !self.officers.contains(p) && !self.members.contains(p))
    }

    fn remove_everywhere(&mut self, target: &PlayerId) -> bool {
        let officer = self.officers.remove(target);
        let member = self.members.remove(target);
        let invited = self.pending.remove(target).is_some();
        officer || member || invited
    }

    fn debug_check(&self) {
        debug_assert!(self.invariants_hold(), "staff role sets overlap");
    }
}
