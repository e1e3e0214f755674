//! Protection context
//!
//! The object a host integration holds: the region manager, the invitation
//! tracker and the claim limits. Block events go through
//! `check_block_action`; chat commands go through the staff operations,
//! which locate the claim, apply the staff rule, and queue the claim for the
//! next flush when something changed.

use super::coords::WorldCoordinate;
use super::invitation::{Invitation, InvitationManager};
use super::manager::{ClaimLimits, ClaimOutcome, RegionError, RegionManager, RegionResult, SharedRegion};
use super::region::RegionInfo;
use super::response::{ActionResponse, FailureReason};
use super::staff::StaffRegistry;
use super::types::{PlayerId, RegionId, Timestamp};
use crate::metrics;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Block-level event being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAction {
    Interact,
    Place,
    Break,
}

impl BlockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockAction::Interact => "interact",
            BlockAction::Place => "place",
            BlockAction::Break => "break",
        }
    }
}

/// Verdict for one block event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Inside a claim and permitted, or bypassing protection
    Allowed,
    /// No claim covers the block
    Unclaimed,
    /// The host must cancel the event
    Denied { region: RegionId },
}

impl AccessDecision {
    pub fn is_permitted(&self) -> bool {
        !matches!(self, AccessDecision::Denied { .. })
    }
}

/// Entry point for host integrations
pub struct ProtectionContext {
    manager: Arc<RegionManager>,
    invitations: Mutex<InvitationManager>,
    limits: ClaimLimits,
}

impl ProtectionContext {
    /// Build a context; pending invitations already stored on claims are
    /// tracked from their stored issue time, attributed to the claim owner.
    pub fn new(manager: Arc<RegionManager>, limits: ClaimLimits, invitation_ttl: Option<Duration>) -> Self {
        let mut invitations = InvitationManager::new(invitation_ttl);

        for shared in manager.regions() {
            let region = shared.read().unwrap_or_else(PoisonError::into_inner);
            for (invitee, issued_at) in region.staff.pending_since() {
                invitations.record(Invitation {
                    region: region.id,
                    invitee: invitee.clone(),
                    inviter: region.owner().clone(),
                    issued_at,
                });
            }
        }

        ProtectionContext {
            manager,
            invitations: Mutex::new(invitations),
            limits,
        }
    }

    pub fn manager(&self) -> &Arc<RegionManager> {
        &self.manager
    }

    pub fn limits(&self) -> &ClaimLimits {
        &self.limits
    }

    fn invitations(&self) -> RegionResult<MutexGuard<'_, InvitationManager>> {
        self.invitations.lock().map_err(|_| RegionError::LockPoisoned)
    }

    /// Invitations currently held by `player`
    pub fn pending_invitations(&self, player: &PlayerId) -> RegionResult<Vec<Invitation>> {
        Ok(self.invitations()?.pending_for(player).to_vec())
    }

    /// Resolve a claim by id, falling back to its name
    pub fn find(&self, name_or_id: &str) -> Option<SharedRegion> {
        RegionId::parse(name_or_id)
            .and_then(|id| self.manager.region(&id))
            .or_else(|| self.manager.region_by_name(name_or_id))
    }

    /// Decide whether `player` may interact with, place or break the block at
    /// `coordinate`. `bypass` is the host's administrative override.
    pub fn check_block_action(
        &self,
        player: &PlayerId,
        coordinate: &WorldCoordinate,
        action: BlockAction,
        bypass: bool,
    ) -> AccessDecision {
        if bypass {
            metrics::block_check("bypass");
            return AccessDecision::Allowed;
        }

        let Some(shared) = self.manager.region_at(coordinate) else {
            metrics::block_check("unclaimed");
            return AccessDecision::Unclaimed;
        };
        let region = shared.read().unwrap_or_else(PoisonError::into_inner);

        let permitted = region.staff.has_member_access(player)
            && (!region.is_anchor(coordinate) || region.staff.has_owner_access(player));

        if permitted {
            metrics::block_check("allowed");
            AccessDecision::Allowed
        } else {
            debug!(
                region = %region.id,
                player = %player,
                action = action.as_str(),
                "Block action denied"
            );
            metrics::block_check("denied");
            AccessDecision::Denied { region: region.id }
        }
    }

    /// Apply `op` to the staff of `region` and queue it for saving on success
    fn with_staff(
        &self,
        region: &RegionId,
        op: impl FnOnce(&mut StaffRegistry) -> ActionResponse,
    ) -> RegionResult<ActionResponse> {
        let Some(shared) = self.manager.region(region) else {
            return Ok(ActionResponse::failed(FailureReason::NotFound));
        };
        let response = {
            let mut guard = shared.write().map_err(|_| RegionError::LockPoisoned)?;
            op(&mut guard.staff)
        };

        if response.is_successful() {
            self.manager.mark_dirty(region);
        }
        Ok(response)
    }

    pub fn invite(&self, actor: &PlayerId, region: &RegionId, target: &PlayerId) -> RegionResult<ActionResponse> {
        let issued_at = Timestamp::now();
        let response = self.with_staff(region, |staff| staff.invite_at(actor, target, issued_at))?;
        if response.is_successful() {
            self.invitations()?.record(Invitation {
                region: *region,
                invitee: target.clone(),
                inviter: actor.clone(),
                issued_at,
            });
            info!(region = %region, inviter = %actor, invitee = %target, "Invitation sent");
        }
        Ok(response)
    }

    /// Accept the invitation into `region`, or the latest one when `None`.
    /// An expired invitation is dropped and reported as "not-found".
    pub fn accept(&self, player: &PlayerId, region: Option<&RegionId>) -> RegionResult<ActionResponse> {
        self.accept_at(player, region, Timestamp::now())
    }

    pub fn accept_at(
        &self,
        player: &PlayerId,
        region: Option<&RegionId>,
        now: Timestamp,
    ) -> RegionResult<ActionResponse> {
        let invitation = {
            let mut invitations = self.invitations()?;
            let Some(selected) = invitations.select(player, region).cloned() else {
                return Ok(ActionResponse::failed(FailureReason::NotFound));
            };
            invitations.take(player, &selected.region);
            if invitations.is_expired(&selected, now) {
                drop(invitations);
                self.with_staff(&selected.region, |staff| {
                    staff.revoke_invite(player);
                    ActionResponse::Successful
                })?;
                return Ok(ActionResponse::failed(FailureReason::NotFound));
            }
            selected
        };

        let response = self.with_staff(&invitation.region, |staff| staff.accept(player))?;
        if response.is_successful() {
            info!(region = %invitation.region, player = %player, "Invitation accepted");
        }
        Ok(response)
    }

    pub fn kick(&self, actor: &PlayerId, region: &RegionId, target: &PlayerId) -> RegionResult<ActionResponse> {
        let response = self.with_staff(region, |staff| staff.kick(actor, target))?;
        if response.is_successful() {
            self.invitations()?.take(target, region);
            info!(region = %region, actor = %actor, target = %target, "Player removed from claim");
        }
        Ok(response)
    }

    /// Remove yourself from a claim; the owner cannot leave
    pub fn leave(&self, player: &PlayerId, region: &RegionId) -> RegionResult<ActionResponse> {
        self.kick(player, region, player)
    }

    pub fn promote(&self, actor: &PlayerId, region: &RegionId, target: &PlayerId) -> RegionResult<ActionResponse> {
        self.with_staff(region, |staff| staff.promote(actor, target))
    }

    pub fn demote(&self, actor: &PlayerId, region: &RegionId, target: &PlayerId) -> RegionResult<ActionResponse> {
        self.with_staff(region, |staff| staff.demote(actor, target))
    }

    /// Rename a claim; only the owner may
    pub fn rename(&self, actor: &PlayerId, region: &RegionId, name: &str) -> RegionResult<ActionResponse> {
        let Some(shared) = self.manager.region(region) else {
            return Ok(ActionResponse::failed(FailureReason::NotFound));
        };
        let is_owner = shared
            .read()
            .map_err(|_| RegionError::LockPoisoned)?
            .staff
            .has_owner_access(actor);
        if !is_owner {
            return Ok(ActionResponse::failed(FailureReason::Access));
        }

        self.manager.rename(region, name)
    }

    /// Delete a claim; the owner or a bypassing administrator may
    pub fn delete(&self, actor: &PlayerId, region: &RegionId, bypass: bool) -> RegionResult<ActionResponse> {
        let Some(shared) = self.manager.region(region) else {
            return Ok(ActionResponse::failed(FailureReason::NotFound));
        };
        let is_owner = shared
            .read()
            .map_err(|_| RegionError::LockPoisoned)?
            .staff
            .has_owner_access(actor);
        if !is_owner && !bypass {
            return Ok(ActionResponse::failed(FailureReason::Access));
        }

        let response = self.manager.delete_region(region)?;
        if response.is_successful() {
            self.invitations()?.remove_region(region);
        }
        Ok(response)
    }

    /// Claim `coordinate` for `owner`, whose limit is the most generous of
    /// the default and the named `tiers`
    pub fn claim<S: AsRef<str>>(
        &self,
        owner: &PlayerId,
        coordinate: WorldCoordinate,
        tiers: &[S],
    ) -> RegionResult<ClaimOutcome> {
        let limit = self.limits.limit_for(tiers);
        self.manager
            .create_region_with_limit(coordinate, owner.clone(), limit)
    }

    /// Drop invitations past their TTL and revoke them on their claims
    pub fn expire_invitations(&self, now: Timestamp) -> RegionResult<Vec<Invitation>> {
        let expired = self.invitations()?.expire(now);
        for invitation in &expired {
            self.with_staff(&invitation.region, |staff| {
                if staff.revoke_invite(&invitation.invitee) {
                    ActionResponse::Successful
                } else {
                    ActionResponse::failed(FailureReason::NotFound)
                }
            })?;
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired invitations");
        }
        Ok(expired)
    }

    pub fn info(&self, region: &RegionId) -> Option<RegionInfo> {
        let shared = self.manager.region(region)?;
        let region = shared.read().unwrap_or_else(PoisonError::into_inner);
        Some(region.info())
    }
}
