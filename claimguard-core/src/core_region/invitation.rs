//! Outstanding invitations across all claims
//!
//! The staff registry of each claim knows who is pending; this manager adds
//! who sent the invitation, when, and whether it has outlived its TTL.

use super::types::{PlayerId, RegionId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A pending offer to join a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub region: RegionId,
    pub invitee: PlayerId,
    pub inviter: PlayerId,
    pub issued_at: Timestamp,
}

/// Invitations keyed by invitee, oldest first
#[derive(Debug, Default)]
pub struct InvitationManager {
    ttl: Option<Duration>,
    by_invitee: HashMap<PlayerId, Vec<Invitation>>,
}

impl InvitationManager {
    /// `ttl` of `None` keeps invitations until they are accepted or revoked
    pub fn new(ttl: Option<Duration>) -> Self {
        InvitationManager {
            ttl,
            by_invitee: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Track an invitation, replacing any earlier one for the same claim
    pub fn record(&mut self, invitation: Invitation) {
        let pending = self.by_invitee.entry(invitation.invitee.clone()).or_default();
        pending.retain(|existing| existing.region != invitation.region);
        pending.push(invitation);
    }

    /// Invitations held by `invitee`, oldest first
    pub fn pending_for(&self, invitee: &PlayerId) -> &[Invitation] {
        self.by_invitee
            .get(invitee)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The invitation `accept` should consume: the one for `region` when
    /// given, otherwise the most recent
    pub fn select(&self, invitee: &PlayerId, region: Option<&RegionId>) -> Option<&Invitation> {
        let pending = self.pending_for(invitee);
        match region {
            Some(region) => pending.iter().find(|inv| &inv.region == region),
            None => pending.last(),
        }
    }

    /// Remove and return the invitation for (`invitee`, `region`)
    pub fn take(&mut self, invitee: &PlayerId, region: &RegionId) -> Option<Invitation> {
        let pending = self.by_invitee.get_mut(invitee)?;
        let position = pending.iter().position(|inv| &inv.region == region)?;
        let invitation = pending.remove(position);
        if pending.is_empty() {
            self.by_invitee.remove(invitee);
        }
        Some(invitation)
    }

    pub fn is_expired(&self, invitation: &Invitation, now: Timestamp) -> bool {
        match self.ttl {
            Some(ttl) => invitation.issued_at.saturating_add(ttl) <= now,
            None => false,
        }
    }

    /// Drop and return every invitation past its TTL
    pub fn expire(&mut self, now: Timestamp) -> Vec<Invitation> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        self.by_invitee.retain(|_, pending| {
            pending.retain(|inv| {
                let live = inv.issued_at.saturating_add(ttl) > now;
                if !live {
                    expired.push(inv.clone());
                }
                live
            });
            !pending.is_empty()
        });
        expired
    }

    /// Forget every invitation into a deleted claim
    pub fn remove_region(&mut self, region: &RegionId) -> usize {
        let mut removed = 0;
        self.by_invitee.retain(|_, pending| {
            let before = pending.len();
            pending.retain(|inv| &inv.region != region);
            removed += before - pending.len();
            !pending.is_empty()
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.by_invitee.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_invitee.is_empty()
    }
}
