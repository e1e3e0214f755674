//! End-to-end claim behaviour through the public API

use claimguard_core::core_region::{
    AccessDecision, ActionResponse, BlockAction, ClaimLimits, ClaimOutcome, FailureReason,
    ManagerSettings, MemoryRegionStore, OverlapPolicy, PlayerId, ProtectionContext, RegionId,
    RegionManager, SharedRegion, WorldCoordinate, WorldId,
};
use std::sync::Arc;

const NO_TIERS: &[&str] = &[];

fn at(x: i32, y: i32, z: i32) -> WorldCoordinate {
    WorldCoordinate::new(WorldId::new("w"), x, y, z)
}

fn player(name: &str) -> PlayerId {
    PlayerId::new(name)
}

fn context_with(settings: ManagerSettings) -> ProtectionContext {
    let manager = RegionManager::new(Arc::new(MemoryRegionStore::new()), settings);
    ProtectionContext::new(Arc::new(manager), ClaimLimits::default(), None)
}

fn unlimited(radius: u32) -> ManagerSettings {
    ManagerSettings {
        default_radius: radius,
        default_limit: None,
        ..ManagerSettings::default()
    }
}

fn created(outcome: ClaimOutcome) -> SharedRegion {
    match outcome {
        ClaimOutcome::Created(region) => region,
        ClaimOutcome::Refused(response) => panic!("claim refused: {}", response),
    }
}

fn id_of(region: &SharedRegion) -> RegionId {
    region.read().unwrap().id
}

#[test]
fn test_claim_radius_bounds_protection() {
    let ctx = context_with(unlimited(5));
    let alice = player("alice");
    let region = created(ctx.claim(&alice, at(100, 64, 100), NO_TIERS).unwrap());

    let inside = ctx.manager().region_at(&at(105, 64, 100)).unwrap();
    assert_eq!(id_of(&inside), id_of(&region));
    assert!(ctx.manager().region_at(&at(106, 64, 100)).is_none());

    let stranger = player("mallory");
    assert!(matches!(
        ctx.check_block_action(&stranger, &at(105, 64, 100), BlockAction::Break, false),
        AccessDecision::Denied { .. }
    ));
    assert_eq!(
        ctx.check_block_action(&stranger, &at(106, 64, 100), BlockAction::Break, false),
        AccessDecision::Unclaimed
    );
}

#[test]
fn test_invited_player_gains_member_access() {
    let ctx = context_with(unlimited(5));
    let owner = player("owner");
    let guest = player("guest");
    let region = created(ctx.claim(&owner, at(0, 64, 0), NO_TIERS).unwrap());
    let id = id_of(&region);

    assert!(!region.read().unwrap().staff.has_member_access(&guest));
    assert_eq!(ctx.invite(&owner, &id, &guest).unwrap(), ActionResponse::Successful);
    assert_eq!(ctx.accept(&guest, None).unwrap(), ActionResponse::Successful);
    assert!(region.read().unwrap().staff.has_member_access(&guest));

    // The invitation is consumed.
    assert_eq!(
        ctx.accept(&guest, None).unwrap(),
        ActionResponse::failed(FailureReason::NotFound)
    );
    assert_eq!(
        ctx.check_block_action(&guest, &at(1, 64, 1), BlockAction::Place, false),
        AccessDecision::Allowed
    );
}

#[test]
fn test_officer_cannot_promote() {
    let ctx = context_with(unlimited(5));
    let owner = player("owner");
    let officer = player("officer");
    let member = player("member");
    let region = created(ctx.claim(&owner, at(0, 64, 0), NO_TIERS).unwrap());
    let id = id_of(&region);

    for target in [&officer, &member] {
        ctx.invite(&owner, &id, target).unwrap();
        ctx.accept(target, Some(&id)).unwrap();
    }
    assert!(ctx.promote(&owner, &id, &officer).unwrap().is_successful());

    let (officers_before, members_before) = {
        let region = region.read().unwrap();
        (region.staff.officers().clone(), region.staff.members().clone())
    };

    assert_eq!(
        ctx.promote(&officer, &id, &member).unwrap(),
        ActionResponse::failed(FailureReason::Access)
    );

    let region = region.read().unwrap();
    assert_eq!(region.staff.officers(), &officers_before);
    assert_eq!(region.staff.members(), &members_before);
}

#[test]
fn test_overlap_tie_break_is_insertion_order() {
    let ctx = context_with(unlimited(5));
    let first = created(ctx.claim(&player("a"), at(0, 64, 0), NO_TIERS).unwrap());
    created(ctx.claim(&player("b"), at(6, 64, 0), NO_TIERS).unwrap());

    // (3, 64, 0) lies inside both cubes.
    let found = ctx.manager().region_at(&at(3, 64, 0)).unwrap();
    assert_eq!(id_of(&found), id_of(&first));
}

#[test]
fn test_reject_policy_refuses_overlap() {
    let ctx = context_with(ManagerSettings {
        overlap_policy: OverlapPolicy::Reject,
        ..unlimited(5)
    });
    created(ctx.claim(&player("a"), at(0, 64, 0), NO_TIERS).unwrap());

    let outcome = ctx.claim(&player("b"), at(6, 64, 0), NO_TIERS).unwrap();
    assert_eq!(outcome.response(), ActionResponse::failed(FailureReason::Exists));
    let outcome = ctx.claim(&player("b"), at(11, 64, 0), NO_TIERS).unwrap();
    assert!(outcome.response().is_successful());
}

#[test]
fn test_rename_rules() {
    let ctx = context_with(unlimited(5));
    let a = created(ctx.claim(&player("a"), at(0, 64, 0), NO_TIERS).unwrap());
    let b = created(ctx.claim(&player("b"), at(100, 64, 0), NO_TIERS).unwrap());
    let (a_id, b_id) = (id_of(&a), id_of(&b));

    assert!(ctx.rename(&player("b"), &b_id, "harbour").unwrap().is_successful());
    assert_eq!(
        ctx.rename(&player("a"), &a_id, "harbour").unwrap(),
        ActionResponse::failed(FailureReason::Exists)
    );
    assert_eq!(a.read().unwrap().name, a_id.to_string());

    assert_eq!(
        ctx.rename(&player("a"), &a_id, &"x".repeat(37)).unwrap(),
        ActionResponse::failed(FailureReason::Length)
    );
    assert_eq!(
        ctx.rename(&player("b"), &a_id, "stolen").unwrap(),
        ActionResponse::failed(FailureReason::Access)
    );
    assert!(ctx.find("harbour").is_some());
}

#[test]
fn test_owner_cannot_be_kicked() {
    let ctx = context_with(unlimited(5));
    let owner = player("owner");
    let officer = player("officer");
    let region = created(ctx.claim(&owner, at(0, 64, 0), NO_TIERS).unwrap());
    let id = id_of(&region);
    ctx.invite(&owner, &id, &officer).unwrap();
    ctx.accept(&officer, None).unwrap();
    ctx.promote(&owner, &id, &officer).unwrap();

    for actor in [&owner, &officer, &player("nobody")] {
        assert_eq!(
            ctx.kick(actor, &id, &owner).unwrap(),
            ActionResponse::failed(FailureReason::Access)
        );
    }
}

#[test]
fn test_claim_limit_and_tiers() {
    let ctx = context_with(ManagerSettings {
        default_radius: 5,
        ..ManagerSettings::default()
    });
    let alice = player("alice");

    created(ctx.claim(&alice, at(0, 64, 0), NO_TIERS).unwrap());
    let refused = ctx.claim(&alice, at(100, 64, 0), NO_TIERS).unwrap();
    assert_eq!(refused.response(), ActionResponse::failed(FailureReason::Access));

    created(ctx.claim(&alice, at(100, 64, 0), &["vip"]).unwrap());
    assert_eq!(ctx.manager().regions_owned_by(&alice).len(), 2);
}

#[test]
fn test_delete_clears_lookups_and_invitations() {
    let ctx = context_with(unlimited(5));
    let owner = player("owner");
    let guest = player("guest");
    let region = created(ctx.claim(&owner, at(0, 64, 0), NO_TIERS).unwrap());
    let id = id_of(&region);
    ctx.invite(&owner, &id, &guest).unwrap();

    assert_eq!(
        ctx.delete(&guest, &id, false).unwrap(),
        ActionResponse::failed(FailureReason::Access)
    );
    assert!(ctx.delete(&guest, &id, true).unwrap().is_successful());

    assert!(ctx.manager().region(&id).is_none());
    assert!(ctx.manager().region_at(&at(0, 64, 0)).is_none());
    assert!(ctx.pending_invitations(&guest).unwrap().is_empty());
    assert_eq!(
        ctx.accept(&guest, None).unwrap(),
        ActionResponse::failed(FailureReason::NotFound)
    );
}
