//! Claims surviving a restart through the SQLite store

use claimguard_core::core_region::{
    ActionResponse, AutoSave, ClaimLimits, ClaimOutcome, FailureReason, ManagerSettings,
    MemoryRegionStore, PlayerId, ProtectionContext, RegionId, RegionManager, RegionSqlStore,
    RegionStore, StaffRole, WorldCoordinate, WorldId,
};
use claimguard_core::shutdown::ShutdownCoordinator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const NO_TIERS: &[&str] = &[];

fn at(x: i32, y: i32, z: i32) -> WorldCoordinate {
    WorldCoordinate::new(WorldId::new("overworld"), x, y, z)
}

fn settings() -> ManagerSettings {
    ManagerSettings {
        default_radius: 8,
        default_limit: None,
        ..ManagerSettings::default()
    }
}

fn open(path: &Path) -> ProtectionContext {
    open_with_ttl(path, None)
}

fn open_with_ttl(path: &Path, invitation_ttl: Option<Duration>) -> ProtectionContext {
    let store: Arc<dyn RegionStore> = Arc::new(RegionSqlStore::open(path, 2).unwrap());
    let manager = RegionManager::load(store, settings()).unwrap();
    ProtectionContext::new(Arc::new(manager), ClaimLimits::default(), invitation_ttl)
}

fn claim(ctx: &ProtectionContext, owner: &str, coordinate: WorldCoordinate) -> RegionId {
    match ctx.claim(&PlayerId::new(owner), coordinate, NO_TIERS).unwrap() {
        ClaimOutcome::Created(region) => region.read().unwrap().id,
        ClaimOutcome::Refused(response) => panic!("claim refused: {}", response),
    }
}

#[test]
fn test_regions_and_staff_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims.db");
    let owner = PlayerId::new("owner");
    let officer = PlayerId::new("officer");
    let invited = PlayerId::new("invited");

    let (first, second) = {
        let ctx = open(&path);
        let first = claim(&ctx, "owner", at(0, 64, 0));
        let second = claim(&ctx, "other", at(200, 64, 0));

        assert!(ctx.rename(&owner, &first, "keep").unwrap().is_successful());
        ctx.invite(&owner, &first, &officer).unwrap();
        ctx.accept(&officer, None).unwrap();
        ctx.promote(&owner, &first, &officer).unwrap();
        ctx.invite(&owner, &first, &invited).unwrap();

        let report = ctx.manager().flush_dirty().unwrap();
        assert_eq!(report.saved, 1);
        assert!(report.failed.is_empty());
        (first, second)
    };

    let ctx = open(&path);
    assert_eq!(ctx.manager().len(), 2);

    let ids: Vec<RegionId> = ctx
        .manager()
        .regions()
        .iter()
        .map(|r| r.read().unwrap().id)
        .collect();
    assert_eq!(ids, vec![first, second]);

    let region = ctx.find("keep").unwrap();
    {
        let region = region.read().unwrap();
        assert_eq!(region.id, first);
        assert_eq!(region.staff.role_of(&officer), Some(StaffRole::Officer));
        assert!(region.staff.is_invited(&invited));
        assert_eq!(region.volume.radius, 8);
    }

    // Pending invitations are tracked again after a restart.
    assert_eq!(ctx.accept(&invited, None).unwrap(), ActionResponse::Successful);
    assert!(ctx.manager().region_at(&at(5, 70, -5)).is_some());
}

#[test]
fn test_invitation_lifetime_spans_restarts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims.db");
    let ttl = Some(Duration::from_secs(60));
    let owner = PlayerId::new("owner");
    let guest = PlayerId::new("guest");

    let (id, issued) = {
        let ctx = open_with_ttl(&path, ttl);
        let id = claim(&ctx, "owner", at(0, 64, 0));
        ctx.invite(&owner, &id, &guest).unwrap();
        let issued = ctx.pending_invitations(&guest).unwrap()[0].issued_at;
        ctx.manager().flush_dirty().unwrap();
        (id, issued)
    };

    let ctx = open_with_ttl(&path, ttl);
    let pending = ctx.pending_invitations(&guest).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].issued_at, issued);

    // Still counted from the original invite, not from the reopen
    assert!(ctx
        .expire_invitations(issued.saturating_add(Duration::from_secs(30)))
        .unwrap()
        .is_empty());
    assert_eq!(
        ctx.accept_at(&guest, None, issued.saturating_add(Duration::from_secs(61)))
            .unwrap(),
        ActionResponse::failed(FailureReason::NotFound)
    );
    assert!(ctx.info(&id).unwrap().pending.is_empty());
}

#[test]
fn test_deleted_region_stays_deleted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims.db");

    let doomed = {
        let ctx = open(&path);
        let doomed = claim(&ctx, "owner", at(0, 64, 0));
        claim(&ctx, "neighbour", at(100, 64, 0));
        assert!(ctx
            .delete(&PlayerId::new("owner"), &doomed, false)
            .unwrap()
            .is_successful());
        doomed
    };

    let ctx = open(&path);
    assert_eq!(ctx.manager().len(), 1);
    assert!(ctx.manager().region(&doomed).is_none());
    assert!(ctx.manager().region_at(&at(0, 64, 0)).is_none());
    assert!(ctx.find(&doomed.to_string()).is_none());
}

#[test]
fn test_rename_conflict_is_checked_against_loaded_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims.db");

    let (a, b) = {
        let ctx = open(&path);
        let a = claim(&ctx, "a", at(0, 64, 0));
        let b = claim(&ctx, "b", at(100, 64, 0));
        ctx.rename(&PlayerId::new("a"), &a, "spawn").unwrap();
        (a, b)
    };

    let ctx = open(&path);
    assert_eq!(
        ctx.rename(&PlayerId::new("b"), &b, "spawn").unwrap(),
        ActionResponse::failed(FailureReason::Exists)
    );
    assert!(ctx.rename(&PlayerId::new("a"), &a, "market").unwrap().is_successful());
    assert!(ctx.rename(&PlayerId::new("b"), &b, "spawn").unwrap().is_successful());
}

#[test]
fn test_failed_write_leaves_memory_untouched() {
    let store = Arc::new(MemoryRegionStore::new());
    let manager = Arc::new(RegionManager::new(store.clone(), settings()));
    let ctx = ProtectionContext::new(manager, ClaimLimits::default(), None);
    let id = claim(&ctx, "owner", at(0, 64, 0));

    store.set_fail_writes(true);
    assert!(ctx.rename(&PlayerId::new("owner"), &id, "new").is_err());
    assert!(ctx.find("new").is_none());
    assert_eq!(ctx.find(&id.to_string()).unwrap().read().unwrap().name, id.to_string());

    assert!(ctx.claim(&PlayerId::new("other"), at(500, 64, 0), NO_TIERS).is_err());
    assert_eq!(ctx.manager().len(), 1);

    assert!(ctx.manager().delete_region(&id).is_err());
    assert!(ctx.manager().region(&id).is_some());
}

#[tokio::test]
async fn test_autosave_flushes_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("claims.db");
    let owner = PlayerId::new("owner");
    let member = PlayerId::new("member");

    {
        let ctx = open(&path);
        let id = claim(&ctx, "owner", at(0, 64, 0));

        let coordinator = ShutdownCoordinator::new();
        let handle = AutoSave::spawn(
            ctx.manager().clone(),
            Duration::from_secs(3600),
            coordinator.subscribe(),
        );

        ctx.invite(&owner, &id, &member).unwrap();
        ctx.accept(&member, None).unwrap();
        assert_eq!(ctx.manager().dirty_count(), 1);

        coordinator.shutdown().await;
        let stats = handle.await.unwrap();
        assert_eq!(stats.saved, 1);
        assert_eq!(ctx.manager().dirty_count(), 0);
    }

    let ctx = open(&path);
    let region = ctx.manager().regions_owned_by(&owner).pop().unwrap();
    assert!(region.read().unwrap().staff.has_member_access(&member));
}
