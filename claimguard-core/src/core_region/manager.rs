//! Region registry
//!
//! Owns every loaded claim and the indices used to find them: by id, by
//! name, by anchor block and by world. Mutations write through the store
//! first and only touch memory once the store accepted the change, so a
//! failed write never leaves a half-applied claim behind.
//!
//! Locking: create, rename and delete are serialized by the writer lock,
//! which lookups never take. Store calls run with only that lock held; the
//! index lock comes next and is always taken before any region lock.

use super::coords::{Volume, WorldCoordinate};
use super::region::{validate_name, Region};
use super::response::{ActionResponse, FailureReason};
use super::storage::{RegionStore, StorageError};
use super::types::{PlayerId, RegionId, Timestamp, WorldId};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Handle to a loaded claim
pub type SharedRegion = Arc<RwLock<Region>>;

/// Region manager errors. Refusals are `ActionResponse` values; only
/// failures that break the memory/store agreement end up here.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Region state lock poisoned")]
    LockPoisoned,

    #[error("Stored regions conflict: {0}")]
    Conflict(String),
}

pub type RegionResult<T> = Result<T, RegionError>;

fn handle_poison<T>(_err: PoisonError<T>) -> RegionError {
    RegionError::LockPoisoned
}

/// What to do when a new claim would overlap an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Allow overlaps; lookups resolve to the earliest claim
    #[default]
    FirstMatch,
    /// Refuse any claim whose volume shares a block with another
    Reject,
}

/// How many claims a player may own.
///
/// A value of 0 means unlimited. Named tiers are granted by the host
/// (e.g. from a permission); the most generous applicable value wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLimits {
    pub default: usize,
    #[serde(default)]
    pub tiers: HashMap<String, usize>,
}

impl Default for ClaimLimits {
    fn default() -> Self {
        let mut tiers = HashMap::new();
        tiers.insert("vip".to_string(), 5);
        ClaimLimits { default: 1, tiers }
    }
}

impl ClaimLimits {
    /// Limit for a player holding `tiers`, `None` when unlimited
    pub fn limit_for<S: AsRef<str>>(&self, tiers: &[S]) -> Option<usize> {
        let values = std::iter::once(self.default)
            .chain(tiers.iter().filter_map(|t| self.tiers.get(t.as_ref()).copied()));

        let mut best = 0;
        for value in values {
            if value == 0 {
                return None;
            }
            best = best.max(value);
        }
        Some(best)
    }
}

/// Placement rules applied by `create_region`
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub default_radius: u32,
    pub overlap_policy: OverlapPolicy,
    /// Worlds where claims may be placed; empty means every world
    pub protected_worlds: HashSet<WorldId>,
    pub default_limit: Option<usize>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        ManagerSettings {
            default_radius: 10,
            overlap_policy: OverlapPolicy::FirstMatch,
            protected_worlds: HashSet::new(),
            default_limit: ClaimLimits::default().limit_for::<&str>(&[]),
        }
    }
}

impl ManagerSettings {
    pub fn protects(&self, world: &WorldId) -> bool {
        self.protected_worlds.is_empty() || self.protected_worlds.contains(world)
    }
}

/// Result of a claim attempt that reached a decision
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Created(SharedRegion),
    Refused(ActionResponse),
}

impl ClaimOutcome {
    pub fn response(&self) -> ActionResponse {
        match self {
            ClaimOutcome::Created(_) => ActionResponse::Successful,
            ClaimOutcome::Refused(response) => *response,
        }
    }

    pub fn region(&self) -> Option<&SharedRegion> {
        match self {
            ClaimOutcome::Created(region) => Some(region),
            ClaimOutcome::Refused(_) => None,
        }
    }
}

/// Summary of one `flush_dirty` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    /// Regions left dirty for the next pass
    pub failed: Vec<RegionId>,
}

#[derive(Default)]
struct RegionIndex {
    by_id: HashMap<RegionId, SharedRegion>,
    by_name: HashMap<String, RegionId>,
    by_anchor: HashMap<WorldCoordinate, RegionId>,
    /// Per-world claim ids in insertion order
    by_world: HashMap<WorldId, Vec<RegionId>>,
    order: Vec<RegionId>,
}

impl RegionIndex {
    fn insert(&mut self, region: Region) -> SharedRegion {
        let id = region.id;
        self.by_name.insert(region.name.clone(), id);
        self.by_anchor.insert(region.anchor().clone(), id);
        self.by_world
            .entry(region.volume.world().clone())
            .or_default()
            .push(id);
        self.order.push(id);

        let shared = Arc::new(RwLock::new(region));
        self.by_id.insert(id, Arc::clone(&shared));
        shared
    }

    fn remove(&mut self, region: &Region) {
        let id = region.id;
        self.by_id.remove(&id);
        self.by_name.remove(&region.name);
        self.by_anchor.remove(region.anchor());
        if let Some(bucket) = self.by_world.get_mut(region.volume.world()) {
            bucket.retain(|other| *other != id);
            if bucket.is_empty() {
                self.by_world.remove(region.volume.world());
            }
        }
        self.order.retain(|other| *other != id);
    }

    fn in_world(&self, world: &WorldId) -> impl Iterator<Item = &SharedRegion> {
        self.by_world
            .get(world)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
    }
}

/// Registry of all claims
pub struct RegionManager {
    store: Arc<dyn RegionStore>,
    settings: ManagerSettings,
    index: RwLock<RegionIndex>,
    /// Held across the store call of a create, rename or delete
    writer: Mutex<()>,
    dirty: Mutex<HashSet<RegionId>>,
}

impl RegionManager {
    /// Empty manager writing through `store`
    pub fn new(store: Arc<dyn RegionStore>, settings: ManagerSettings) -> Self {
        RegionManager {
            store,
            settings,
            index: RwLock::new(RegionIndex::default()),
            writer: Mutex::new(()),
            dirty: Mutex::new(HashSet::new()),
        }
    }

    /// Rebuild every index from the store
    pub fn load(store: Arc<dyn RegionStore>, settings: ManagerSettings) -> RegionResult<Self> {
        store.ensure_schema()?;
        let regions = store.load_regions()?;
        let manager = Self::new(store, settings);

        {
            let mut index = manager.write_index()?;
            for region in regions {
                if index.by_id.contains_key(&region.id) {
                    return Err(RegionError::Conflict(format!("duplicate id {}", region.id)));
                }
                if index.by_name.contains_key(&region.name) {
                    return Err(RegionError::Conflict(format!("duplicate name '{}'", region.name)));
                }
                if index.by_anchor.contains_key(region.anchor()) {
                    warn!(region = %region.id, "Two claims share an anchor block; keeping the first");
                    continue;
                }
                index.insert(region);
            }
            info!(count = index.order.len(), "Loaded regions");
        }

        Ok(manager)
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    fn read_index(&self) -> RegionResult<RwLockReadGuard<'_, RegionIndex>> {
        self.index.read().map_err(handle_poison)
    }

    fn write_index(&self) -> RegionResult<RwLockWriteGuard<'_, RegionIndex>> {
        self.index.write().map_err(handle_poison)
    }

    /// Lookup by identifier
    pub fn region(&self, id: &RegionId) -> Option<SharedRegion> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index.by_id.get(id).cloned()
    }

    /// Exact, case-sensitive lookup by name
    pub fn region_by_name(&self, name: &str) -> Option<SharedRegion> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index
            .by_name
            .get(name)
            .and_then(|id| index.by_id.get(id))
            .cloned()
    }

    /// The claim covering `coordinate`.
    ///
    /// An anchor block resolves to its own claim; otherwise the earliest
    /// inserted claim of that world whose volume contains the point wins.
    pub fn region_at(&self, coordinate: &WorldCoordinate) -> Option<SharedRegion> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(region) = index
            .by_anchor
            .get(coordinate)
            .and_then(|id| index.by_id.get(id))
        {
            return Some(Arc::clone(region));
        }

        let found = index
            .in_world(&coordinate.world)
            .find(|region| {
                region
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .contains(coordinate)
            })
            .cloned();
        found
    }

    /// Every claim, in insertion order
    pub fn regions(&self) -> Vec<SharedRegion> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index
            .order
            .iter()
            .filter_map(|id| index.by_id.get(id).cloned())
            .collect()
    }

    pub fn regions_owned_by(&self, owner: &PlayerId) -> Vec<SharedRegion> {
        self.regions()
            .into_iter()
            .filter(|region| {
                region
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .owner()
                    == owner
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim `coordinate` for `owner` with the configured radius and limit
    pub fn create_region(
        &self,
        coordinate: WorldCoordinate,
        owner: PlayerId,
    ) -> RegionResult<ClaimOutcome> {
        self.create_region_with_limit(coordinate, owner, self.settings.default_limit)
    }

    /// Claim `coordinate` for `owner`; `limit` of `None` means unlimited
    pub fn create_region_with_limit(
        &self,
        coordinate: WorldCoordinate,
        owner: PlayerId,
        limit: Option<usize>,
    ) -> RegionResult<ClaimOutcome> {
        if !self.settings.protects(&coordinate.world) {
            metrics::claim_refused("access");
            return Ok(ClaimOutcome::Refused(ActionResponse::failed(FailureReason::Access)));
        }

        let _writer = self.writer.lock().map_err(handle_poison)?;
        let index = self.read_index()?;

        if index.by_anchor.contains_key(&coordinate) {
            metrics::claim_refused("exists");
            return Ok(ClaimOutcome::Refused(ActionResponse::failed(FailureReason::Exists)));
        }

        let volume = Volume::new(coordinate, self.settings.default_radius);

        if self.settings.overlap_policy == OverlapPolicy::Reject {
            let overlaps = index.in_world(volume.world()).any(|other| {
                other
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .volume
                    .intersects(&volume)
            });
            if overlaps {
                metrics::claim_refused("exists");
                return Ok(ClaimOutcome::Refused(ActionResponse::failed(FailureReason::Exists)));
            }
        }

        if let Some(limit) = limit {
            let owned = index
                .by_id
                .values()
                .filter(|r| r.read().unwrap_or_else(PoisonError::into_inner).owner() == &owner)
                .count();
            if owned >= limit {
                debug!(player = %owner, owned, limit, "Claim limit reached");
                metrics::claim_refused("access");
                return Ok(ClaimOutcome::Refused(ActionResponse::failed(FailureReason::Access)));
            }
        }

        let mut id = RegionId::generate();
        while index.by_id.contains_key(&id) || index.by_name.contains_key(&id.to_string()) {
            id = RegionId::generate();
        }

        drop(index);

        let region = Region::new(id, owner, volume, Timestamp::now());
        self.store.insert_region(&region)?;

        info!(
            region = %region.id,
            owner = %region.owner(),
            anchor = ?region.anchor(),
            radius = region.volume.radius,
            "Region created"
        );
        metrics::claim_created();

        let shared = self.write_index()?.insert(region);
        Ok(ClaimOutcome::Created(shared))
    }

    /// Remove a claim from the store and from every index
    pub fn delete_region(&self, id: &RegionId) -> RegionResult<ActionResponse> {
        let _writer = self.writer.lock().map_err(handle_poison)?;

        let shared = match self.read_index()?.by_id.get(id) {
            Some(region) => Arc::clone(region),
            None => return Ok(ActionResponse::failed(FailureReason::NotFound)),
        };

        self.store.delete_region(id)?;

        {
            let mut index = self.write_index()?;
            let region = shared.read().map_err(handle_poison)?;
            index.remove(&region);
        }

        self.dirty.lock().unwrap_or_else(PoisonError::into_inner).remove(id);

        info!(region = %id, "Region deleted");
        metrics::claim_deleted();

        Ok(ActionResponse::Successful)
    }

    /// Rename a claim.
    ///
    /// Fails with "length" outside 1..=36 characters, "exists" when another
    /// claim holds the name and "not-found" for an unknown id.
    pub fn rename(&self, id: &RegionId, name: &str) -> RegionResult<ActionResponse> {
        let validation = validate_name(name);
        if !validation.is_successful() {
            return Ok(validation);
        }

        let _writer = self.writer.lock().map_err(handle_poison)?;

        let shared = {
            let index = self.read_index()?;
            let shared = match index.by_id.get(id) {
                Some(region) => Arc::clone(region),
                None => return Ok(ActionResponse::failed(FailureReason::NotFound)),
            };

            match index.by_name.get(name) {
                Some(holder) if holder == id => return Ok(ActionResponse::Successful),
                Some(_) => return Ok(ActionResponse::failed(FailureReason::Exists)),
                None => {}
            }
            shared
        };

        self.store.update_name(id, name)?;

        let previous = {
            let mut index = self.write_index()?;
            let mut region = shared.write().map_err(handle_poison)?;
            let previous = std::mem::replace(&mut region.name, name.to_string());
            index.by_name.remove(&previous);
            index.by_name.insert(name.to_string(), *id);
            previous
        };

        info!(region = %id, from = %previous, to = %name, "Region renamed");
        metrics::claim_renamed();

        Ok(ActionResponse::Successful)
    }

    /// Queue a region's staff for the next flush
    pub fn mark_dirty(&self, id: &RegionId) {
        self.dirty
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*id);
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Persist the staff of every dirty region.
    ///
    /// Each region is saved under its own read lock, so lookups proceed
    /// while the store writes. Regions whose save fails stay dirty and are
    /// reported in `FlushReport::failed`.
    pub fn flush_dirty(&self) -> RegionResult<FlushReport> {
        let started = Instant::now();
        let pending: Vec<RegionId> = {
            let mut dirty = self.dirty.lock().map_err(handle_poison)?;
            dirty.drain().collect()
        };

        let mut report = FlushReport::default();
        for id in pending {
            let Some(shared) = self.region(&id) else {
                continue;
            };
            let saved = {
                let region = shared.read().map_err(handle_poison)?;
                self.store.save_staff(&id, &region.staff)
            };

            match saved {
                Ok(()) => report.saved += 1,
                Err(StorageError::Missing(_)) if self.region(&id).is_none() => {
                    debug!(region = %id, "Region deleted before its staff was saved");
                }
                Err(err) => {
                    warn!(region = %id, error = %err, "Failed to save region staff");
                    report.failed.push(id);
                }
            }
        }

        if !report.failed.is_empty() {
            let mut dirty = self.dirty.lock().map_err(handle_poison)?;
            dirty.extend(report.failed.iter().copied());
        }

        if report.saved > 0 || !report.failed.is_empty() {
            debug!(saved = report.saved, failed = report.failed.len(), "Flushed dirty regions");
        }
        metrics::flush_completed(started, report.failed.len());

        Ok(report)
    }
}
