//! In-process claim store

use super::super::region::Region;
use super::super::staff::StaffRegistry;
use super::super::types::RegionId;
use super::{RegionStore, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Claim store kept in memory.
///
/// Mirrors the SQL store's constraints (unique ids and names) and can be
/// told to fail every write, which lets callers exercise their rollback
/// paths.
#[derive(Default)]
pub struct MemoryRegionStore {
    rows: RwLock<Vec<Region>>,
    fail_writes: AtomicBool,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `StorageError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn with_rows<T>(&self, f: impl FnOnce(&mut Vec<Region>) -> StorageResult<T>) -> StorageResult<T> {
        self.check_writable()?;
        let mut rows = self.rows.write().map_err(handle_poison)?;
        f(&mut rows)
    }
}

fn handle_poison<T>(_err: PoisonError<T>) -> StorageError {
    StorageError::Unavailable("memory store lock poisoned".to_string())
}

impl RegionStore for MemoryRegionStore {
    fn ensure_schema(&self) -> StorageResult<()> {
        Ok(())
    }

    fn insert_region(&self, region: &Region) -> StorageResult<()> {
        self.with_rows(|rows| {
            if rows.iter().any(|r| r.id == region.id || r.name == region.name) {
                return Err(StorageError::Unavailable(format!(
                    "region {} conflicts with a stored row",
                    region.id
                )));
            }
            rows.push(region.clone());
            Ok(())
        })
    }

    fn update_name(&self, id: &RegionId, name: &str) -> StorageResult<()> {
        self.with_rows(|rows| {
            if rows.iter().any(|r| r.id != *id && r.name == name) {
                return Err(StorageError::Unavailable(format!("name '{}' is taken", name)));
            }
            let row = rows
                .iter_mut()
                .find(|r| r.id == *id)
                .ok_or(StorageError::Missing(*id))?;
            row.name = name.to_string();
            Ok(())
        })
    }

    fn find_region_by_name(&self, name: &str) -> StorageResult<Option<RegionId>> {
        let rows = self.rows.read().map_err(handle_poison)?;
        Ok(rows.iter().find(|r| r.name == name).map(|r| r.id))
    }

    fn save_staff(&self, id: &RegionId, staff: &StaffRegistry) -> StorageResult<()> {
        self.with_rows(|rows| {
            let row = rows
                .iter_mut()
                .find(|r| r.id == *id)
                .ok_or(StorageError::Missing(*id))?;
            row.staff = staff.clone();
            Ok(())
        })
    }

    fn delete_region(&self, id: &RegionId) -> StorageResult<()> {
        self.with_rows(|rows| {
            let before = rows.len();
            rows.retain(|r| r.id != *id);
            if rows.len() == before {
                return Err(StorageError::Missing(*id));
            }
            Ok(())
        })
    }

    fn load_regions(&self) -> StorageResult<Vec<Region>> {
        let rows = self.rows.read().map_err(handle_poison)?;
        Ok(rows.clone())
    }
}
