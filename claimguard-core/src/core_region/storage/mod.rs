//! Storage layer for claims
//!
//! `RegionStore` is the persistence contract the region manager writes
//! through. `RegionSqlStore` keeps claims in SQLite; `MemoryRegionStore`
//! keeps them in process for tests and for hosts that bring their own
//! database layer.

pub mod memory;
pub mod migrations;
pub mod sql_store;

pub use memory::MemoryRegionStore;
pub use migrations::{migrate, CURRENT_CLAIM_SCHEMA_VERSION};
pub use sql_store::RegionSqlStore;

use super::region::Region;
use super::staff::StaffRegistry;
use super::types::RegionId;
use thiserror::Error;

/// Errors raised by a claim store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Region {0} is missing from the store")]
    Missing(RegionId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator for the region manager.
///
/// Every write is atomic: either the whole record change lands or none of it.
pub trait RegionStore: Send + Sync {
    /// Create the tables if they are absent
    fn ensure_schema(&self) -> StorageResult<()>;

    /// Insert the region row, its anchor row and its staff rows
    fn insert_region(&self, region: &Region) -> StorageResult<()>;

    /// Change the stored name of a region
    fn update_name(&self, id: &RegionId, name: &str) -> StorageResult<()>;

    /// Id of the region stored under `name`, if any
    fn find_region_by_name(&self, name: &str) -> StorageResult<Option<RegionId>>;

    /// Replace the stored staff of a region
    fn save_staff(&self, id: &RegionId, staff: &StaffRegistry) -> StorageResult<()>;

    /// Remove every row belonging to a region; `Missing` if there is none
    fn delete_region(&self, id: &RegionId) -> StorageResult<()>;

    /// All regions, in insertion order
    fn load_regions(&self) -> StorageResult<Vec<Region>>;
}
