//! SQL-based storage implementation for claims

use super::super::coords::{Volume, WorldCoordinate};
use super::super::region::Region;
use super::super::staff::StaffRegistry;
use super::super::types::{PlayerId, RegionId, Timestamp, WorldId};
use super::{RegionStore, StorageError, StorageResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;

/// Staff rows grouped per region: officers, members, pending with issue time
type StaffRows = (Vec<PlayerId>, Vec<PlayerId>, Vec<(PlayerId, Timestamp)>);

/// SQLite-backed claim store
pub struct RegionSqlStore {
    pool: Pool<SqliteConnectionManager>,
}

impl RegionSqlStore {
    /// Create a store over an existing pool and bring the schema up to date
    pub fn new(pool: Pool<SqliteConnectionManager>) -> StorageResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, pool_size: u32) -> StorageResult<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;
        Self::new(pool)
    }

    /// In-memory database. The pool holds a single connection so every
    /// caller sees the same database.
    pub fn memory() -> StorageResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    fn write_staff(tx: &Transaction<'_>, id: &RegionId, staff: &StaffRegistry) -> StorageResult<()> {
        let uuid = id.to_string();
        tx.execute("DELETE FROM region_staff WHERE uuid = ?", params![uuid])?;

        let rows = staff
            .officers()
            .iter()
            .map(|p| (p, "Officer", None))
            .chain(staff.members().iter().map(|p| (p, "Member", None)))
            .chain(
                staff
                    .pending_since()
                    .map(|(p, issued)| (p, "Invited", Some(issued.as_millis() as i64))),
            );

        let mut stmt = tx
            .prepare("INSERT INTO region_staff (uuid, player, role, issued) VALUES (?, ?, ?, ?)")?;
        for (player, role, issued) in rows {
            stmt.execute(params![uuid, player.as_str(), role, issued])?;
        }
        Ok(())
    }

    fn load_staff(&self) -> StorageResult<HashMap<String, StaffRows>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT uuid, player, role, issued FROM region_staff")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut grouped: HashMap<String, StaffRows> = HashMap::new();
        for row in rows {
            let (uuid, player, role, issued) = row?;
            let entry = grouped.entry(uuid).or_default();
            let player = PlayerId::new(player);
            match role.as_str() {
                "Officer" => entry.0.push(player),
                "Member" => entry.1.push(player),
                "Invited" => {
                    // Unstamped rows count from load time
                    let issued = issued
                        .and_then(|millis| u64::try_from(millis).ok())
                        .map(Timestamp::from_millis)
                        .unwrap_or_else(Timestamp::now);
                    entry.2.push((player, issued));
                }
                other => return Err(StorageError::Corrupt(format!("unknown staff role '{}'", other))),
            }
        }
        Ok(grouped)
    }
}

/// Raw columns of a joined region/anchor row
struct RegionRow {
    uuid: String,
    name: String,
    owner: String,
    created: i64,
    radius: i64,
    x: i32,
    y: i32,
    z: i32,
    world: String,
}

impl RegionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RegionRow {
            uuid: row.get(0)?,
            name: row.get(1)?,
            owner: row.get(2)?,
            created: row.get(3)?,
            radius: row.get(4)?,
            x: row.get(5)?,
            y: row.get(6)?,
            z: row.get(7)?,
            world: row.get(8)?,
        })
    }

    fn into_region(self, staff: Option<StaffRows>) -> StorageResult<Region> {
        let id = RegionId::parse(&self.uuid)
            .ok_or_else(|| StorageError::Corrupt(format!("invalid region uuid '{}'", self.uuid)))?;
        let radius = u32::try_from(self.radius).map_err(|_| {
            StorageError::Corrupt(format!("region {} has radius {}", id, self.radius))
        })?;
        let created = u64::try_from(self.created).unwrap_or(0);

        let center = WorldCoordinate::new(WorldId::new(self.world), self.x, self.y, self.z);
        let (officers, members, pending) = staff.unwrap_or_default();

        Ok(Region {
            id,
            name: self.name,
            volume: Volume::new(center, radius),
            staff: StaffRegistry::from_parts(PlayerId::new(self.owner), officers, members, pending),
            created_at: Timestamp::from_millis(created),
        })
    }
}

impl RegionStore for RegionSqlStore {
    fn ensure_schema(&self) -> StorageResult<()> {
        super::migrations::migrate(&self.pool)
    }

    fn insert_region(&self, region: &Region) -> StorageResult<()> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let uuid = region.id.to_string();
        let anchor = region.anchor();

        tx.execute(
            "INSERT INTO regions (uuid, name, owner, created) VALUES (?, ?, ?, ?)",
            params![
                uuid,
                &region.name,
                region.owner().as_str(),
                region.created_at.as_millis() as i64,
            ],
        )?;

        tx.execute(
            "INSERT INTO claim_anchors (uuid, radius, x, y, z, world) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                uuid,
                i64::from(region.volume.radius),
                anchor.x,
                anchor.y,
                anchor.z,
                anchor.world.as_str(),
            ],
        )?;

        Self::write_staff(&tx, &region.id, &region.staff)?;

        tx.commit()?;
        Ok(())
    }

    fn update_name(&self, id: &RegionId, name: &str) -> StorageResult<()> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE regions SET name = ? WHERE uuid = ?",
            params![name, id.to_string()],
        )?;

        if changed == 0 {
            return Err(StorageError::Missing(*id));
        }
        Ok(())
    }

    fn find_region_by_name(&self, name: &str) -> StorageResult<Option<RegionId>> {
        let conn = self.pool.get()?;
        let uuid: Option<String> = conn
            .query_row("SELECT uuid FROM regions WHERE name = ?", params![name], |row| row.get(0))
            .optional()?;

        uuid.map(|raw| {
            RegionId::parse(&raw)
                .ok_or_else(|| StorageError::Corrupt(format!("invalid region uuid '{}'", raw)))
        })
        .transpose()
    }

    fn save_staff(&self, id: &RegionId, staff: &StaffRegistry) -> StorageResult<()> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        Self::write_staff(&tx, id, staff)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_region(&self, id: &RegionId) -> StorageResult<()> {
        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;
        let uuid = id.to_string();

        tx.execute("DELETE FROM region_staff WHERE uuid = ?", params![uuid])?;
        tx.execute("DELETE FROM claim_anchors WHERE uuid = ?", params![uuid])?;
        let removed = tx.execute("DELETE FROM regions WHERE uuid = ?", params![uuid])?;

        if removed == 0 {
            // Dropping the transaction rolls it back
            return Err(StorageError::Missing(*id));
        }
        tx.commit()?;
        Ok(())
    }

    fn load_regions(&self) -> StorageResult<Vec<Region>> {
        let mut staff = self.load_staff()?;

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT r.uuid, r.name, r.owner, r.created, a.radius, a.x, a.y, a.z, a.world
             FROM regions r
             JOIN claim_anchors a ON a.uuid = r.uuid
             ORDER BY r.id ASC",
        )?;

        let rows = stmt
            .query_map([], RegionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                let staff_rows = staff.remove(&row.uuid);
                row.into_region(staff_rows)
            })
            .collect()
    }
}
