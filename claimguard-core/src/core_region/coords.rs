//! World coordinates and the cubic claim volume built around them

use super::types::WorldId;
use serde::{Deserialize, Serialize};

/// A block position bound to a world
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldCoordinate {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldCoordinate {
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        WorldCoordinate { world, x, y, z }
    }

    /// Shift by the given deltas, clamping at the i32 range
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        WorldCoordinate {
            world: self.world.clone(),
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

/// Axis-aligned cube of side `2 * radius + 1` centred on a claim anchor.
///
/// Bounds are inclusive on every axis; `radius` describes a cube, not a sphere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub center: WorldCoordinate,
    pub radius: u32,
}

impl Volume {
    pub fn new(center: WorldCoordinate, radius: u32) -> Self {
        Volume { center, radius }
    }

    pub fn world(&self) -> &WorldId {
        &self.center.world
    }

    /// Lowest corner (inclusive)
    pub fn min(&self) -> WorldCoordinate {
        let r = clamp_radius(self.radius);
        self.center.offset(-r, -r, -r)
    }

    /// Highest corner (inclusive)
    pub fn max(&self) -> WorldCoordinate {
        let r = clamp_radius(self.radius);
        self.center.offset(r, r, r)
    }

    /// True iff `point` lies in the same world and within `radius` of the
    /// centre on every axis.
    pub fn contains(&self, point: &WorldCoordinate) -> bool {
        if point.world != self.center.world {
            return false;
        }
        let r = i64::from(self.radius);
        axis_distance(point.x, self.center.x) <= r
            && axis_distance(point.y, self.center.y) <= r
            && axis_distance(point.z, self.center.z) <= r
    }

    /// True iff the two cubes share at least one block
    pub fn intersects(&self, other: &Volume) -> bool {
        if self.center.world != other.center.world {
            return false;
        }
        let reach = i64::from(self.radius) + i64::from(other.radius);
        axis_distance(self.center.x, other.center.x) <= reach
            && axis_distance(self.center.y, other.center.y) <= reach
            && axis_distance(self.center.z, other.center.z) <= reach
    }

    /// Number of blocks enclosed
    pub fn block_count(&self) -> u128 {
        let side = 2 * u128::from(self.radius) + 1;
        side * side * side
    }
}

fn axis_distance(a: i32, b: i32) -> i64 {
    (i64::from(a) - i64::from(b)).abs()
}

fn clamp_radius(radius: u32) -> i32 {
    i32::try_from(radius).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: i32, y: i32, z: i32) -> WorldCoordinate {
        WorldCoordinate::new(WorldId::new("w"), x, y, z)
    }

    #[test]
    fn test_contains_edge_of_radius() {
        let volume = Volume::new(at(100, 64, 100), 5);
        assert!(volume.contains(&at(105, 64, 100)));
        assert!(!volume.contains(&at(106, 64, 100)));
        assert!(volume.contains(&at(95, 59, 105)));
        assert!(!volume.contains(&at(100, 58, 100)));
    }

    #[test]
    fn test_contains_requires_same_world() {
        let volume = Volume::new(at(0, 0, 0), 10);
        let elsewhere = WorldCoordinate::new(WorldId::new("nether"), 0, 0, 0);
        assert!(!volume.contains(&elsewhere));
    }

    #[test]
    fn test_zero_radius_is_single_block() {
        let volume = Volume::new(at(3, 4, 5), 0);
        assert!(volume.contains(&at(3, 4, 5)));
        assert!(!volume.contains(&at(3, 4, 6)));
        assert_eq!(volume.block_count(), 1);
    }

    #[test]
    fn test_bounds() {
        let volume = Volume::new(at(10, 20, 30), 3);
        assert_eq!(volume.min(), at(7, 17, 27));
        assert_eq!(volume.max(), at(13, 23, 33));
        assert_eq!(volume.block_count(), 343);
    }

    #[test]
    fn test_bounds_saturate_at_extremes() {
        let volume = Volume::new(at(i32::MAX, i32::MIN, 0), 10);
        assert_eq!(volume.max().x, i32::MAX);
        assert_eq!(volume.min().y, i32::MIN);
        assert!(volume.contains(&at(i32::MAX, i32::MIN, 10)));
    }

    #[test]
    fn test_intersects() {
        let a = Volume::new(at(0, 64, 0), 5);
        let touching = Volume::new(at(10, 64, 0), 5);
        let apart = Volume::new(at(11, 64, 0), 5);
        assert!(a.intersects(&touching));
        assert!(!a.intersects(&apart));

        let other_world = Volume::new(WorldCoordinate::new(WorldId::new("end"), 0, 64, 0), 5);
        assert!(!a.intersects(&other_world));
    }
}
