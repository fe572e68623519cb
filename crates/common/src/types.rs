use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a streamed tile.
///
/// A disposed tile's id is never reused: revisiting the same grid position
/// later creates a fresh tile with a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub Uuid);

impl TileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and debug output.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for TileId {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer lattice coordinate of a tile center on the XZ plane.
///
/// Tile centers are always produced by adding or subtracting whole multiples
/// of the tile size, so `position / size` lands on an integer up to rounding.
/// Keying the live set on this lattice gives exact deduplication without an
/// epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridKey {
    pub x: i64,
    pub z: i64,
}

impl GridKey {
    pub fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }

    /// Snap a world position to the lattice defined by `size`.
    pub fn from_position(position: DVec3, size: f64) -> Self {
        Self {
            x: (position.x / size).round() as i64,
            z: (position.z / size).round() as i64,
        }
    }

    /// World-space center of this lattice cell (Y = 0).
    pub fn to_position(self, size: f64) -> DVec3 {
        DVec3::new(self.x as f64 * size, 0.0, self.z as f64 * size)
    }
}

/// World-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the given half extents.
    pub fn from_center_half_extents(center: DVec3, half: DVec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Flat square footprint of a tile on the ground plane.
    pub fn ground_region(center: DVec3, size: f64) -> Self {
        let half = size / 2.0;
        Self {
            min: DVec3::new(center.x - half, 0.0, center.z - half),
            max: DVec3::new(center.x + half, 0.0, center.z + half),
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn translate(&self, offset: DVec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Strict overlap test; boxes that only touch do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_id_uniqueness() {
        let a = TileId::new();
        let b = TileId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn grid_key_snaps_multiples_of_size() {
        let size = 120.0;
        let key = GridKey::from_position(DVec3::new(-240.0, 0.0, 120.0), size);
        assert_eq!(key, GridKey::new(-2, 1));
        assert_eq!(key.to_position(size), DVec3::new(-240.0, 0.0, 120.0));
    }

    #[test]
    fn grid_key_absorbs_accumulated_drift() {
        let size = 0.1;
        let mut x = 0.0;
        for _ in 0..10 {
            x += size;
        }
        // 0.1 summed ten times is not exactly 1.0, but it is the same cell.
        assert_ne!(x, 1.0);
        assert_eq!(
            GridKey::from_position(DVec3::new(x, 0.0, 0.0), size),
            GridKey::from_position(DVec3::new(1.0, 0.0, 0.0), size)
        );
    }

    #[test]
    fn ground_region_is_flat_square() {
        let region = Aabb::ground_region(DVec3::new(20.0, 5.0, -20.0), 20.0);
        assert_eq!(region.min, DVec3::new(10.0, 0.0, -30.0));
        assert_eq!(region.max, DVec3::new(30.0, 0.0, -10.0));
        assert_eq!(region.size(), DVec3::new(20.0, 0.0, 20.0));
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = Aabb::ground_region(DVec3::ZERO, 20.0);
        let b = Aabb::ground_region(DVec3::new(20.0, 0.0, 0.0), 20.0);
        assert!(!a.overlaps(&b));
        let c = Aabb::ground_region(DVec3::new(19.0, 0.0, 0.0), 20.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn union_and_translate() {
        let a = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let b = Aabb::new(DVec3::splat(2.0), DVec3::splat(3.0));
        let u = a.union(&b);
        assert_eq!(u.min, DVec3::ZERO);
        assert_eq!(u.max, DVec3::splat(3.0));
        assert_eq!(u.center(), DVec3::splat(1.5));
        let moved = a.translate(DVec3::new(1.0, 0.0, -1.0));
        assert_eq!(moved.min, DVec3::new(1.0, 0.0, -1.0));
    }
}
