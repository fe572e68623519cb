use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Compass edge of a square tile.
///
/// The world is viewed from an isometric corner, so the cardinal names label
/// the tile's corners and the intercardinal names label its sides:
///
/// ```text
///            -z
///   North  NorthEast  East
///   NorthWest        SouthEast
///   West   SouthWest  South
///            +z
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Edge {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Edge {
    pub const ALL: [Edge; 8] = [
        Edge::North,
        Edge::NorthEast,
        Edge::East,
        Edge::SouthEast,
        Edge::South,
        Edge::SouthWest,
        Edge::West,
        Edge::NorthWest,
    ];

    /// Lattice step `(dx, dz)` towards the neighbor across this edge.
    pub fn unit_offset(self) -> (i8, i8) {
        match self {
            Edge::North => (-1, -1),
            Edge::NorthEast => (0, -1),
            Edge::East => (1, -1),
            Edge::SouthEast => (1, 0),
            Edge::South => (1, 1),
            Edge::SouthWest => (0, 1),
            Edge::West => (-1, 1),
            Edge::NorthWest => (-1, 0),
        }
    }

    pub fn opposite(self) -> Edge {
        match self {
            Edge::North => Edge::South,
            Edge::NorthEast => Edge::SouthWest,
            Edge::East => Edge::West,
            Edge::SouthEast => Edge::NorthWest,
            Edge::South => Edge::North,
            Edge::SouthWest => Edge::NorthEast,
            Edge::West => Edge::East,
            Edge::NorthWest => Edge::SouthEast,
        }
    }

    /// Edge tag of cell `(row, column)` in an `n × n` grid, or `None` for
    /// interior cells. Rows run from -z to +z, columns from -x to +x.
    pub fn classify(row: usize, column: usize, n: usize) -> Option<Edge> {
        let last = n.checked_sub(1)?;
        if row >= n || column >= n {
            return None;
        }
        let edge = if row == 0 {
            if column == 0 {
                Edge::North
            } else if column == last {
                Edge::East
            } else {
                Edge::NorthEast
            }
        } else if row == last {
            if column == 0 {
                Edge::West
            } else if column == last {
                Edge::South
            } else {
                Edge::SouthWest
            }
        } else if column == 0 {
            Edge::NorthWest
        } else if column == last {
            Edge::SouthEast
        } else {
            return None;
        };
        Some(edge)
    }
}

/// Center of the tile adjacent to `position` across `edge`.
///
/// Offsets are whole multiples of `size` added to each axis; Y is unchanged.
pub fn neighbor_position(edge: Edge, position: DVec3, size: f64) -> DVec3 {
    let (dx, dz) = edge.unit_offset();
    DVec3::new(
        position.x + f64::from(dx) * size,
        position.y,
        position.z + f64::from(dz) * size,
    )
}
