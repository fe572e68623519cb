//! Shared vocabulary for the tile streamer.
//!
//! # Invariants
//! - Neighbor addressing is a bijection over the eight compass edges.
//! - Grid keys are derived from exact multiples of the tile size, never
//!   compared with an epsilon.

pub mod edge;
pub mod types;

pub use edge::{Edge, neighbor_position};
pub use types::{Aabb, GridKey, TileId};
