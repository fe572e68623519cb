//! Tile content: the unit of generated world.
//!
//! A tile is an `N × N` grid of house blocks. Each block holds a small grid
//! of houses whose building variant is picked from a seeded noise field,
//! and both levels are positioned by a flex row-wrap layout.
//!
//! # Invariants
//! - Content is a pure function of position, config, models and noise seed.
//! - Only the outer ring of blocks is frustumable.
//! - World-space bounds are derived from the tile position on every query.
//!
//! # Workaround
//! [`FlexRowWrap`] is a workaround for a full flexbox engine. It handles
//! the one container shape tiles use (row direction, wrapping, margins,
//! `space-between` on both axes) and nothing else. Callers needing more
//! plug their own solver in through [`LayoutSolver`].

pub mod layout;
pub mod field;
mod tile;

pub use layout::{AlignContent, ComputedLayout, FlexContainer, FlexItem, FlexRowWrap, Justify, LayoutSolver};
pub use field::{NoiseField, SimplexField, normalize_noise};
pub use tile::{Floor, FrustumableItem, House, HouseBlock, Tile, TileConfig, TileError};

pub fn crate_info() -> &'static str {
    "tilestream-tile v0.1.0"
}
