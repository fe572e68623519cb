use crate::layout::{FlexContainer, FlexItem, LayoutSolver};
use crate::field::NoiseField;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tilestream_assets::{BuildingModels, BuildingVariant, FloorTextures};
use tilestream_common::{Aabb, Edge, TileId};

/// Errors from tile generation.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("no building model for {0}")]
    MissingModel(BuildingVariant),
    #[error("layout solver returned {got} placements for {expected} children")]
    Layout { expected: usize, got: usize },
    #[error("invalid tile config: {0}")]
    InvalidConfig(String),
}

/// Tile geometry parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Blocks per tile side.
    pub num_house_blocks: usize,
    pub house_block_size: f64,
    /// Margin around each block.
    pub house_margin: f64,
    pub houses_per_block_side: usize,
    /// Margin around each house.
    pub house_spacing: f64,
    /// Shift applied to every block so house origins line up with their
    /// layout boxes.
    pub centroid_offset: f64,
    pub floor_depth: f64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            num_house_blocks: 10,
            house_block_size: 10.0,
            house_margin: 1.0,
            houses_per_block_side: 3,
            house_spacing: 0.3,
            centroid_offset: 1.2,
            floor_depth: 0.02,
        }
    }
}

impl TileConfig {
    /// Side length of a tile.
    pub fn size(&self) -> f64 {
        let n = self.num_house_blocks as f64;
        n * self.house_block_size + n * self.house_margin * 2.0
    }

    pub fn validate(&self) -> Result<(), TileError> {
        if self.num_house_blocks == 0 {
            return Err(TileError::InvalidConfig("num_house_blocks must be at least 1".into()));
        }
        if self.houses_per_block_side == 0 {
            return Err(TileError::InvalidConfig("houses_per_block_side must be at least 1".into()));
        }
        if !(self.house_block_size > 0.0) {
            return Err(TileError::InvalidConfig(format!(
                "house_block_size must be positive, got {}",
                self.house_block_size
            )));
        }
        let lengths = [
            ("house_block_size", self.house_block_size),
            ("house_margin", self.house_margin),
            ("house_spacing", self.house_spacing),
            ("centroid_offset", self.centroid_offset),
            ("floor_depth", self.floor_depth),
        ];
        if let Some((name, value)) = lengths.iter().find(|(_, v)| !v.is_finite()) {
            return Err(TileError::InvalidConfig(format!("{name} must be finite, got {value}")));
        }
        if self.house_margin < 0.0 || self.house_spacing < 0.0 {
            return Err(TileError::InvalidConfig("margins must not be negative".into()));
        }
        // Grid keys divide by the tile size.
        let size = self.size();
        if !(size.is_finite() && size > 0.0) {
            return Err(TileError::InvalidConfig(format!("tile size must be finite and positive, got {size}")));
        }
        Ok(())
    }
}

/// One building slot.
#[derive(Debug, Clone, PartialEq)]
pub struct House {
    pub variant: BuildingVariant,
    /// Position of the model origin (bottom center) inside its block.
    pub offset: DVec3,
    pub footprint: [f64; 2],
    pub height: f64,
}

impl House {
    fn local_bounds(&self) -> Aabb {
        let half = DVec3::new(self.footprint[0] / 2.0, self.height / 2.0, self.footprint[1] / 2.0);
        Aabb::from_center_half_extents(self.offset + DVec3::new(0.0, self.height / 2.0, 0.0), half)
    }
}

/// A cell of the tile grid holding a small grid of houses.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseBlock {
    pub row: usize,
    pub column: usize,
    pub edge: Option<Edge>,
    /// Offset from the tile origin.
    pub offset: DVec3,
    /// Row-major, `houses_per_block_side²` entries.
    pub houses: Vec<House>,
}

impl HouseBlock {
    /// Bounds relative to the tile origin.
    pub fn local_bounds(&self) -> Option<Aabb> {
        self.houses
            .iter()
            .map(House::local_bounds)
            .reduce(|a, b| a.union(&b))
            .map(|b| b.translate(self.offset))
    }
}

/// An outer-ring block that participates in edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrustumableItem {
    /// Index into [`Tile::blocks`].
    pub block: usize,
    pub edge: Edge,
}

/// Ground plane under a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Floor {
    pub size: f64,
    pub depth: f64,
    pub textures: FloorTextures,
}

/// A generated square of city.
#[derive(Debug, Clone)]
pub struct Tile {
    id: TileId,
    position: DVec3,
    size: f64,
    blocks: Vec<HouseBlock>,
    frustumable: Vec<FrustumableItem>,
    floor: Floor,
}

impl Tile {
    /// Generate the content of the tile centered at `position`.
    pub fn generate(
        position: DVec3,
        config: &TileConfig,
        models: &BuildingModels,
        textures: &FloorTextures,
        noise: &dyn NoiseField,
        layout: &dyn LayoutSolver,
    ) -> Result<Self, TileError> {
        config.validate()?;
        let start = Instant::now();
        let n = config.num_house_blocks;
        let size = config.size();

        let mut blocks = Vec::with_capacity(n * n);
        let mut frustumable = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let edge = Edge::classify(i, j, n);
                let seed = position + DVec3::new(i as f64, 0.0, j as f64);
                if let Some(edge) = edge {
                    frustumable.push(FrustumableItem { block: blocks.len(), edge });
                }
                blocks.push(build_block(i, j, edge, seed, config, models, noise, layout)?);
            }
        }

        let container = FlexContainer::space_between(
            blocks
                .iter()
                .map(|_| FlexItem {
                    width: config.house_block_size,
                    height: config.house_block_size,
                    margin: config.house_margin,
                })
                .collect(),
        );
        let placements = layout.calculate(&container, size, size);
        if placements.len() != blocks.len() {
            return Err(TileError::Layout {
                expected: blocks.len(),
                got: placements.len(),
            });
        }
        let shift = config.centroid_offset - size / 2.0;
        for (block, placed) in blocks.iter_mut().zip(placements) {
            block.offset = DVec3::new(placed.left + shift, 0.0, placed.top + shift);
        }

        let tile = Self {
            id: TileId::new(),
            position,
            size,
            blocks,
            frustumable,
            floor: Floor {
                size,
                depth: config.floor_depth,
                textures: textures.clone(),
            },
        };
        tracing::trace!(
            tile = %tile.id.short(),
            x = position.x,
            z = position.z,
            elapsed_us = start.elapsed().as_micros() as u64,
            "tile generated"
        );
        Ok(tile)
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn blocks(&self) -> &[HouseBlock] {
        &self.blocks
    }

    pub fn frustumable(&self) -> &[FrustumableItem] {
        &self.frustumable
    }

    pub fn floor(&self) -> &Floor {
        &self.floor
    }

    /// Flat square covered by this tile.
    pub fn region(&self) -> Aabb {
        Aabb::ground_region(self.position, self.size)
    }

    /// World-space bounds of a block, derived from the current position.
    pub fn block_bounds(&self, index: usize) -> Option<Aabb> {
        self.blocks
            .get(index)?
            .local_bounds()
            .map(|b| b.translate(self.position))
    }

    /// World-space bounds of every frustumable item, in item order.
    pub fn frustumable_bounds(&self) -> impl Iterator<Item = (Edge, Aabb)> + '_ {
        self.frustumable
            .iter()
            .filter_map(|item| Some((item.edge, self.block_bounds(item.block)?)))
    }

    /// Variant of every house, block-major.
    pub fn variants(&self) -> impl Iterator<Item = BuildingVariant> + '_ {
        self.blocks.iter().flat_map(|b| b.houses.iter().map(|h| h.variant))
    }
}

#[allow(clippy::too_many_arguments)]
fn build_block(
    row: usize,
    column: usize,
    edge: Option<Edge>,
    seed: DVec3,
    config: &TileConfig,
    models: &BuildingModels,
    noise: &dyn NoiseField,
    layout: &dyn LayoutSolver,
) -> Result<HouseBlock, TileError> {
    let m = config.houses_per_block_side;
    let mut houses = Vec::with_capacity(m * m);
    for hi in 0..m {
        for hj in 0..m {
            let (hi, hj) = (hi as f64, hj as f64);
            let value = noise.normalized((seed.x + hi) * hi, (seed.z + hj) * hj);
            let variant = BuildingVariant::from_noise(value);
            let model = models.get(variant).ok_or(TileError::MissingModel(variant))?;
            houses.push(House {
                variant,
                offset: DVec3::ZERO,
                footprint: model.footprint,
                height: model.height,
            });
        }
    }

    let container = FlexContainer::space_between(
        houses
            .iter()
            .map(|h| FlexItem {
                width: h.footprint[0],
                height: h.footprint[1],
                margin: config.house_spacing,
            })
            .collect(),
    );
    let placements = layout.calculate(&container, config.house_block_size, config.house_block_size);
    if placements.len() != houses.len() {
        return Err(TileError::Layout {
            expected: houses.len(),
            got: placements.len(),
        });
    }
    for (house, placed) in houses.iter_mut().zip(placements) {
        house.offset = DVec3::new(placed.left, 0.0, placed.top);
    }

    Ok(HouseBlock {
        row,
        column,
        edge,
        offset: DVec3::ZERO,
        houses,
    })
}
