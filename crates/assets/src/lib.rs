//! Asset catalog for tile content: building models and floor textures.
//!
//! The streamer never loads files itself. A loader announces each asset set
//! once on its topic ([`GLTF_LOAD`], [`TEXTURE_LOAD`]); the first payload on
//! each topic is the one that counts.
//!
//! # Layout
//! A model manifest is a JSON document listing one entry per building
//! variant with its footprint and height in world units.

mod variant;

pub use variant::BuildingVariant;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tilestream_bus::Topic;

/// Topic carrying the floor texture set once it is ready.
pub const TEXTURE_LOAD: Topic<FloorTextures> = Topic::new("textureLoad$");

/// Topic carrying the building model catalog once it is ready.
pub const GLTF_LOAD: Topic<BuildingModels> = Topic::new("gltfLoad$");

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest has no model for {0}")]
    MissingVariant(BuildingVariant),
    #[error("model {variant} has invalid dimensions: footprint {footprint:?}, height {height}")]
    InvalidModel {
        variant: BuildingVariant,
        footprint: [f64; 2],
        height: f64,
    },
}

/// Dimensions of one building model, measured from its mesh bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingModel {
    pub variant: BuildingVariant,
    pub name: String,
    /// Extent along X and Z.
    pub footprint: [f64; 2],
    pub height: f64,
}

#[derive(Debug, Deserialize, Serialize)]
struct Manifest {
    models: Vec<BuildingModel>,
}

/// Complete set of building models, one per variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingModels {
    models: BTreeMap<BuildingVariant, BuildingModel>,
}

impl BuildingModels {
    /// Build a catalog, rejecting incomplete or degenerate model sets.
    pub fn new(models: impl IntoIterator<Item = BuildingModel>) -> Result<Self, AssetError> {
        let models: BTreeMap<_, _> = models.into_iter().map(|m| (m.variant, m)).collect();
        for variant in BuildingVariant::ALL {
            let model = models.get(&variant).ok_or(AssetError::MissingVariant(variant))?;
            let [w, d] = model.footprint;
            if !(w > 0.0 && d > 0.0 && model.height >= 0.0) {
                return Err(AssetError::InvalidModel {
                    variant,
                    footprint: model.footprint,
                    height: model.height,
                });
            }
        }
        Ok(Self { models })
    }

    /// Built-in catalog matching the bundled low-poly house set.
    pub fn builtin() -> Self {
        let models = BuildingVariant::ALL.map(|variant| {
            let footprint = match variant {
                BuildingVariant::OneStoryB | BuildingVariant::ThreeStoryB => [2.2, 2.4],
                BuildingVariant::TwoStoryB | BuildingVariant::FourStoryB => [2.4, 2.2],
                _ => [2.4, 2.4],
            };
            BuildingModel {
                variant,
                name: variant.asset_name().to_string(),
                footprint,
                height: variant.stories() as f64 * 1.6 + 0.8,
            }
        });
        Self {
            models: models.into_iter().map(|m| (m.variant, m)).collect(),
        }
    }

    /// Same footprint and height for every variant. Handy for small tiles.
    pub fn uniform(footprint: [f64; 2], height: f64) -> Result<Self, AssetError> {
        Self::new(BuildingVariant::ALL.map(|variant| BuildingModel {
            variant,
            name: variant.asset_name().to_string(),
            footprint,
            height,
        }))
    }

    pub fn get(&self, variant: BuildingVariant) -> Option<&BuildingModel> {
        self.models.get(&variant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildingModel> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Load a catalog from a JSON manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let manifest: Manifest = serde_json::from_reader(file)?;
        let catalog = Self::new(manifest.models)?;
        tracing::debug!(path = %path.as_ref().display(), models = catalog.len(), "model manifest loaded");
        Ok(catalog)
    }

    /// Write the catalog as a JSON manifest.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        let manifest = Manifest {
            models: self.models.values().cloned().collect(),
        };
        serde_json::to_writer_pretty(file, &manifest)?;
        Ok(())
    }
}

/// Texture set for the ground plane under each tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorTextures {
    pub base_color: String,
    pub ambient_occlusion: String,
    pub height: String,
    pub normal: String,
    pub roughness: String,
}

impl Default for FloorTextures {
    fn default() -> Self {
        Self {
            base_color: "textures/hexTile/baseColor.png".into(),
            ambient_occlusion: "textures/hexTile/ambientOcclusion.png".into(),
            height: "textures/hexTile/height.png".into(),
            normal: "textures/hexTile/normal.png".into(),
            roughness: "textures/hexTile/roughness.png".into(),
        }
    }
}

pub fn crate_info() -> &'static str {
    "tilestream-assets v0.1.0"
}
