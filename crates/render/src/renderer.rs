use std::collections::BTreeMap;
use std::fmt::Write as _;

use glam::DVec3;
use tilestream_common::TileId;
use tilestream_tile::Tile;

/// Camera summary printed in a frame header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    pub eye: DVec3,
    pub target: DVec3,
    pub zoom: f64,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: DVec3::splat(1000.0),
            target: DVec3::ZERO,
            zoom: 1.0,
        }
    }
}

/// Renderer-agnostic interface the streamer drives.
///
/// `attach` is called once per spawned tile, `detach` once per disposed
/// tile. Detaching an id that was never attached must be harmless.
pub trait Renderer {
    fn attach(&mut self, tile: &Tile);
    fn detach(&mut self, id: TileId);
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn attach(&mut self, tile: &Tile) {
        (**self).attach(tile)
    }

    fn detach(&mut self, id: TileId) {
        (**self).detach(id)
    }
}

/// What the recorder keeps for an attached tile.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub position: DVec3,
    pub size: f64,
    pub houses: usize,
    pub tallest: f64,
}

impl SceneNode {
    fn from_tile(tile: &Tile) -> Self {
        let houses = tile.blocks().iter().flat_map(|b| &b.houses);
        Self {
            position: tile.position(),
            size: tile.size(),
            houses: houses.clone().count(),
            tallest: houses.map(|h| h.height).fold(0.0, f64::max),
        }
    }
}

/// One attach or detach, in call order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneChange {
    Attached(TileId, DVec3),
    Detached(TileId),
}

/// Debug renderer: remembers the scene and prints it as text.
#[derive(Debug, Default)]
pub struct SceneRecorder {
    nodes: BTreeMap<TileId, SceneNode>,
    history: Vec<SceneChange>,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: TileId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn history(&self) -> &[SceneChange] {
        &self.history
    }

    /// Human-readable dump of the current scene, sorted by position.
    pub fn frame(&self, view: &RenderView) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Scene ({} tiles) ===", self.nodes.len());
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) zoom={:.2}",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z, view.zoom
        );

        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| {
            (a.1.position.z, a.1.position.x)
                .partial_cmp(&(b.1.position.z, b.1.position.x))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (id, node) in nodes {
            let _ = writeln!(
                out,
                "  [{}] pos=({:.1}, {:.1}) size={:.1} houses={} tallest={:.1}",
                id.short(),
                node.position.x,
                node.position.z,
                node.size,
                node.houses,
                node.tallest
            );
        }
        out
    }
}

impl Renderer for SceneRecorder {
    fn attach(&mut self, tile: &Tile) {
        let node = SceneNode::from_tile(tile);
        tracing::trace!(tile = %tile.id().short(), houses = node.houses, "attached");
        self.history.push(SceneChange::Attached(tile.id(), node.position));
        self.nodes.insert(tile.id(), node);
    }

    fn detach(&mut self, id: TileId) {
        if self.nodes.remove(&id).is_some() {
            tracing::trace!(tile = %id.short(), "detached");
            self.history.push(SceneChange::Detached(id));
        }
    }
}
