//! Per-tile reactions to camera changes.
//!
//! Every live tile owns a [`TileWatchers`]: a camera subscription plus two
//! small state machines. The edge watcher reports when the set of visible
//! outer-ring edges changes; the disposal watcher asks once for the tile to
//! be removed when neither it nor any of its neighbors is in view.

use tilestream_bus::{BusError, EventBus, Publisher, Subscription};
use tilestream_common::{Aabb, Edge, neighbor_position};
use tilestream_tile::Tile;

use crate::events::{CAMERA_CHANGED, CameraChanged, DISPOSE_REQUEST, DisposeRequest, EDGE_VIEW, EdgeView};
use crate::frustum::Frustum;

/// Distinct edges whose frustumable blocks intersect the frustum, in
/// frustumable-item order (first occurrence wins).
pub fn detect_visible_edges(tile: &Tile, frustum: &dyn Frustum) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (edge, bounds) in tile.frustumable_bounds() {
        if !edges.contains(&edge) && frustum.intersects(&bounds) {
            edges.push(edge);
        }
    }
    edges
}

/// True when the tile's own ground region and all eight neighbor regions
/// are out of view.
pub fn is_out_of_reach(tile: &Tile, frustum: &dyn Frustum) -> bool {
    let position = tile.position();
    let size = tile.size();
    std::iter::once(position)
        .chain(Edge::ALL.iter().map(|edge| neighbor_position(*edge, position, size)))
        .all(|center| !frustum.intersects(&Aabb::ground_region(center, size)))
}

/// Suppresses repeats and the first evaluation after subscription.
#[derive(Debug, Default)]
pub struct EdgeWatcher {
    last: Option<Vec<Edge>>,
}

impl EdgeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one evaluation; returns the edges to announce, if any.
    pub fn observe(&mut self, edges: Vec<Edge>) -> Option<Vec<Edge>> {
        if self.last.as_ref() == Some(&edges) {
            return None;
        }
        let first = self.last.is_none();
        self.last = Some(edges.clone());
        if first { None } else { Some(edges) }
    }

    pub fn last(&self) -> Option<&[Edge]> {
        self.last.as_deref()
    }
}

/// Fires at most once.
#[derive(Debug, Default)]
pub struct DisposalWatcher {
    requested: bool,
}

impl DisposalWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, tile: &Tile, frustum: &dyn Frustum) -> bool {
        if self.requested || !is_out_of_reach(tile, frustum) {
            return false;
        }
        self.requested = true;
        true
    }

    pub fn requested(&self) -> bool {
        self.requested
    }
}

/// What one poll produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOutcome {
    pub camera_changes: usize,
    pub edge_views: usize,
    pub dispose_requested: bool,
}

/// Subscriptions and publishers owned by one live tile. Dropping it
/// unsubscribes the tile and retires its producers.
#[derive(Debug)]
pub struct TileWatchers {
    camera: Subscription<CameraChanged>,
    edges: EdgeWatcher,
    disposal: DisposalWatcher,
    edge_views: Publisher<EdgeView>,
    disposals: Publisher<DisposeRequest>,
}

impl TileWatchers {
    /// Subscribe to camera changes and merge this tile's output streams
    /// into the edge-view and disposal topics.
    pub fn register(bus: &mut EventBus) -> Result<Self, BusError> {
        Ok(Self {
            camera: bus.subscribe(CAMERA_CHANGED)?,
            edges: EdgeWatcher::new(),
            disposal: DisposalWatcher::new(),
            edge_views: bus.publisher(EDGE_VIEW)?,
            disposals: bus.publisher(DISPOSE_REQUEST)?,
        })
    }

    /// Evaluate every camera change delivered since the last poll.
    ///
    /// Once disposal has been requested the remaining changes are dropped.
    pub fn poll(&mut self, tile: &Tile) -> Result<WatchOutcome, BusError> {
        let mut outcome = WatchOutcome::default();
        while let Some(change) = self.camera.try_next() {
            outcome.camera_changes += 1;
            if self.disposal.requested() {
                continue;
            }
            let frustum = change.frustum.as_ref();
            if let Some(edges) = self.edges.observe(detect_visible_edges(tile, frustum)) {
                tracing::trace!(tile = %tile.id().short(), ?edges, "visible edges changed");
                self.edge_views.emit(EdgeView {
                    tile: tile.id(),
                    origin: tile.position(),
                    size: tile.size(),
                    edges,
                })?;
                outcome.edge_views += 1;
            }
            if self.disposal.observe(tile, frustum) {
                tracing::trace!(tile = %tile.id().short(), "out of reach");
                self.disposals.emit(DisposeRequest { tile: tile.id() })?;
                outcome.dispose_requested = true;
            }
        }
        Ok(outcome)
    }
}
