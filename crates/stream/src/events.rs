//! Payloads and topics flowing between the camera, tiles and the builder.

use std::sync::Arc;

use glam::DVec3;
use tilestream_bus::Topic;
use tilestream_common::{Edge, TileId};

use crate::frustum::Frustum;

/// Published by the camera on every actual change.
pub const CAMERA_CHANGED: Topic<CameraChanged> = Topic::new("changeCamera");

/// Merged stream of visible-edge changes from every live tile.
pub const EDGE_VIEW: Topic<EdgeView> = Topic::new("cityEdgeView$");

/// Merged stream of self-disposal requests from every live tile.
pub const DISPOSE_REQUEST: Topic<DisposeRequest> = Topic::new("disposeCity$");

#[derive(Clone)]
pub struct CameraChanged {
    pub position: DVec3,
    pub frustum: Arc<dyn Frustum + Send + Sync>,
}

impl std::fmt::Debug for CameraChanged {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraChanged")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// A tile's visible edges changed. `edges` may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub tile: TileId,
    /// Center of the emitting tile.
    pub origin: DVec3,
    pub size: f64,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposeRequest {
    pub tile: TileId,
}
