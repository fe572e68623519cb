//! Streaming: grow and shrink a tiled world around a moving camera.
//!
//! Each live tile watches camera changes on the bus. When the set of its
//! outer-ring edges in view changes it publishes an [`EdgeView`]; when
//! neither it nor any neighbor is in view it asks to be disposed. The
//! [`TileStreamer`] consumes both streams, spawning missing neighbors once
//! per lattice cell and removing tiles that asked to go.
//! [`TopDownControls`] moves the camera from drags, wheel steps and an idle
//! auto-pan.
//!
//! # Invariants
//! - At most one live tile per lattice cell.
//! - For one camera change, every tile finishes evaluating before any
//!   spawn or disposal is applied.
//! - A disposed tile processes no further camera changes.

mod camera;
mod config;
mod controls;
mod events;
mod frustum;
mod grid;
mod orchestrator;
mod stats;
mod watch;

pub use camera::OrthoCamera;
pub use config::{CameraConfig, ConfigError, ControlsConfig, StreamConfig};
pub use controls::{PanState, TopDownControls};
pub use events::{CAMERA_CHANGED, CameraChanged, DISPOSE_REQUEST, DisposeRequest, EDGE_VIEW, EdgeView};
pub use frustum::{Frustum, ProjectionFrustum};
pub use grid::LiveTiles;
pub use orchestrator::{
    ActiveState, AssetGate, BuilderEvent, BuilderPhase, BuilderState, StreamError, StreamedTile, TileStreamer,
};
pub use stats::{StreamStats, UpdateWindow};
pub use watch::{DisposalWatcher, EdgeWatcher, TileWatchers, WatchOutcome, detect_visible_edges, is_out_of_reach};

pub fn crate_info() -> &'static str {
    "tilestream-stream v0.1.0"
}
