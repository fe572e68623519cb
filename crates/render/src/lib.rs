//! Rendering adapter: the narrow interface the streamer drives.
//!
//! # Invariants
//! - The renderer never mutates tiles or the live set.
//! - Every attached tile is detached at most once.
//!
//! # Workaround
//! Ships [`SceneRecorder`] as a workaround for a 3D scene graph with glTF
//! instancing. It keeps attached tiles in memory, logs every attach and
//! detach, and prints a text frame so the streamer runs headless. A GPU
//! backend implements the same [`Renderer`] trait without changing the
//! streamer.

mod renderer;

pub use renderer::{RenderView, Renderer, SceneChange, SceneNode, SceneRecorder};

pub fn crate_info() -> &'static str {
    "tilestream-render v0.1.0"
}
