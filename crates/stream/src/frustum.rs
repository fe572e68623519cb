//! View-volume intersection tests against world-space boxes.

use glam::{DMat4, DVec3, DVec4};
use tilestream_common::Aabb;

/// Anything that can tell whether a box is at least partly in view.
pub trait Frustum: std::fmt::Debug {
    fn intersects(&self, aabb: &Aabb) -> bool;
}

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Six inward-facing planes extracted from a view-projection matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionFrustum {
    /// `(a, b, c, d)` with unit normal `(a, b, c)`.
    planes: [DVec4; 6],
}

impl ProjectionFrustum {
    /// Griggs-Hartmann plane extraction for a `[0, 1]` depth range, which
    /// is what glam's `*_rh` projections produce.
    pub fn from_view_projection(vp: &DMat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [DVec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    pub fn planes(&self) -> &[DVec4; 6] {
        &self.planes
    }
}

impl Frustum for ProjectionFrustum {
    /// P-vertex test: a box is out only if its corner furthest along some
    /// plane normal is still behind that plane. Conservative near corners.
    fn intersects(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let n = plane.truncate();
            let p = DVec3::new(
                if n.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if n.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if n.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            n.dot(p) + plane.w >= 0.0
        })
    }
}
