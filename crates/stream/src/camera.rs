use std::sync::Arc;

use glam::{DMat4, DVec3};
use tilestream_bus::{BusError, EventBus, Publisher};

use crate::config::CameraConfig;
use crate::events::{CAMERA_CHANGED, CameraChanged};
use crate::frustum::ProjectionFrustum;

/// Orthographic camera looking down the `(-1, -1, -1)` diagonal.
///
/// The eye sits `offset_scalar` units from the look-at point on every axis
/// and moves with it. Every mutator reports whether anything changed and,
/// when connected to a bus, publishes exactly one [`CameraChanged`] per
/// actual change.
#[derive(Debug)]
pub struct OrthoCamera {
    config: CameraConfig,
    target: DVec3,
    zoom: f64,
    aspect: f64,
    changes: Option<Publisher<CameraChanged>>,
}

impl OrthoCamera {
    pub fn new(config: CameraConfig) -> Self {
        let aspect = config.aspect;
        Self {
            config,
            target: DVec3::ZERO,
            zoom: 1.0,
            aspect,
            changes: None,
        }
    }

    /// Start publishing changes on the bus.
    pub fn connect(&mut self, bus: &mut EventBus) -> Result<(), BusError> {
        self.changes = Some(bus.publisher(CAMERA_CHANGED)?);
        Ok(())
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }

    pub fn position(&self) -> DVec3 {
        self.target + DVec3::splat(self.config.offset_scalar)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn aspect(&self) -> f64 {
        self.aspect
    }

    pub fn view(&self) -> DMat4 {
        DMat4::look_at_rh(self.position(), self.target, DVec3::Y)
    }

    /// World width and height currently on screen.
    pub fn visible_extent(&self) -> (f64, f64) {
        (
            self.config.ortho_size * self.aspect / self.zoom,
            self.config.ortho_size / self.zoom,
        )
    }

    pub fn projection(&self) -> DMat4 {
        let (width, height) = self.visible_extent();
        let (half_w, half_h) = (width / 2.0, height / 2.0);
        DMat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.config.near, self.config.far)
    }

    pub fn frustum(&self) -> ProjectionFrustum {
        ProjectionFrustum::from_view_projection(&(self.projection() * self.view()))
    }

    /// Unit right and up vectors of the image plane.
    pub fn axes(&self) -> (DVec3, DVec3) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(DVec3::Y).normalize();
        (right, right.cross(forward))
    }

    /// Move eye and target together.
    pub fn translate(&mut self, delta: DVec3) -> Result<bool, BusError> {
        if delta == DVec3::ZERO || !delta.is_finite() {
            return Ok(false);
        }
        self.target += delta;
        self.notify()?;
        Ok(true)
    }

    /// Move along the image plane, in world units.
    pub fn pan(&mut self, right: f64, up: f64) -> Result<bool, BusError> {
        let (r, u) = self.axes();
        self.translate(r * right + u * up)
    }

    fn zoom_scale(&self) -> f64 {
        0.95_f64.powf(self.config.zoom_speed)
    }

    /// Zoom in by one step.
    pub fn dolly_in(&mut self) -> Result<bool, BusError> {
        self.set_zoom(self.zoom / self.zoom_scale())
    }

    /// Zoom out by one step.
    pub fn dolly_out(&mut self) -> Result<bool, BusError> {
        self.set_zoom(self.zoom * self.zoom_scale())
    }

    fn set_zoom(&mut self, zoom: f64) -> Result<bool, BusError> {
        let max = self.config.max_zoom.unwrap_or(f64::INFINITY);
        // min/max rather than clamp: a NaN bound is ignored instead of panicking.
        let zoom = zoom.min(max).max(self.config.min_zoom);
        if zoom == self.zoom || !(zoom > 0.0 && zoom.is_finite()) {
            return Ok(false);
        }
        self.zoom = zoom;
        self.notify()?;
        Ok(true)
    }

    /// Viewport aspect change.
    pub fn resize(&mut self, aspect: f64) -> Result<bool, BusError> {
        if !(aspect > 0.0 && aspect.is_finite()) {
            tracing::warn!(aspect, "ignoring invalid aspect");
            return Ok(false);
        }
        if aspect == self.aspect {
            return Ok(false);
        }
        self.aspect = aspect;
        self.notify()?;
        Ok(true)
    }

    /// Back to the origin at zoom 1.
    pub fn reset(&mut self) -> Result<bool, BusError> {
        if self.target == DVec3::ZERO && self.zoom == 1.0 {
            return Ok(false);
        }
        self.target = DVec3::ZERO;
        self.zoom = 1.0;
        self.notify()?;
        Ok(true)
    }

    /// Publish the current state without changing anything, as a first
    /// render would.
    pub fn broadcast(&self) -> Result<(), BusError> {
        self.notify()
    }

    fn notify(&self) -> Result<(), BusError> {
        if let Some(changes) = &self.changes {
            changes.emit(CameraChanged {
                position: self.position(),
                frustum: Arc::new(self.frustum()),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frustum::Frustum;
    use tilestream_common::Aabb;

    fn connected(config: CameraConfig) -> (OrthoCamera, EventBus, tilestream_bus::Subscription<CameraChanged>) {
        let mut bus = EventBus::new();
        let mut camera = OrthoCamera::new(config);
        camera.connect(&mut bus).unwrap();
        let sub = bus.subscribe(CAMERA_CHANGED).unwrap();
        (camera, bus, sub)
    }

    #[test]
    fn eye_sits_on_the_diagonal() {
        let camera = OrthoCamera::new(CameraConfig::default());
        assert_eq!(camera.position(), DVec3::splat(1000.0));
        let (right, up) = camera.axes();
        assert!(right.y.abs() < 1e-12);
        assert!(up.y > 0.0);
    }

    #[test]
    fn frustum_sees_what_is_under_the_target() {
        let camera = OrthoCamera::new(CameraConfig::default());
        let f = camera.frustum();
        assert!(f.intersects(&Aabb::ground_region(DVec3::ZERO, 2.0)));
        assert!(!f.intersects(&Aabb::ground_region(DVec3::new(200.0, 0.0, 0.0), 2.0)));
        assert!(!f.intersects(&Aabb::ground_region(DVec3::new(0.0, 0.0, -200.0), 2.0)));
    }

    #[test]
    fn translate_moves_the_view() {
        let mut camera = OrthoCamera::new(CameraConfig::default());
        camera.translate(DVec3::new(0.0, 0.0, -200.0)).unwrap();
        let f = camera.frustum();
        assert!(f.intersects(&Aabb::ground_region(DVec3::new(0.0, 0.0, -200.0), 2.0)));
        assert!(!f.intersects(&Aabb::ground_region(DVec3::ZERO, 2.0)));
        assert_eq!(camera.position(), DVec3::new(1000.0, 1000.0, 800.0));
    }

    #[test]
    fn one_event_per_change() {
        let (mut camera, mut bus, sub) = connected(CameraConfig::default());
        assert!(camera.translate(DVec3::X).unwrap());
        assert!(!camera.translate(DVec3::ZERO).unwrap());
        assert!(camera.dolly_in().unwrap());
        bus.pump();
        let events: Vec<_> = sub.drain().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].position, DVec3::new(1001.0, 1000.0, 1000.0));
    }

    #[test]
    fn dolly_scales_by_zoom_speed() {
        let mut camera = OrthoCamera::new(CameraConfig::default());
        camera.dolly_out().unwrap();
        assert!((camera.zoom() - 0.95).abs() < 1e-12);
        camera.dolly_in().unwrap();
        camera.dolly_in().unwrap();
        assert!((camera.zoom() - 1.0 / 0.95).abs() < 1e-12);
    }

    #[test]
    fn zoom_is_clamped() {
        let config = CameraConfig {
            max_zoom: Some(1.0),
            ..CameraConfig::default()
        };
        let (mut camera, mut bus, sub) = connected(config);
        assert!(!camera.dolly_in().unwrap());
        assert_eq!(camera.zoom(), 1.0);
        bus.pump();
        assert_eq!(sub.pending(), 0);
    }

    #[test]
    fn nan_zoom_bounds_do_not_panic() {
        let config = CameraConfig {
            min_zoom: f64::NAN,
            max_zoom: Some(f64::NAN),
            ..CameraConfig::default()
        };
        let mut camera = OrthoCamera::new(config);
        assert!(camera.dolly_in().unwrap());
        assert!(camera.dolly_out().unwrap());
        assert!(camera.zoom().is_finite());
    }

    #[test]
    fn visible_extent_shrinks_with_zoom() {
        let mut camera = OrthoCamera::new(CameraConfig::default());
        let (w, h) = camera.visible_extent();
        assert!((w - 20.0 * 16.0 / 9.0).abs() < 1e-9);
        assert_eq!(h, 20.0);
        camera.dolly_in().unwrap();
        assert!((camera.visible_extent().1 - 19.0).abs() < 1e-9);
    }

    #[test]
    fn zooming_out_widens_the_view() {
        let mut camera = OrthoCamera::new(CameraConfig::default());
        let edge = Aabb::ground_region(DVec3::new(40.0, 0.0, -40.0), 2.0);
        assert!(!camera.frustum().intersects(&edge));
        for _ in 0..30 {
            camera.dolly_out().unwrap();
        }
        assert!(camera.frustum().intersects(&edge));
    }

    #[test]
    fn pan_stays_in_the_image_plane() {
        let mut camera = OrthoCamera::new(CameraConfig::default());
        camera.pan(3.0, 4.0).unwrap();
        let forward = DVec3::splat(-1.0).normalize();
        assert!(camera.target().dot(forward).abs() < 1e-9);
        assert!((camera.target().length() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn resize_and_reset() {
        let (mut camera, mut bus, sub) = connected(CameraConfig::default());
        assert!(camera.resize(1.0).unwrap());
        assert!(!camera.resize(1.0).unwrap());
        assert!(!camera.resize(-2.0).unwrap());
        assert!(!camera.reset().unwrap());
        camera.translate(DVec3::Z).unwrap();
        assert!(camera.reset().unwrap());
        assert_eq!(camera.target(), DVec3::ZERO);
        bus.pump();
        assert_eq!(sub.pending(), 3);
    }

    #[test]
    fn broadcast_always_publishes() {
        let (camera, mut bus, sub) = connected(CameraConfig::default());
        camera.broadcast().unwrap();
        camera.broadcast().unwrap();
        bus.pump();
        assert_eq!(sub.pending(), 2);
    }
}
